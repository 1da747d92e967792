//! geodat: CLI tool for extracting, merging and looking up geo-database codes.

use clap::{Parser, Subcommand};
use geodat::geoip::{ExtractConfig, GeoIpReader, LocateMode};
use geodat::geosite::{GeoSiteReader, SiteConfig};
use geodat::{Entry, IpFamilies, OutputType};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "geodat")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Extract, merge and look up IP ranges in geo-database files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every code stored in a database
    Codes {
        /// Input database file
        #[arg(short, long)]
        input: PathBuf,

        /// Record access mode: buffered, streaming or indexed
        #[arg(short, long, default_value = "indexed", value_parser = parse_mode)]
        mode: LocateMode,
    },

    /// Extract the merged ranges of one or more codes
    Extract {
        /// Input database file
        #[arg(short, long)]
        input: PathBuf,

        /// Comma separated codes, e.g. "cn,jp"
        #[arg(short, long, value_delimiter = ',')]
        list: Vec<String>,

        /// JSON extraction config; --list and other flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address families to output: ipv4, ipv6 or both
        #[arg(long, value_parser = parse_families)]
        families: Option<IpFamilies>,

        /// Record access mode: buffered, streaming or indexed
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<LocateMode>,

        /// Output form: cidr or range
        #[arg(short, long, value_parser = parse_format)]
        format: Option<OutputType>,

        /// Skip absent codes instead of failing
        #[arg(long)]
        lenient: bool,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append to the output file instead of overwriting it
        #[arg(short, long)]
        append: bool,
    },

    /// Find the codes whose ranges contain an IP address
    Lookup {
        /// Input database file
        #[arg(short, long)]
        input: PathBuf,

        /// Address to look up
        #[arg(long)]
        ip: IpAddr,

        /// Record access mode: buffered, streaming or indexed
        #[arg(short, long, default_value = "indexed", value_parser = parse_mode)]
        mode: LocateMode,
    },

    /// Merge a text list of IPs, CIDRs and ranges
    Merge {
        /// Input text file, one entry per line; "-" reads stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output form: cidr or range
        #[arg(short, long, default_value = "cidr", value_parser = parse_format)]
        format: OutputType,

        /// Address families to output: ipv4, ipv6 or both
        #[arg(long, default_value = "both", value_parser = parse_families)]
        families: IpFamilies,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append to the output file instead of overwriting it
        #[arg(short, long)]
        append: bool,
    },

    /// Extract the domain list of one or more sites from a GeoSite database
    SiteExtract {
        /// Input GeoSite database file
        #[arg(short, long)]
        input: PathBuf,

        /// Comma separated sites with optional attributes, e.g. "google,category-ads@cn"
        #[arg(short, long, value_delimiter = ',')]
        list: Vec<String>,

        /// JSON site config; --list and other flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Record access mode: buffered, streaming or indexed
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<LocateMode>,

        /// Include regular expression rules
        #[arg(long)]
        regex: bool,

        /// Include keyword rules
        #[arg(long)]
        keyword: bool,

        /// Skip absent sites instead of failing
        #[arg(long)]
        lenient: bool,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append to the output file instead of overwriting it
        #[arg(short, long)]
        append: bool,
    },

    /// Write selected sites to a new GeoSite database
    SiteExport {
        /// Input GeoSite database file
        #[arg(short, long)]
        input: PathBuf,

        /// Comma separated sites; attributes are ignored
        #[arg(short, long, value_delimiter = ',', required = true)]
        list: Vec<String>,

        /// Output database file
        #[arg(short, long)]
        output: PathBuf,

        /// Record access mode: buffered, streaming or indexed
        #[arg(short, long, default_value = "indexed", value_parser = parse_mode)]
        mode: LocateMode,

        /// Skip absent sites instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Write selected codes with canonical ranges to a new database
    Export {
        /// Input database file
        #[arg(short, long)]
        input: PathBuf,

        /// Comma separated codes, e.g. "cn,private"
        #[arg(short, long, value_delimiter = ',', required = true)]
        list: Vec<String>,

        /// Output database file
        #[arg(short, long)]
        output: PathBuf,

        /// Address families to keep: ipv4, ipv6 or both
        #[arg(long, default_value = "both", value_parser = parse_families)]
        families: IpFamilies,

        /// Record access mode: buffered, streaming or indexed
        #[arg(short, long, default_value = "indexed", value_parser = parse_mode)]
        mode: LocateMode,

        /// Skip absent codes instead of failing
        #[arg(long)]
        lenient: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Codes { input, mode } => list_codes(&input, mode),
        Commands::Extract {
            input,
            list,
            config,
            families,
            mode,
            format,
            lenient,
            output,
            append,
        } => {
            let overrides = ExtractOverrides {
                list,
                families,
                mode,
                format,
                lenient,
            };
            extract(&input, config.as_deref(), overrides, output.as_deref(), append)
        }
        Commands::Lookup { input, ip, mode } => lookup(&input, ip, mode),
        Commands::Merge {
            input,
            format,
            families,
            output,
            append,
        } => merge(&input, format, families, output.as_deref(), append),
        Commands::Export {
            input,
            list,
            output,
            families,
            mode,
            lenient,
        } => {
            let config = ExtractConfig::new(list)
                .with_families(families)
                .with_mode(mode)
                .with_must_exist(!lenient);
            export(&input, config, &output)
        }
        Commands::SiteExtract {
            input,
            list,
            config,
            mode,
            regex,
            keyword,
            lenient,
            output,
            append,
        } => {
            let overrides = SiteOverrides {
                list,
                mode,
                regex,
                keyword,
                lenient,
            };
            site_extract(&input, config.as_deref(), overrides, output.as_deref(), append)
        }
        Commands::SiteExport {
            input,
            list,
            output,
            mode,
            lenient,
        } => site_export(&input, list, mode, lenient, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Extract flags that take precedence over a config file.
struct ExtractOverrides {
    list: Vec<String>,
    families: Option<IpFamilies>,
    mode: Option<LocateMode>,
    format: Option<OutputType>,
    lenient: bool,
}

/// Site extract flags that take precedence over a config file.
struct SiteOverrides {
    list: Vec<String>,
    mode: Option<LocateMode>,
    regex: bool,
    keyword: bool,
    lenient: bool,
}

fn list_codes(input: &Path, mode: LocateMode) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExtractConfig::default().with_mode(mode);
    let codes = GeoIpReader::open(input, config)?.codes()?;

    println!("Available codes:");
    for code in codes {
        println!("{}", code);
    }
    Ok(())
}

fn extract(
    input: &Path,
    config_path: Option<&Path>,
    overrides: ExtractOverrides,
    output: Option<&Path>,
    append: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => ExtractConfig::from_json_file(path)?,
        None => ExtractConfig::default(),
    };
    if !overrides.list.is_empty() {
        config.want = ExtractConfig::new(overrides.list).want;
    }
    if let Some(families) = overrides.families {
        config.families = families;
    }
    if let Some(mode) = overrides.mode {
        config.mode = mode;
    }
    if let Some(format) = overrides.format {
        config.output = format;
    }
    if overrides.lenient {
        config.must_exist = false;
    }
    config.validate()?;

    log::debug!("extracting {:?} with {:?} mode", config.want, config.mode);
    let lines = GeoIpReader::open(input, config)?.extract_text()?;
    write_lines(&lines, output, append)?;
    log::info!("extracted {} lines", lines.len());
    Ok(())
}

fn lookup(input: &Path, ip: IpAddr, mode: LocateMode) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExtractConfig::default().with_mode(mode);
    let codes = GeoIpReader::open(input, config)?.find_ip(ip)?;

    if codes.is_empty() {
        println!("{} is not in any code", ip);
        return Ok(());
    }
    for code in codes {
        println!("{}", code);
    }
    Ok(())
}

fn merge(
    input: &Path,
    format: OutputType,
    families: IpFamilies,
    output: Option<&Path>,
    append: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = if input == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(input)?
    };

    let mut entry = Entry::new("merge");
    for (number, line) in text.lines().enumerate() {
        entry
            .add_text(line)
            .map_err(|e| format!("line {}: {}", number + 1, e))?;
    }

    let lines = entry.marshal_text(families, format)?;
    write_lines(&lines, output, append)?;
    log::info!("merged into {} lines", lines.len());
    Ok(())
}

fn export(input: &Path, config: ExtractConfig, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = GeoIpReader::open(input, config)?;

    // Build in memory first so a failed export leaves no partial file.
    let mut data = Vec::new();
    let records = reader.export(&mut data)?;
    fs::write(output, &data)?;

    println!(
        "Successfully exported {} codes -> {:?} ({} bytes)",
        records,
        output,
        data.len()
    );
    Ok(())
}

fn site_extract(
    input: &Path,
    config_path: Option<&Path>,
    overrides: SiteOverrides,
    output: Option<&Path>,
    append: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => SiteConfig::from_json_file(path)?,
        None => SiteConfig::default(),
    };
    if !overrides.list.is_empty() {
        config.want = SiteConfig::new(overrides.list)?.want;
    }
    if let Some(mode) = overrides.mode {
        config.mode = mode;
    }
    config.regex |= overrides.regex;
    config.keyword |= overrides.keyword;
    if overrides.lenient {
        config.must_exist = false;
    }
    config.validate()?;

    log::debug!("extracting sites {:?} with {:?} mode", config.want, config.mode);
    let lines = GeoSiteReader::open(input, config)?.extract()?;
    write_lines(&lines, output, append)?;
    log::info!("extracted {} domains", lines.len());
    Ok(())
}

fn site_export(
    input: &Path,
    list: Vec<String>,
    mode: LocateMode,
    lenient: bool,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = SiteConfig::new(list)?
        .with_mode(mode)
        .with_must_exist(!lenient);
    let reader = GeoSiteReader::open(input, config)?;

    let mut data = Vec::new();
    let records = reader.export(&mut data)?;
    fs::write(output, &data)?;

    println!(
        "Successfully exported {} sites -> {:?} ({} bytes)",
        records,
        output,
        data.len()
    );
    Ok(())
}

fn write_lines(lines: &[String], output: Option<&Path>, append: bool) -> io::Result<()> {
    let mut out: Box<dyn Write> = match output {
        Some(path) if append => Box::new(BufWriter::new(open_append(path)?)),
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

/// Open `path` for appending, first ending an unterminated last line.
fn open_append(path: &Path) -> io::Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    if file.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            file.write_all(b"\n")?;
        }
    }
    Ok(file)
}

fn parse_mode(s: &str) -> Result<LocateMode, String> {
    LocateMode::parse(s).ok_or_else(|| format!("unknown mode {:?} (buffered, streaming, indexed)", s))
}

fn parse_families(s: &str) -> Result<IpFamilies, String> {
    IpFamilies::parse(s).ok_or_else(|| format!("unknown families {:?} (ipv4, ipv6, both)", s))
}

fn parse_format(s: &str) -> Result<OutputType, String> {
    OutputType::parse(s).ok_or_else(|| format!("unknown format {:?} (cidr, range)", s))
}
