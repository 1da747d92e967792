//! GeoIP database access.
//!
//! A GeoIP database is a sequence of records keyed by country (or list)
//! code whose payload carries CIDR messages. [`GeoIpReader`] opens a
//! database file and extracts, merges, queries or re-serializes the CIDRs
//! of the codes named in its [`ExtractConfig`].
//!
//! # Example
//!
//! ```no_run
//! use geodat::geoip::{ExtractConfig, GeoIpReader, LocateMode};
//!
//! let config = ExtractConfig::new(["cn"]).with_mode(LocateMode::Streaming);
//! let reader = GeoIpReader::open("geoip.dat", config)?;
//! for line in reader.extract_text()? {
//!     println!("{}", line);
//! }
//! # Ok::<(), geodat::Error>(())
//! ```

mod config;
mod payload;

pub use crate::binary::LocateMode;
pub use config::ExtractConfig;
pub use payload::{decode_cidrs, encode_cidrs};

use ipnet::IpNet;
use std::fs;
use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::binary::{RecordWriter, Source};
use crate::prefix_set::Entry;
use crate::{Error, Result};

/// Reader for a GeoIP database file.
///
/// The file is reopened for every operation, so a reader is cheap to keep
/// around and never holds a handle between calls.
#[derive(Debug, Clone)]
pub struct GeoIpReader {
    path: PathBuf,
    config: ExtractConfig,
}

impl GeoIpReader {
    /// Create a reader for the database at `path`.
    pub fn open(path: impl AsRef<Path>, config: ExtractConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::metadata(&path)?;
        Ok(Self { path, config })
    }

    /// Database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Every code in the database, in file order.
    pub fn codes(&self) -> Result<Vec<String>> {
        self.source()?.codes()
    }

    /// Merge the CIDRs of every wanted code into one entry.
    pub fn extract(&self) -> Result<Entry> {
        let mut entry = Entry::new(&self.config.want.join(","));
        let found = self.visit_wanted(|_, cidrs| {
            for net in cidrs {
                entry.add_prefix(net)?;
            }
            Ok(())
        })?;
        log::debug!("merged {} of {} wanted codes", found, self.config.want.len());
        Ok(entry)
    }

    /// Canonical text of the merged wanted codes, in the configured
    /// families and output form.
    pub fn extract_text(&self) -> Result<Vec<String>> {
        self.extract()?
            .marshal_text(self.config.families, self.config.output)
    }

    /// One entry per wanted code that is present, in wanted order.
    pub fn extract_per_code(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::with_capacity(self.config.want.len());
        self.visit_wanted(|code, cidrs| {
            let mut entry = Entry::new(code);
            for net in cidrs {
                entry.add_prefix(net)?;
            }
            entries.push(entry);
            Ok(())
        })?;
        Ok(entries)
    }

    /// Every code, in file order, whose CIDRs contain `addr`.
    ///
    /// All codes are searched regardless of the wanted list.
    pub fn find_ip(&self, addr: IpAddr) -> Result<Vec<String>> {
        let mut source = self.source()?;
        let mut matched = Vec::new();
        for code in source.codes()? {
            let cidrs = match source.payload(&code)? {
                Some(payload) => decode_cidrs(&payload)?,
                None => continue,
            };
            let mut entry = Entry::new(&code);
            for net in cidrs {
                entry.add_prefix(net)?;
            }
            if entry.contains(addr) {
                matched.push(code);
            }
        }
        log::debug!("{} found in {} codes", addr, matched.len());
        Ok(matched)
    }

    /// Write the wanted codes with canonical CIDRs as a new database.
    ///
    /// Codes with no prefix in the configured families are left out.
    /// Returns the number of records written.
    pub fn export<W: Write>(&self, out: &mut W) -> Result<usize> {
        let mut writer = RecordWriter::new();
        for mut entry in self.extract_per_code()? {
            let prefixes = match entry.marshal_prefixes(self.config.families) {
                Ok(prefixes) => prefixes,
                Err(Error::EmptyEntry(name)) => {
                    log::warn!("skipping {}: no prefix in the selected families", name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            writer.push(entry.name(), &encode_cidrs(&prefixes))?;
        }

        if writer.record_count() == 0 {
            return Err(Error::NoMatch);
        }
        writer.write_to(out)?;
        log::info!(
            "exported {} records ({} bytes)",
            writer.record_count(),
            writer.len()
        );
        Ok(writer.record_count())
    }

    fn source(&self) -> Result<Source> {
        Source::open(&self.path, self.config.mode)
    }

    /// Decode the CIDRs of each wanted code and hand them to `visit`.
    ///
    /// Returns how many wanted codes were present, failing with `NoMatch`
    /// when there were none.
    fn visit_wanted<F>(&self, mut visit: F) -> Result<usize>
    where
        F: FnMut(&str, Vec<IpNet>) -> Result<()>,
    {
        let mut source = self.source()?;
        let mut found = 0;
        for code in &self.config.want {
            match source.payload(code)? {
                Some(payload) => {
                    let cidrs = decode_cidrs(&payload)?;
                    visit(code, cidrs)?;
                    found += 1;
                }
                None if self.config.must_exist => {
                    return Err(Error::CodeNotFound(code.clone()));
                }
                None => log::warn!("code {} not found in {}", code, self.path.display()),
            }
        }
        if found == 0 {
            return Err(Error::NoMatch);
        }
        Ok(found)
    }
}
