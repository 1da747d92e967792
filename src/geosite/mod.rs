//! GeoSite database access.
//!
//! A GeoSite database uses the same record layout as a GeoIP database, but
//! each payload lists domain rules instead of CIDRs. [`GeoSiteReader`]
//! extracts the rules of the sites named in its [`SiteConfig`], filtered by
//! rule type and attributes, or re-serializes whole sites.
//!
//! # Example
//!
//! ```no_run
//! use geodat::geosite::{GeoSiteReader, SiteConfig};
//!
//! let config = SiteConfig::new(["category-ads-all@cn"])?;
//! let reader = GeoSiteReader::open("geosite.dat", config)?;
//! for domain in reader.extract()? {
//!     println!("{}", domain);
//! }
//! # Ok::<(), geodat::Error>(())
//! ```

mod config;
mod payload;

pub use crate::binary::LocateMode;
pub use config::{SiteConfig, SiteSelector};
pub use payload::{decode_domains, encode_domains, Attribute, AttributeValue, Domain, DomainType};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::binary::{RecordWriter, Source};
use crate::{Error, Result};

/// Domain rules stored under one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub code: String,
    pub domains: Vec<Domain>,
}

/// Reader for a GeoSite database file.
///
/// Like [`GeoIpReader`](crate::geoip::GeoIpReader), the file is reopened
/// for every operation.
#[derive(Debug, Clone)]
pub struct GeoSiteReader {
    path: PathBuf,
    config: SiteConfig,
}

impl GeoSiteReader {
    /// Create a reader for the database at `path`.
    pub fn open(path: impl AsRef<Path>, config: SiteConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::metadata(&path)?;
        Ok(Self { path, config })
    }

    /// Database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Every code in the database, in file order.
    pub fn codes(&self) -> Result<Vec<String>> {
        Source::open(&self.path, self.config.mode)?.codes()
    }

    /// Every rule of each wanted code that is present, in wanted order.
    ///
    /// Attributes in the selectors are ignored here.
    pub fn read_sites(&self) -> Result<Vec<Site>> {
        let mut source = Source::open(&self.path, self.config.mode)?;
        let mut sites = Vec::new();
        for code in self.config.codes() {
            match source.payload(&code)? {
                Some(payload) => {
                    let domains = decode_domains(&payload)?;
                    sites.push(Site { code, domains });
                }
                None if self.config.must_exist => return Err(Error::CodeNotFound(code)),
                None => log::warn!("site {} not found in {}", code, self.path.display()),
            }
        }
        if sites.is_empty() {
            return Err(Error::NoMatch);
        }
        Ok(sites)
    }

    /// Rules selected by the wanted sites, their attributes and the
    /// configured rule types, without repeats.
    pub fn extract_domains(&self) -> Result<Vec<Domain>> {
        let sites = self.read_sites()?;
        let mut selected: Vec<Domain> = Vec::new();
        for selector in &self.config.want {
            let Some(site) = sites.iter().find(|site| site.code == selector.code) else {
                continue;
            };
            for domain in &site.domains {
                if self.config.includes(domain.kind)
                    && selector.matches(domain)
                    && !selected.contains(domain)
                {
                    selected.push(domain.clone());
                }
            }
        }
        log::debug!("selected {} domain rules", selected.len());
        Ok(selected)
    }

    /// Sorted, distinct values of the selected rules.
    pub fn extract(&self) -> Result<Vec<String>> {
        let mut values: Vec<String> = self
            .extract_domains()?
            .into_iter()
            .map(|domain| domain.value)
            .collect();
        values.sort();
        values.dedup();
        if values.is_empty() {
            let names: Vec<String> = self.config.want.iter().map(|s| s.to_string()).collect();
            return Err(Error::EmptyEntry(names.join(",")));
        }
        Ok(values)
    }

    /// Write the wanted sites, with every rule, as a new database.
    ///
    /// Returns the number of records written.
    pub fn export<W: Write>(&self, out: &mut W) -> Result<usize> {
        let mut writer = RecordWriter::new();
        for site in self.read_sites()? {
            writer.push(&site.code, &encode_domains(&site.domains))?;
        }
        writer.write_to(out)?;
        log::info!(
            "exported {} sites ({} bytes)",
            writer.record_count(),
            writer.len()
        );
        Ok(writer.record_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn database(sites: &[(&str, Vec<Domain>)]) -> NamedTempFile {
        let mut writer = RecordWriter::new();
        for (code, domains) in sites {
            writer.push(code, &encode_domains(domains)).unwrap();
        }
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&writer.finish()).unwrap();
        file
    }

    fn sample() -> NamedTempFile {
        database(&[
            (
                "GOOGLE",
                vec![
                    Domain::new(DomainType::Domain, "google.com"),
                    Domain::new(DomainType::Full, "ads.google.com").with_attribute("ads"),
                    Domain::new(DomainType::Regex, r"^gg\d+\.com$"),
                    Domain::new(DomainType::Plain, "google"),
                ],
            ),
            ("CN", vec![Domain::new(DomainType::Domain, "qq.com")]),
        ])
    }

    #[test]
    fn test_extract_default_types() {
        let file = sample();
        let reader = GeoSiteReader::open(file.path(), SiteConfig::new(["google"]).unwrap()).unwrap();
        assert_eq!(reader.extract().unwrap(), vec!["ads.google.com", "google.com"]);
    }

    #[test]
    fn test_extract_regex_and_keyword() {
        let file = sample();
        let config = SiteConfig::new(["google"])
            .unwrap()
            .with_regex(true)
            .with_keyword(true);
        let reader = GeoSiteReader::open(file.path(), config).unwrap();
        let kinds: Vec<DomainType> = reader
            .extract_domains()
            .unwrap()
            .iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![DomainType::Domain, DomainType::Full, DomainType::Regex, DomainType::Plain]
        );
    }

    #[test]
    fn test_strict_and_lenient() {
        let file = sample();
        let strict = GeoSiteReader::open(file.path(), SiteConfig::new(["cn", "netflix"]).unwrap()).unwrap();
        assert!(matches!(strict.extract(), Err(Error::CodeNotFound(code)) if code == "NETFLIX"));

        let config = SiteConfig::new(["cn", "netflix"]).unwrap().with_must_exist(false);
        let lenient = GeoSiteReader::open(file.path(), config).unwrap();
        assert_eq!(lenient.extract().unwrap(), vec!["qq.com"]);

        let config = SiteConfig::new(["netflix"]).unwrap().with_must_exist(false);
        let none = GeoSiteReader::open(file.path(), config).unwrap();
        assert!(matches!(none.extract(), Err(Error::NoMatch)));
    }
}
