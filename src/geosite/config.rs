//! Site selection configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::payload::{Domain, DomainType};
use crate::binary::LocateMode;
use crate::{Error, Result};

/// A wanted site: a code plus the attributes its domains must all carry.
///
/// Written as `code[@attr...]`, e.g. `google@ads`. Codes are upper-cased
/// and attributes lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteSelector {
    pub code: String,
    pub attributes: Vec<String>,
}

impl SiteSelector {
    /// Whether `domain` carries every required attribute.
    pub fn matches(&self, domain: &Domain) -> bool {
        self.attributes.iter().all(|attr| domain.has_attribute(attr))
    }
}

impl FromStr for SiteSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('@');
        let code = parts.next().unwrap_or_default().trim().to_uppercase();
        if code.is_empty() {
            return Err(Error::Config(format!("no site code in {:?}", s)));
        }
        let attributes = parts
            .map(|attr| attr.trim().to_lowercase())
            .filter(|attr| !attr.is_empty())
            .collect();
        Ok(Self { code, attributes })
    }
}

impl TryFrom<String> for SiteSelector {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SiteSelector> for String {
    fn from(selector: SiteSelector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for SiteSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        for attr in &self.attributes {
            write!(f, "@{}", attr)?;
        }
        Ok(())
    }
}

/// What to extract from a GeoSite database and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Sites to extract
    pub want: Vec<SiteSelector>,
    /// Record access strategy
    pub mode: LocateMode,
    /// Fail when a wanted code is absent instead of skipping it
    pub must_exist: bool,
    /// Include regular expression rules
    pub regex: bool,
    /// Include keyword (substring) rules
    pub keyword: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            want: Vec::new(),
            mode: LocateMode::default(),
            must_exist: true,
            regex: false,
            keyword: false,
        }
    }
}

impl SiteConfig {
    /// Create a configuration wanting `selectors`, with defaults for the rest.
    pub fn new<I, S>(selectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut want = Vec::new();
        for text in selectors {
            let text = text.as_ref();
            if text.trim().is_empty() {
                continue;
            }
            want.push(text.parse()?);
        }
        Ok(Self {
            want: dedup(want),
            ..Self::default()
        })
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.want = dedup(config.want);
        config.validate()?;
        Ok(config)
    }

    /// Check that at least one site is wanted.
    pub fn validate(&self) -> Result<()> {
        if self.want.is_empty() {
            return Err(Error::Config("no site wanted".to_string()));
        }
        Ok(())
    }

    /// Distinct wanted codes, attributes dropped, in wanted order.
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for selector in &self.want {
            if !codes.contains(&selector.code) {
                codes.push(selector.code.clone());
            }
        }
        codes
    }

    /// Whether rules of `kind` are extracted.
    pub fn includes(&self, kind: DomainType) -> bool {
        match kind {
            DomainType::Full | DomainType::Domain => true,
            DomainType::Regex => self.regex,
            DomainType::Plain => self.keyword,
        }
    }

    /// Select the record access strategy.
    pub fn with_mode(mut self, mode: LocateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Choose whether an absent code is an error.
    pub fn with_must_exist(mut self, must_exist: bool) -> Self {
        self.must_exist = must_exist;
        self
    }

    /// Include regular expression rules.
    pub fn with_regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    /// Include keyword rules.
    pub fn with_keyword(mut self, keyword: bool) -> Self {
        self.keyword = keyword;
        self
    }
}

fn dedup(selectors: Vec<SiteSelector>) -> Vec<SiteSelector> {
    let mut out: Vec<SiteSelector> = Vec::with_capacity(selectors.len());
    for selector in selectors {
        if !out.contains(&selector) {
            out.push(selector);
        }
    }
    out
}
