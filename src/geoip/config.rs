//! Extraction configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::binary::LocateMode;
use crate::cidr::OutputType;
use crate::prefix_set::IpFamilies;
use crate::{Error, Result};

/// What to extract from a GeoIP database and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Codes to extract
    pub want: Vec<String>,
    /// Address families to output
    pub families: IpFamilies,
    /// Record access strategy
    pub mode: LocateMode,
    /// Fail when a wanted code is absent instead of skipping it
    pub must_exist: bool,
    /// Text form of the output
    pub output: OutputType,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            want: Vec::new(),
            families: IpFamilies::all(),
            mode: LocateMode::default(),
            must_exist: true,
            output: OutputType::default(),
        }
    }
}

impl ExtractConfig {
    /// Create a configuration wanting `codes`, with defaults for the rest.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            want: normalize_codes(codes),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.want = normalize_codes(&config.want);
        config.validate()?;
        Ok(config)
    }

    /// Check that at least one code is wanted.
    pub fn validate(&self) -> Result<()> {
        if self.want.is_empty() {
            return Err(Error::Config("no code wanted".to_string()));
        }
        Ok(())
    }

    /// Select output families.
    pub fn with_families(mut self, families: IpFamilies) -> Self {
        self.families = families;
        self
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

    /// Select the output text form.
    pub fn with_output(mut self, output: OutputType) -> Self {
        self.output = output;
        self
    }
}

/// Trim and upper-case codes, dropping blanks and repeats.
fn normalize_codes<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for code in codes {
        let code = code.as_ref().trim().to_uppercase();
        if !code.is_empty() && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ExtractConfig::default();
        assert_eq!(config.families, IpFamilies::V4 | IpFamilies::V6);
        assert_eq!(config.mode, LocateMode::Indexed);
        assert!(config.must_exist);
        assert_eq!(config.output, OutputType::Cidr);
    }

    #[test]
    fn test_new_normalizes_codes() {
        let config = ExtractConfig::new([" cn", "us ", "CN", ""]);
        assert_eq!(config.want, vec!["CN", "US"]);
    }

    #[test]
    fn test_builder_methods() {
        let config = ExtractConfig::new(["jp"])
            .with_mode(LocateMode::Streaming)
            .with_families(IpFamilies::V6)
            .with_must_exist(false)
            .with_output(OutputType::Range);
        assert_eq!(config.mode, LocateMode::Streaming);
        assert_eq!(config.families, IpFamilies::V6);
        assert!(!config.must_exist);
        assert_eq!(config.output, OutputType::Range);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"want": ["cn", "private"], "mode": "streaming", "must_exist": false}}"#
        )
        .unwrap();

        let config = ExtractConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.want, vec!["CN", "PRIVATE"]);
        assert_eq!(config.mode, LocateMode::Streaming);
        assert!(!config.must_exist);
        assert_eq!(config.families, IpFamilies::all());
        assert_eq!(config.output, OutputType::Cidr);
    }

    #[test]
    fn test_from_json_file_rejects_empty_want() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"mode": "buffered"}}"#).unwrap();
        assert!(matches!(
            ExtractConfig::from_json_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_json_file_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            ExtractConfig::from_json_file(file.path()),
            Err(Error::Json(_))
        ));
    }
}
