//! Optional configuration file (triquetra.yaml) data structures
//!
//! Every field is optional; anything left out keeps the built-in default.
//!
//! ```yaml
//! primary: https://updates.example.org/
//! mirrors:
//!   - https://mirror.example.org/
//! user: w11updater
//! password: w11updater
//! probe_timeout_secs: 10
//! enablement:
//!   - from: 24H2
//!     min_build: "26100.5074"
//!     amd64: Windows11.0-KB5054156-x64.cab
//!     arm64: Windows11.0-KB5054156-arm64.cab
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{BuildVersion, FeatureUpdate};
use crate::error::{Result, config};

/// Configuration file name looked up in the working directory
pub const CONFIG_FILE: &str = "triquetra.yaml";

/// Parsed `triquetra.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failsafe_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_max_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BuildVersion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater_binary: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enablement: Vec<EnablementPackageConfig>,
}

/// Enablement Package published for one feature update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnablementPackageConfig {
    /// Feature update the package upgrades from
    pub from: FeatureUpdate,
    /// Minimum installed build before the package may be offered
    pub min_build: BuildVersion,
    /// Package file name for amd64
    pub amd64: String,
    /// Package file name for arm64
    pub arm64: String,
}

impl ConfigFile {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: Self = serde_yaml::from_str(yaml)?;
        Ok(file)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| config::read_failed(path, e))?;
        serde_yaml::from_str(&content).map_err(|e| config::parse_failed(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
primary: https://updates.example.org/
mirrors:
  - https://mirror1.example.org/
  - https://mirror2.example.org/
user: alice
probe_timeout_secs: 3
baseline: "26100.1742"
enablement:
  - from: 24H2
    min_build: "26100.5074"
    amd64: ep-x64.cab
    arm64: ep-arm64.cab
"#;
        let file = ConfigFile::from_yaml(yaml).unwrap();
        assert_eq!(file.primary.as_deref(), Some("https://updates.example.org/"));
        assert_eq!(file.mirrors.len(), 2);
        assert_eq!(file.user.as_deref(), Some("alice"));
        assert_eq!(file.probe_timeout_secs, Some(3));
        assert_eq!(file.baseline, Some(BuildVersion::new(26100, 1742)));
        assert_eq!(file.enablement[0].from, FeatureUpdate::V24H2);
        assert_eq!(file.enablement[0].min_build, BuildVersion::new(26100, 5074));
    }

    #[test]
    fn test_empty_config_is_default() {
        let file = ConfigFile::from_yaml("{}").unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ConfigFile::from_yaml("primry: https://typo.example/").is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let file = ConfigFile::load(&temp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "mirrors: [unclosed").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
