//! Edition and architecture tags
//!
//! Only Windows 11 Client feature updates 22H2 through 25H2 on amd64 and
//! arm64 are representable; anything else is rejected by the environment probe
//! before it gets this far.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU architecture of the installed OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Amd64,
    Arm64,
}

impl Architecture {
    /// Folder name used on the update server
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Amd64 => "amd64",
            Architecture::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "amd64" | "x64" => Ok(Architecture::Amd64),
            "arm64" => Ok(Architecture::Arm64),
            other => Err(format!("unsupported architecture '{other}'")),
        }
    }
}

/// Windows 11 feature update level (`DisplayVersion`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureUpdate {
    #[serde(rename = "22H2")]
    V22H2,
    #[serde(rename = "23H2")]
    V23H2,
    #[serde(rename = "24H2")]
    V24H2,
    #[serde(rename = "25H2")]
    V25H2,
}

impl FeatureUpdate {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureUpdate::V22H2 => "22H2",
            FeatureUpdate::V23H2 => "23H2",
            FeatureUpdate::V24H2 => "24H2",
            FeatureUpdate::V25H2 => "25H2",
        }
    }

    /// Servicing branch (kernel build number) shared by this feature update
    pub fn branch(&self) -> u32 {
        match self {
            FeatureUpdate::V22H2 | FeatureUpdate::V23H2 => 22621,
            FeatureUpdate::V24H2 | FeatureUpdate::V25H2 => 26100,
        }
    }

    /// Feature update an Enablement Package moves this one to, if any
    pub fn enablement_target(&self) -> Option<FeatureUpdate> {
        match self {
            FeatureUpdate::V22H2 => Some(FeatureUpdate::V23H2),
            FeatureUpdate::V24H2 => Some(FeatureUpdate::V25H2),
            FeatureUpdate::V23H2 | FeatureUpdate::V25H2 => None,
        }
    }
}

impl fmt::Display for FeatureUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureUpdate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "22H2" => Ok(FeatureUpdate::V22H2),
            "23H2" => Ok(FeatureUpdate::V23H2),
            "24H2" => Ok(FeatureUpdate::V24H2),
            "25H2" => Ok(FeatureUpdate::V25H2),
            other => Err(format!("unsupported feature update '{other}'")),
        }
    }
}

/// Combined edition/architecture tag of the local machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditionTag {
    pub feature: FeatureUpdate,
    pub arch: Architecture,
}

impl fmt::Display for EditionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Windows 11 {} {}", self.feature, self.arch)
    }
}
