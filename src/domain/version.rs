//! Build version domain type
//!
//! A Windows servicing level is identified by the kernel build number and the
//! update build revision (UBR), e.g. `26100.1742`. Ordering is numeric on
//! `(major, minor)`, never lexical.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TriquetraError;

static NUMBER_GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\d+").unwrap()
});

/// Numeric `(major, minor)` build identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildVersion {
    /// Kernel build number (e.g. 26100)
    pub major: u32,
    /// Update build revision (e.g. 1742)
    pub minor: u32,
}

impl BuildVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Servicing branch this build belongs to
    pub fn branch(&self) -> u32 {
        self.major
    }

    /// Parse a build from a remote folder name.
    ///
    /// Accepts `26100.1742`, `26100.1742/`, `10.0.26100.1742` and names that
    /// carry a prefix or suffix around the numbers. Returns `None` when fewer
    /// than two numeric groups are present.
    pub fn from_folder_name(name: &str) -> Option<Self> {
        let token = name.trim_end_matches('/').rsplit('/').next().unwrap_or(name);
        let nums: Vec<u32> = NUMBER_GROUPS
            .find_iter(token)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();

        match nums.as_slice() {
            [10, 0, major, minor, ..] => Some(Self::new(*major, *minor)),
            [major, minor, ..] => Some(Self::new(*major, *minor)),
            _ => None,
        }
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for BuildVersion {
    type Err = TriquetraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TriquetraError::InvalidBuildVersion {
            input: s.to_string(),
        };

        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for BuildVersion {
    type Error = TriquetraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BuildVersion> for String {
    fn from(value: BuildVersion) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_numeric() {
        assert!(BuildVersion::new(26100, 1742) < BuildVersion::new(26100, 1743));
        assert!(BuildVersion::new(26100, 9999) < BuildVersion::new(26200, 0));
        assert!(BuildVersion::new(22621, 2400) < BuildVersion::new(26100, 1742));
        // Lexically "999" > "1742"
        assert!(BuildVersion::new(26100, 999) < BuildVersion::new(26100, 1742));
    }

    #[test]
    fn test_parse_and_display() {
        let v: BuildVersion = "26100.1742".parse().unwrap();
        assert_eq!(v, BuildVersion::new(26100, 1742));
        assert_eq!(v.to_string(), "26100.1742");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("26100".parse::<BuildVersion>().is_err());
        assert!("26100.abc".parse::<BuildVersion>().is_err());
        assert!("-1.5".parse::<BuildVersion>().is_err());
        assert!("".parse::<BuildVersion>().is_err());
    }

    #[test]
    fn test_from_folder_name() {
        assert_eq!(
            BuildVersion::from_folder_name("26100.6899/"),
            Some(BuildVersion::new(26100, 6899))
        );
        assert_eq!(
            BuildVersion::from_folder_name("/updates/10.0.22621.4317/"),
            Some(BuildVersion::new(22621, 4317))
        );
        assert_eq!(
            BuildVersion::from_folder_name("build-26100-2033"),
            Some(BuildVersion::new(26100, 2033))
        );
        assert_eq!(BuildVersion::from_folder_name("EP/"), None);
        assert_eq!(BuildVersion::from_folder_name("26100/"), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&BuildVersion::new(26100, 1742)).unwrap();
        assert_eq!(json, "\"26100.1742\"");
        let back: BuildVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BuildVersion::new(26100, 1742));
    }
}
