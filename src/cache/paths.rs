//! Cache path utilities and constants
//!
//! Layout under the cache root:
//!
//! ```text
//! cache/
//!   index.json
//!   26100.1742/amd64/<ssu, cu and ndp files>
//!   EP/arm64/Windows11.0-KB5054156-arm64.cab
//! ```

use std::path::{Path, PathBuf};

use crate::domain::{Architecture, BuildVersion};

/// Checksum bookkeeping file at the cache root
pub const INDEX_FILE: &str = "index.json";

/// Folder holding Enablement Packages, locally and on the server
pub const ENABLEMENT_DIR: &str = "EP";

/// Suffix of an in-flight download
pub const PARTIAL_SUFFIX: &str = ".part";

/// Cache location of a build artifact
pub fn artifact_path(
    root: &Path,
    version: BuildVersion,
    arch: Architecture,
    file_name: &str,
) -> PathBuf {
    root.join(version.to_string())
        .join(arch.as_str())
        .join(file_name)
}

/// Cache location of an Enablement Package
pub fn enablement_path(root: &Path, arch: Architecture, file_name: &str) -> PathBuf {
    root.join(ENABLEMENT_DIR).join(arch.as_str()).join(file_name)
}

/// Temporary path a download streams into before it is verified
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Index key of a cache file: its path relative to the root, `/`-separated
pub fn index_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_layout() {
        let root = Path::new("cache");
        let path = artifact_path(
            root,
            BuildVersion::new(26100, 1742),
            Architecture::Amd64,
            "ssu.cab",
        );
        assert_eq!(path, Path::new("cache").join("26100.1742").join("amd64").join("ssu.cab"));
        assert_eq!(index_key(root, &path), "26100.1742/amd64/ssu.cab");
    }

    #[test]
    fn test_enablement_path_layout() {
        let root = Path::new("cache");
        let path = enablement_path(root, Architecture::Arm64, "ep.cab");
        assert_eq!(index_key(root, &path), "EP/arm64/ep.cab");
    }

    #[test]
    fn test_partial_path() {
        let path = Path::new("cache").join("a.esd");
        assert_eq!(partial_path(&path), Path::new("cache").join("a.esd.part"));
    }
}
