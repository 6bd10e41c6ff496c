//! Cache statistics and management
//!
//! This module provides functions for listing, clearing, and
//! getting statistics about cached downloads.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Result, cache as cache_error};

use super::PARTIAL_SUFFIX;

/// Files cached for one build folder (or `EP`) and architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBuild {
    /// Build folder name (e.g. 26100.1742) or `EP`
    pub name: String,
    pub arch: String,
    pub files: usize,
    /// Total size in bytes
    pub size: u64,
}

impl CachedBuild {
    /// Format size as human-readable string
    pub fn formatted_size(&self) -> String {
        format_size(self.size)
    }
}

/// Cache statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of build/architecture folders
    pub builds: usize,
    /// Number of cached files
    pub files: usize,
    /// Total size in bytes
    pub total_size: u64,
}

impl CacheStats {
    /// Format total size as human-readable string
    pub fn formatted_size(&self) -> String {
        format_size(self.total_size)
    }
}

/// Human-readable byte size
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    let size = bytes as f64;
    if size < 1024.0 {
        format!("{bytes} B")
    } else if size < 1024.0 * 1024.0 {
        format!("{:.1} KB", size / 1024.0)
    } else if size < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.1} MB", size / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", size / (1024.0 * 1024.0 * 1024.0))
    }
}

/// List cached builds, grouped by `<folder>/<arch>`
pub fn list_cached_builds(root: &Path) -> Result<Vec<CachedBuild>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut by_folder: BTreeMap<(String, String), (usize, u64)> = BTreeMap::new();

    for entry in WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() || is_partial(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let mut parts = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string());
        let (Some(name), Some(arch)) = (parts.next(), parts.next()) else {
            continue;
        };

        let size = entry
            .metadata()
            .map_err(|e| cache_error::operation_failed(format!("Failed to get metadata: {e}")))?
            .len();
        let (files, total) = by_folder.entry((name, arch)).or_insert((0, 0));
        *files += 1;
        *total += size;
    }

    Ok(by_folder
        .into_iter()
        .map(|((name, arch), (files, size))| CachedBuild {
            name,
            arch,
            files,
            size,
        })
        .collect())
}

/// Get cache statistics
pub fn cache_stats(root: &Path) -> Result<CacheStats> {
    let builds = list_cached_builds(root)?;
    Ok(CacheStats {
        builds: builds.len(),
        files: builds.iter().map(|b| b.files).sum(),
        total_size: builds.iter().map(|b| b.size).sum(),
    })
}

/// Clear the entire download cache (and index)
pub fn clear_cache(root: &Path) -> Result<()> {
    if !root.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(root).map_err(|e| {
        cache_error::operation_failed(format!("Failed to read cache directory: {e}"))
    })? {
        let entry = entry.map_err(|e| {
            cache_error::operation_failed(format!("Failed to read entry: {e}"))
        })?;
        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| {
            cache_error::operation_failed(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))
        })?;
    }

    Ok(())
}

fn is_partial(path: &Path) -> bool {
    path.to_string_lossy().ends_with(PARTIAL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::INDEX_FILE;
    use tempfile::TempDir;

    fn populate(root: &Path) {
        let build = root.join("26100.1742").join("amd64");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::write(build.join("ssu.cab"), vec![0u8; 1024]).unwrap();
        std::fs::write(build.join("cu.esd"), vec![0u8; 2048]).unwrap();
        std::fs::write(build.join("cu2.esd.part"), vec![0u8; 10]).unwrap();
        let ep = root.join("EP").join("amd64");
        std::fs::create_dir_all(&ep).unwrap();
        std::fs::write(ep.join("ep.cab"), b"ep").unwrap();
        std::fs::write(root.join(INDEX_FILE), "{\"entries\":[]}").unwrap();
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_list_cached_builds() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let builds = list_cached_builds(temp.path()).unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].name, "26100.1742");
        assert_eq!(builds[0].files, 2);
        assert_eq!(builds[0].formatted_size(), "3.0 KB");
        assert_eq!(builds[1].name, "EP");
    }

    #[test]
    fn test_cache_stats() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let stats = cache_stats(temp.path()).unwrap();
        assert_eq!(stats.builds, 2);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.total_size, 1024 + 2048 + 2);
    }

    #[test]
    fn test_clear_cache() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        clear_cache(temp.path()).unwrap();
        assert!(temp.path().exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_cache_is_empty() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        assert_eq!(cache_stats(&root).unwrap(), CacheStats::default());
        clear_cache(&root).unwrap();
    }
}
