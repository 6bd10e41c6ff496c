//! Local download cache
//!
//! Downloaded artifacts are kept under `<workdir>/cache` so that a re-run
//! (after a failed install, or after the user declined a gate) does not
//! download them again. Entries are never trusted: the download manager
//! re-verifies every cached file before reuse.
//!
//! This module is organized into:
//! - [`paths`]: cache layout
//! - [`index`]: checksum bookkeeping (`index.json`)
//! - [`stats`]: listing, statistics and clearing

pub mod index;
pub mod paths;
pub mod stats;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::ArtifactDescriptor;
use crate::error::{Result, cache as cache_error};

pub use index::{CacheIndex, IndexEntry};
pub use paths::{
    ENABLEMENT_DIR, INDEX_FILE, PARTIAL_SUFFIX, artifact_path, enablement_path, index_key,
    partial_path,
};
pub use stats::{CacheStats, CachedBuild, cache_stats, clear_cache, format_size, list_cached_builds};

/// Handle on the cache directory of one working directory
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_index(&self) -> Result<CacheIndex> {
        CacheIndex::load(&self.root)
    }

    /// Record a verified download in the index
    pub fn record(&self, artifact: &ArtifactDescriptor, size: u64) -> Result<()> {
        let mut index = self.load_index()?;
        index.record(IndexEntry {
            path: index_key(&self.root, &artifact.cache_path),
            kind: artifact.kind,
            checksum: artifact.expected.clone(),
            size,
            source: artifact.remote_url.to_string(),
        });
        index.save(&self.root)
    }

    /// Drop the index entry of a file that is no longer valid
    pub fn forget(&self, path: &Path) -> Result<()> {
        let mut index = self.load_index()?;
        if index.forget(&index_key(&self.root, path)).is_some() {
            index.save(&self.root)?;
        }
        Ok(())
    }

    /// Delete a cached file and its index entry, then prune empty folders.
    ///
    /// Returns `false` when the file was already gone.
    pub fn remove_entry(&self, path: &Path) -> Result<bool> {
        let existed = path.exists();
        if existed {
            fs::remove_file(path).map_err(|e| {
                cache_error::operation_failed(format!(
                    "Failed to remove {}: {e}",
                    path.display()
                ))
            })?;
        }
        self.forget(path)?;
        self.prune_empty_dirs()?;
        Ok(existed)
    }

    /// Delete every cached file of one build folder (or `EP`)
    pub fn remove_build(&self, name: &str) -> Result<()> {
        let dir = self.root.join(name);
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) || !dir.is_dir() {
            return Err(cache_error::operation_failed(format!(
                "Build '{name}' not found in cache"
            )));
        }

        fs::remove_dir_all(&dir).map_err(|e| {
            cache_error::operation_failed(format!(
                "Failed to remove {}: {e}",
                dir.display()
            ))
        })?;

        let mut index = self.load_index()?;
        let prefix = format!("{name}/");
        let stale: Vec<String> = index
            .entries()
            .iter()
            .filter(|e| e.path.starts_with(&prefix))
            .map(|e| e.path.clone())
            .collect();
        for path in &stale {
            index.forget(path);
        }
        if !stale.is_empty() {
            index.save(&self.root)?;
        }
        Ok(())
    }

    /// Delete `.part` files left behind by an interrupted run
    pub fn remove_stale_partials(&self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let path = entry.path();
            if entry.file_type().is_file() && path.to_string_lossy().ends_with(PARTIAL_SUFFIX) {
                match fs::remove_file(path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "removed stale partial download");
                        removed += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial download"),
                }
            }
        }
        Ok(removed)
    }

    /// Remove empty folders below the cache root (the root itself stays)
    pub fn prune_empty_dirs(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }

        let dirs: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect();

        for dir in dirs {
            let is_empty = fs::read_dir(&dir).map(|mut d| d.next().is_none()).unwrap_or(false);
            if is_empty {
                fs::remove_dir(&dir).map_err(|e| {
                    cache_error::operation_failed(format!(
                        "Failed to remove {}: {e}",
                        dir.display()
                    ))
                })?;
            }
        }
        Ok(())
    }
}
