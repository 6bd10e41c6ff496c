//! Cache index management
//!
//! `index.json` remembers which checksum each cached file had when it was
//! downloaded. It is bookkeeping only: a cached file is always re-verified
//! against the checksum currently published before it is reused.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::domain::ArtifactKind;
use crate::error::{Result, cache as cache_error};
use crate::hash::Checksum;

use super::INDEX_FILE;

/// Single entry in the cache index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    /// Path relative to the cache root (see [`super::index_key`])
    pub path: String,
    pub kind: ArtifactKind,
    pub checksum: Checksum,
    pub size: u64,
    /// Where the file was downloaded from
    pub source: String,
}

/// All index entries, sorted by path
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheIndex {
    entries: Vec<IndexEntry>,
}

impl CacheIndex {
    /// Read the index from the cache root.
    ///
    /// A missing or unparsable index is empty; verified files are recorded
    /// again as they are reused.
    pub fn load(root: &Path) -> Result<Self> {
        let index_path = root.join(INDEX_FILE);
        if !index_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&index_path).map_err(|e| {
            cache_error::operation_failed(format!(
                "Failed to read index file {}: {e}",
                index_path.display()
            ))
        })?;

        match serde_json::from_str(&content) {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!(path = %index_path.display(), error = %e, "ignoring unreadable cache index");
                Ok(Self::default())
            }
        }
    }

    /// Write the index to the cache root
    pub fn save(&self, root: &Path) -> Result<()> {
        let index_path = root.join(INDEX_FILE);
        fs::create_dir_all(root).map_err(|e| {
            cache_error::operation_failed(format!(
                "Failed to create cache directory {}: {e}",
                root.display()
            ))
        })?;

        let content = serde_json::to_string_pretty(self)?;
        let write_failed = |e: std::io::Error| {
            cache_error::operation_failed(format!(
                "Failed to write index file {}: {e}",
                index_path.display()
            ))
        };
        let mut temp = NamedTempFile::new_in(root).map_err(write_failed)?;
        temp.write_all(content.as_bytes()).map_err(write_failed)?;
        temp.persist(&index_path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    /// Add an entry, replacing any entry for the same path
    pub fn record(&mut self, entry: IndexEntry) {
        self.entries.retain(|e| e.path != entry.path);
        self.entries.push(entry);
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Remove the entry for `path`, returning it
    pub fn forget(&mut self, path: &str) -> Option<IndexEntry> {
        let position = self.entries.iter().position(|e| e.path == path)?;
        Some(self.entries.remove(position))
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ChecksumAlgorithm;
    use tempfile::TempDir;

    fn entry(path: &str, digest_char: char) -> IndexEntry {
        IndexEntry {
            path: path.to_string(),
            kind: ArtifactKind::Cu,
            checksum: Checksum::new(ChecksumAlgorithm::Blake3, &digest_char.to_string().repeat(64))
                .unwrap(),
            size: 3,
            source: format!("http://primary.test/{path}"),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let mut index = CacheIndex::default();
        index.record(entry("26100.1742/amd64/b.esd", 'b'));
        index.record(entry("26100.1742/amd64/a.cab", 'a'));
        index.save(temp.path()).unwrap();

        let loaded = CacheIndex::load(temp.path()).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.entries()[0].path, "26100.1742/amd64/a.cab");
    }

    #[test]
    fn test_record_replaces_same_path() {
        let mut index = CacheIndex::default();
        index.record(entry("x.esd", 'a'));
        index.record(entry("x.esd", 'b'));
        assert_eq!(index.entries().len(), 1);
        assert!(index.get("x.esd").unwrap().checksum.digest().starts_with('b'));
    }

    #[test]
    fn test_forget() {
        let mut index = CacheIndex::default();
        index.record(entry("x.esd", 'a'));
        assert!(index.forget("x.esd").is_some());
        assert!(index.forget("x.esd").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(CacheIndex::load(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(INDEX_FILE), "{not json").unwrap();
        assert!(CacheIndex::load(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_corrupt_index() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(INDEX_FILE), "{\"entries\": [").unwrap();

        let mut index = CacheIndex::load(temp.path()).unwrap();
        index.record(entry("26100.4000/amd64/a.cab", 'a'));
        index.save(temp.path()).unwrap();

        assert_eq!(CacheIndex::load(temp.path()).unwrap(), index);
        let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
