//! Artifact acquisition
//!
//! For each artifact: reuse the cached copy if it still matches the
//! published checksum, otherwise stream it into `<file>.part` while hashing,
//! check the digest and only then move it into place. A corrupt or failed
//! download never leaves a file at the final path.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cache::{ArtifactCache, partial_path};
use crate::domain::ArtifactDescriptor;
use crate::error::{Result, TriquetraError, fs as fs_error, network};
use crate::hash::{HashingWriter, verify_file, verify_hash};
use crate::progress::ProgressDisplay;
use crate::remote::Transport;

/// How an artifact ended up in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    /// A cached copy passed verification
    Reused,
    /// Freshly downloaded and verified
    Downloaded { bytes: u64 },
}

/// Result of acquiring a set of artifacts
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub reused: Vec<ArtifactDescriptor>,
    pub downloaded: Vec<ArtifactDescriptor>,
    pub failures: Vec<(ArtifactDescriptor, TriquetraError)>,
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Take the first failure, if any
    pub fn into_first_failure(self) -> Option<(ArtifactDescriptor, TriquetraError)> {
        self.failures.into_iter().next()
    }
}

/// Downloads artifacts into the cache
pub struct DownloadManager<'a> {
    transport: &'a dyn Transport,
    cache: &'a ArtifactCache,
    progress: ProgressDisplay,
}

impl<'a> DownloadManager<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        cache: &'a ArtifactCache,
        progress: ProgressDisplay,
    ) -> Self {
        Self {
            transport,
            cache,
            progress,
        }
    }

    /// Acquire every artifact in order. A failure does not stop the
    /// remaining artifacts; it is listed in the report.
    pub fn acquire_all(&self, artifacts: &[&ArtifactDescriptor]) -> DownloadReport {
        let mut report = DownloadReport::default();
        for artifact in artifacts {
            match self.acquire(artifact) {
                Ok(AcquireStatus::Reused) => report.reused.push((*artifact).clone()),
                Ok(AcquireStatus::Downloaded { .. }) => report.downloaded.push((*artifact).clone()),
                Err(e) => {
                    warn!(artifact = %artifact, error = %e, "failed to acquire artifact");
                    report.failures.push(((*artifact).clone(), e));
                }
            }
        }
        report
    }

    /// Make sure one verified artifact sits at its cache path
    pub fn acquire(&self, artifact: &ArtifactDescriptor) -> Result<AcquireStatus> {
        if self.reuse_cached(artifact)? {
            info!(artifact = %artifact, "using cached copy");
            return Ok(AcquireStatus::Reused);
        }

        let bytes = self.download(artifact)?;
        info!(artifact = %artifact, bytes, "downloaded and verified");
        Ok(AcquireStatus::Downloaded { bytes })
    }

    /// `true` when a cached copy matches; a mismatching copy is discarded
    fn reuse_cached(&self, artifact: &ArtifactDescriptor) -> Result<bool> {
        let path = &artifact.cache_path;
        if !path.exists() {
            return Ok(false);
        }

        match verify_file(path, &artifact.expected) {
            Ok(true) => {
                let index = self.cache.load_index()?;
                let key = crate::cache::index_key(self.cache.root(), path);
                if index.get(&key).is_none_or(|e| e.checksum != artifact.expected) {
                    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    self.cache.record(artifact, size)?;
                }
                Ok(true)
            }
            Ok(false) => {
                warn!(artifact = %artifact, "cached copy failed verification, downloading again");
                discard(path);
                self.cache.forget(path)?;
                Ok(false)
            }
            Err(e) => {
                warn!(artifact = %artifact, error = %e, "cached copy unreadable, downloading again");
                discard(path);
                self.cache.forget(path)?;
                Ok(false)
            }
        }
    }

    fn download(&self, artifact: &ArtifactDescriptor) -> Result<u64> {
        let path = &artifact.cache_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_error::write_failed(parent, e))?;
        }
        let part = partial_path(path);

        let result = self.stream_to(artifact, &part);
        let (bytes, actual) = match result {
            Ok(done) => done,
            Err(e) => {
                discard(&part);
                return Err(e);
            }
        };

        if !verify_hash(&artifact.expected, &actual) {
            discard(&part);
            return Err(TriquetraError::DownloadIntegrity {
                artifact: artifact.file_name.clone(),
                expected: artifact.expected.to_string(),
                actual: actual.to_string(),
            });
        }

        fs::rename(&part, path).map_err(|e| {
            discard(&part);
            fs_error::write_failed(path, e)
        })?;
        self.cache.record(artifact, bytes)?;
        Ok(bytes)
    }

    fn stream_to(
        &self,
        artifact: &ArtifactDescriptor,
        part: &Path,
    ) -> Result<(u64, crate::hash::Checksum)> {
        debug!(url = %artifact.remote_url, part = %part.display(), "downloading");
        let mut body = self.transport.open(&artifact.remote_url, None)?;

        let file = File::create(part).map_err(|e| fs_error::write_failed(part, e))?;
        let mut hashing = HashingWriter::new(file, artifact.expected.algorithm());
        let bar = self.progress.download(&artifact.file_name, body.len);

        let copied = io::copy(&mut bar.wrap_read(&mut body.reader), &mut hashing);
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                bar.abandon();
                return Err(network::http(&artifact.remote_url, e));
            }
        };
        hashing.flush().map_err(|e| fs_error::write_failed(part, e))?;
        bar.finish_and_clear();

        let (file, actual) = hashing.finish();
        file.sync_all().map_err(|e| fs_error::write_failed(part, e))?;
        Ok((bytes, actual))
    }
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "could not remove file");
        }
    }
}
