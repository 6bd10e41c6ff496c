//! Cleanup of installed packages
//!
//! Once a run reaches a terminal state the user may delete the downloaded
//! packages. Only packages that were applied successfully are deleted; a
//! failed run keeps everything so the next run can resume without
//! downloading again.

use tracing::{info, warn};

use super::sequencer::{InstallState, SequenceOutcome};
use crate::cache::ArtifactCache;
use crate::error::Result;
use crate::prompt::{DecisionProvider, Gate};

/// What the cleanup step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionResult {
    /// Failed run, nothing applied, or a dry run
    Skipped,
    /// The user chose to keep the files
    Kept,
    Deleted { files: usize },
}

/// Deletes applied packages from the cache on request
pub struct RetentionManager<'a> {
    cache: &'a ArtifactCache,
    decisions: &'a dyn DecisionProvider,
}

impl<'a> RetentionManager<'a> {
    pub fn new(cache: &'a ArtifactCache, decisions: &'a dyn DecisionProvider) -> Self {
        Self { cache, decisions }
    }

    pub fn apply(&self, outcome: &SequenceOutcome) -> Result<RetentionResult> {
        if matches!(outcome.state, InstallState::Failed { .. }) {
            info!("installation failed, keeping downloaded files for the next run");
            return Ok(RetentionResult::Skipped);
        }
        if outcome.applied.is_empty() {
            return Ok(RetentionResult::Skipped);
        }
        if !self.decisions.confirm(Gate::Cleanup)? {
            info!("keeping installed update files");
            return Ok(RetentionResult::Kept);
        }

        let mut files = 0;
        for artifact in &outcome.applied {
            match self.cache.remove_entry(&artifact.cache_path) {
                Ok(true) => files += 1,
                Ok(false) => {}
                Err(e) => warn!(artifact = %artifact, error = %e, "could not delete file"),
            }
        }
        info!(files, "deleted installed update files");
        Ok(RetentionResult::Deleted { files })
    }
}
