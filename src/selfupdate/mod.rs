//! Self-update by checksum
//!
//! The updater binary is published at `<primary>/<binary>` with a checksum
//! sidecar next to it. When the running binary's checksum differs, the new
//! binary is downloaded into the staging folder and verified. The checker
//! only decides; [`replace`] swaps the binary and relaunches it.

pub mod replace;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, TriquetraError, fs as fs_error, network};
use crate::hash::{Checksum, ChecksumAlgorithm, HashingWriter, hash_file, verify_hash};
use crate::remote::{self, Transport};

pub use replace::{RELAUNCH_ENV, cleanup_previous, install_and_relaunch};

/// Remote location and checksum of the published updater
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfUpdateManifest {
    pub binary_url: Url,
    pub checksum: Checksum,
}

/// What the run should do about the updater binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateDecision {
    NoUpdate,
    /// A verified replacement waits at this path
    UpdateAndRelaunch(PathBuf),
}

/// Compares the running binary against the published one
pub struct SelfUpdateChecker<'a> {
    transport: &'a dyn Transport,
    primary: &'a Url,
    binary_name: &'a str,
    staging_dir: &'a Path,
}

impl<'a> SelfUpdateChecker<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        primary: &'a Url,
        binary_name: &'a str,
        staging_dir: &'a Path,
    ) -> Self {
        Self {
            transport,
            primary,
            binary_name,
            staging_dir,
        }
    }

    /// Fetch the published checksum; `None` when the server has none
    pub fn manifest(&self) -> Result<Option<SelfUpdateManifest>> {
        let binary_url = remote::join(self.primary, self.binary_name)?;
        for algorithm in ChecksumAlgorithm::ALL {
            let sidecar = remote::join(
                self.primary,
                &format!("{}{}", self.binary_name, algorithm.sidecar_suffix()),
            )?;
            if self.transport.exists(&sidecar)? {
                let text = self.transport.get_text(&sidecar)?;
                return Ok(Some(SelfUpdateManifest {
                    binary_url,
                    checksum: Checksum::from_sidecar(&text, algorithm)?,
                }));
            }
        }
        Ok(None)
    }

    /// Decide whether `current_exe` needs replacing.
    ///
    /// An unreachable manifest means no update. A staged binary that does
    /// not match the published checksum is deleted and reported as
    /// [`TriquetraError::IntegrityMismatch`].
    pub fn check(&self, current_exe: &Path) -> Result<SelfUpdateDecision> {
        let manifest = match self.manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                debug!("no published updater checksum");
                return Ok(SelfUpdateDecision::NoUpdate);
            }
            Err(e) => {
                warn!(error = %e, "could not fetch updater checksum, skipping self-update");
                return Ok(SelfUpdateDecision::NoUpdate);
            }
        };

        let local = hash_file(current_exe, manifest.checksum.algorithm())?;
        debug!(local = %local, remote = %manifest.checksum, "updater checksums");
        if verify_hash(&manifest.checksum, &local) {
            info!("triquetra is up to date");
            return Ok(SelfUpdateDecision::NoUpdate);
        }

        info!(url = %manifest.binary_url, "downloading updated triquetra");
        let staged = self.stage(&manifest)?;
        Ok(SelfUpdateDecision::UpdateAndRelaunch(staged))
    }

    fn stage(&self, manifest: &SelfUpdateManifest) -> Result<PathBuf> {
        fs::create_dir_all(self.staging_dir)
            .map_err(|e| fs_error::write_failed(self.staging_dir, e))?;
        let staged = self.staging_dir.join(self.binary_name);

        let mut body = self.transport.open(&manifest.binary_url, None)?;
        let file = File::create(&staged).map_err(|e| fs_error::write_failed(&staged, e))?;
        let mut hashing = HashingWriter::new(file, manifest.checksum.algorithm());
        let copied = io::copy(&mut body.reader, &mut hashing).and_then(|_| hashing.flush());
        let (file, actual) = hashing.finish();
        drop(file);

        if let Err(e) = copied {
            discard(&staged);
            return Err(network::http(&manifest.binary_url, e));
        }
        if !verify_hash(&manifest.checksum, &actual) {
            discard(&staged);
            return Err(TriquetraError::IntegrityMismatch {
                expected: manifest.checksum.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(staged)
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "could not remove staged updater");
    }
}
