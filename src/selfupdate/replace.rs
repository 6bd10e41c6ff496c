//! Binary replacement and relaunch
//!
//! Windows lets a running executable be renamed but not overwritten, so the
//! current binary moves aside to `<exe>.old`, the staged binary takes its
//! place and is started with the original arguments. The `.old` file is
//! removed on the next launch.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{Result, TriquetraError};

/// Set on the relaunched process so it does not check for updates again
pub const RELAUNCH_ENV: &str = "TRIQUETRA_RELAUNCHED";

/// Where the replaced binary is parked
pub fn old_path(current_exe: &Path) -> PathBuf {
    let mut name = current_exe.as_os_str().to_owned();
    name.push(".old");
    PathBuf::from(name)
}

/// Remove a binary left behind by an earlier self-update.
///
/// Returns `true` when one was removed.
pub fn cleanup_previous(current_exe: &Path) -> bool {
    let old = old_path(current_exe);
    if !old.exists() {
        return false;
    }
    match fs::remove_file(&old) {
        Ok(()) => {
            debug!(path = %old.display(), "removed previous updater binary");
            true
        }
        Err(e) => {
            warn!(path = %old.display(), error = %e, "could not remove previous updater binary");
            false
        }
    }
}

/// Put the staged binary in place of `current_exe`
pub fn swap(current_exe: &Path, staged: &Path) -> Result<()> {
    let failed = |reason: String| TriquetraError::SelfUpdateFailed { reason };
    let old = old_path(current_exe);

    if old.exists() {
        fs::remove_file(&old)
            .map_err(|e| failed(format!("cannot remove {}: {e}", old.display())))?;
    }
    fs::rename(current_exe, &old)
        .map_err(|e| failed(format!("cannot move {} aside: {e}", current_exe.display())))?;

    let placed = fs::rename(staged, current_exe).or_else(|_| {
        fs::copy(staged, current_exe).map(|_| ()).and_then(|()| fs::remove_file(staged))
    });
    if let Err(e) = placed {
        if let Err(restore) = fs::rename(&old, current_exe) {
            warn!(error = %restore, "could not restore the previous updater binary");
        }
        return Err(failed(format!(
            "cannot move {} into place: {e}",
            staged.display()
        )));
    }
    Ok(())
}

/// Swap in the staged binary and start it with `args`.
///
/// The caller exits once this returns.
pub fn install_and_relaunch(current_exe: &Path, staged: &Path, args: &[OsString]) -> Result<()> {
    swap(current_exe, staged)?;
    info!(path = %current_exe.display(), "restarting updated triquetra");
    Command::new(current_exe)
        .args(args)
        .env(RELAUNCH_ENV, "1")
        .spawn()
        .map_err(|e| TriquetraError::SelfUpdateFailed {
            reason: format!("cannot start {}: {e}", current_exe.display()),
        })?;
    Ok(())
}
