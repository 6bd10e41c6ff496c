//! OS package installation
//!
//! The engine never calls the servicing API directly; it hands a verified
//! package path to a [`PackageInstaller`]. The Windows implementation runs
//! `Add-WindowsPackage` through PowerShell.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::domain::ArtifactKind;
use crate::error::{Result, TriquetraError, fs as fs_error};

/// Exit code the install script uses to signal a pending restart
const RESTART_REQUIRED_EXIT: i32 = 3010;

/// Outcome of one successful package installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub restart_required: bool,
}

/// Applies servicing packages to the running OS
pub trait PackageInstaller {
    /// Install one package; failure is `InstallStepFailure`
    fn install(&self, path: &Path, kind: ArtifactKind) -> Result<InstallReport>;

    /// Restart the machine shortly
    fn reboot(&self) -> Result<()>;
}

fn step_failure(path: &Path, kind: ArtifactKind, reason: impl Into<String>) -> TriquetraError {
    TriquetraError::InstallStepFailure {
        step: kind.label().to_string(),
        artifact: path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string()),
        reason: reason.into(),
    }
}

/// `Add-WindowsPackage -Online` through PowerShell
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerShellInstaller;

impl PowerShellInstaller {
    fn script(path: &Path) -> String {
        let quoted = path.display().to_string().replace('\'', "''");
        format!(
            "$ErrorActionPreference = 'Stop'; \
             $r = Add-WindowsPackage -Online -PackagePath '{quoted}' -NoRestart; \
             if ($r.RestartNeeded) {{ exit {RESTART_REQUIRED_EXIT} }} else {{ exit 0 }}"
        )
    }
}

impl PackageInstaller for PowerShellInstaller {
    fn install(&self, path: &Path, kind: ArtifactKind) -> Result<InstallReport> {
        info!(step = %kind, path = %path.display(), "installing package");
        let output = Command::new("powershell")
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                &Self::script(path),
            ])
            .output()
            .map_err(|e| step_failure(path, kind, format!("could not start PowerShell: {e}")))?;

        match output.status.code() {
            Some(0) => Ok(InstallReport {
                kind,
                path: path.to_path_buf(),
                restart_required: false,
            }),
            Some(RESTART_REQUIRED_EXIT) => Ok(InstallReport {
                kind,
                path: path.to_path_buf(),
                restart_required: true,
            }),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = match code {
                    Some(code) => format!("exit code {code}: {}", stderr.trim()),
                    None => format!("terminated by signal: {}", stderr.trim()),
                };
                Err(step_failure(path, kind, reason))
            }
        }
    }

    fn reboot(&self) -> Result<()> {
        info!("restarting in 5 seconds");
        let status = Command::new("shutdown")
            .args(["/r", "/t", "5"])
            .status()
            .map_err(|e| fs_error::io_error(format!("could not run shutdown: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(fs_error::io_error(format!("shutdown exited with {status}")))
        }
    }
}

/// Reports success without touching the OS (`--dry-run`)
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunInstaller;

impl PackageInstaller for DryRunInstaller {
    fn install(&self, path: &Path, kind: ArtifactKind) -> Result<InstallReport> {
        info!(step = %kind, path = %path.display(), "dry run: would install package");
        Ok(InstallReport {
            kind,
            path: path.to_path_buf(),
            restart_required: false,
        })
    }

    fn reboot(&self) -> Result<()> {
        info!("dry run: would restart");
        Ok(())
    }
}

/// Records installation calls; optionally fails one step
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    calls: Mutex<Vec<(ArtifactKind, PathBuf)>>,
    fail_on: Option<ArtifactKind>,
    reboots: Mutex<usize>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installer whose `kind` step fails
    pub fn failing_on(kind: ArtifactKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Self::default()
        }
    }

    /// Kinds installed so far, in call order
    pub fn installed(&self) -> Vec<ArtifactKind> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(kind, _)| *kind).collect())
            .unwrap_or_default()
    }

    pub fn installed_paths(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, path)| path.clone()).collect())
            .unwrap_or_default()
    }

    pub fn reboots(&self) -> usize {
        self.reboots.lock().map(|r| *r).unwrap_or_default()
    }
}

impl PackageInstaller for RecordingInstaller {
    fn install(&self, path: &Path, kind: ArtifactKind) -> Result<InstallReport> {
        debug!(step = %kind, path = %path.display(), "recording install");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((kind, path.to_path_buf()));
        }
        if self.fail_on == Some(kind) {
            return Err(step_failure(path, kind, "simulated failure"));
        }
        Ok(InstallReport {
            kind,
            path: path.to_path_buf(),
            restart_required: true,
        })
    }

    fn reboot(&self) -> Result<()> {
        if let Ok(mut reboots) = self.reboots.lock() {
            *reboots += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_quotes_path() {
        let script = PowerShellInstaller::script(Path::new(r"C:\ProgramData\it's\cu.esd"));
        assert!(script.contains(r"-PackagePath 'C:\ProgramData\it''s\cu.esd'"));
        assert!(script.contains("-NoRestart"));
    }

    #[test]
    fn test_dry_run_succeeds() {
        let report = DryRunInstaller
            .install(Path::new("ssu.cab"), ArtifactKind::Ssu)
            .unwrap();
        assert_eq!(report.kind, ArtifactKind::Ssu);
        assert!(!report.restart_required);
        DryRunInstaller.reboot().unwrap();
    }

    #[test]
    fn test_recording_installer_failure_names_step() {
        let installer = RecordingInstaller::failing_on(ArtifactKind::Cu);
        installer.install(Path::new("ssu.cab"), ArtifactKind::Ssu).unwrap();
        let err = installer
            .install(Path::new("cu.esd"), ArtifactKind::Cu)
            .unwrap_err();

        assert!(err.to_string().contains("CU"));
        assert!(err.to_string().contains("cu.esd"));
        assert_eq!(installer.installed(), vec![ArtifactKind::Ssu, ArtifactKind::Cu]);
    }
}
