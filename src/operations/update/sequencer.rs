//! Ordered package installation
//!
//! The sequencer walks a fixed state machine:
//!
//! ```text
//! Idle -> BaselineCheck -> ApplyingSSU -> ApplyingCU -> ApplyingNDP -> EPOffer -> Complete
//! ```
//!
//! `Failed` is reachable from every non-terminal state and records the step
//! that failed. Each step waits for the previous installer call; an absent
//! optional package passes its state without calling the installer.

use std::fmt;

use tracing::{error, info};

use super::plan::{EnablementOffer, InstallPlan};
use crate::domain::{ArtifactDescriptor, ArtifactKind, FeatureUpdate};
use crate::error::{Result, TriquetraError};
use crate::installer::PackageInstaller;
use crate::prompt::{DecisionProvider, Gate};

/// State of an installation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    BaselineCheck,
    ApplyingSsu,
    ApplyingCu,
    ApplyingNdp,
    EpOffer,
    Complete,
    Failed { step: ArtifactKind },
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallState::Idle => f.write_str("Idle"),
            InstallState::BaselineCheck => f.write_str("BaselineCheck"),
            InstallState::ApplyingSsu => f.write_str("ApplyingSSU"),
            InstallState::ApplyingCu => f.write_str("ApplyingCU"),
            InstallState::ApplyingNdp => f.write_str("ApplyingNDP"),
            InstallState::EpOffer => f.write_str("EPOffer"),
            InstallState::Complete => f.write_str("Complete"),
            InstallState::Failed { step } => write!(f, "Failed({step})"),
        }
    }
}

/// What happened to the Enablement Package offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnablementResult {
    NotOffered,
    Declined,
    Installed { target: FeatureUpdate },
}

/// Fetches the Enablement Package once the user accepts it
pub trait EnablementSource {
    /// Resolve, download and verify the package for `offer`
    fn acquire(&self, offer: &EnablementOffer) -> Result<ArtifactDescriptor>;
}

impl<F> EnablementSource for F
where
    F: Fn(&EnablementOffer) -> Result<ArtifactDescriptor>,
{
    fn acquire(&self, offer: &EnablementOffer) -> Result<ArtifactDescriptor> {
        self(offer)
    }
}

/// Result of a sequencer run
#[derive(Debug)]
pub struct SequenceOutcome {
    /// `Complete` or `Failed`
    pub state: InstallState,
    /// Every state entered, in order
    pub history: Vec<InstallState>,
    /// Packages the installer applied successfully
    pub applied: Vec<ArtifactDescriptor>,
    pub enablement: EnablementResult,
    pub restart_required: bool,
    pub failure: Option<TriquetraError>,
}

impl SequenceOutcome {
    pub fn is_complete(&self) -> bool {
        self.state == InstallState::Complete
    }
}

/// Applies the packages of an [`InstallPlan`] in order
pub struct InstallSequencer<'a> {
    installer: &'a dyn PackageInstaller,
    decisions: &'a dyn DecisionProvider,
    state: InstallState,
    history: Vec<InstallState>,
    applied: Vec<ArtifactDescriptor>,
    restart_required: bool,
}

impl<'a> InstallSequencer<'a> {
    pub fn new(installer: &'a dyn PackageInstaller, decisions: &'a dyn DecisionProvider) -> Self {
        Self {
            installer,
            decisions,
            state: InstallState::Idle,
            history: vec![InstallState::Idle],
            applied: Vec::new(),
            restart_required: false,
        }
    }

    fn enter(&mut self, state: InstallState) {
        info!(from = %self.state, to = %state, "install state");
        self.state = state;
        self.history.push(state);
    }

    /// Run the plan to a terminal state. Only a failing prompt is returned
    /// as an error; installation failures end in `Failed`.
    pub fn run(
        mut self,
        plan: &InstallPlan,
        enablement: &dyn EnablementSource,
    ) -> Result<SequenceOutcome> {
        self.enter(InstallState::BaselineCheck);
        if plan.baseline_forced {
            info!(
                target = ?plan.target(),
                deferred = ?plan.deferred,
                "baseline build is installed before any newer build"
            );
        }

        if let Some(manifest) = &plan.update {
            let steps = [
                (InstallState::ApplyingSsu, ArtifactKind::Ssu, manifest.ssu.as_ref()),
                (InstallState::ApplyingCu, ArtifactKind::Cu, Some(&manifest.cu)),
                (InstallState::ApplyingNdp, ArtifactKind::Ndp, manifest.ndp.as_ref()),
            ];
            for (state, kind, artifact) in steps {
                self.enter(state);
                let Some(artifact) = artifact else {
                    info!(step = %kind, "nothing to apply");
                    continue;
                };
                if let Err(e) = self.apply(artifact) {
                    return Ok(self.fail(kind, e));
                }
            }
        }

        let Some(offer) = &plan.enablement else {
            self.enter(InstallState::Complete);
            return Ok(self.finish(EnablementResult::NotOffered, None));
        };

        self.enter(InstallState::EpOffer);
        if !self.decisions.confirm(Gate::EnablementPackage {
            target: offer.target,
        })? {
            info!(target = %offer.target, "Enablement Package declined");
            self.enter(InstallState::Complete);
            return Ok(self.finish(EnablementResult::Declined, None));
        }

        let applied = enablement
            .acquire(offer)
            .and_then(|artifact| self.apply(&artifact));
        match applied {
            Ok(()) => {
                self.enter(InstallState::Complete);
                Ok(self.finish(
                    EnablementResult::Installed {
                        target: offer.target,
                    },
                    None,
                ))
            }
            Err(e) => Ok(self.fail(ArtifactKind::Ep, e)),
        }
    }

    fn apply(&mut self, artifact: &ArtifactDescriptor) -> Result<()> {
        let report = self.installer.install(&artifact.cache_path, artifact.kind)?;
        info!(
            artifact = %artifact,
            restart_required = report.restart_required,
            "package installed"
        );
        self.restart_required |= report.restart_required;
        self.applied.push(artifact.clone());
        Ok(())
    }

    fn fail(mut self, step: ArtifactKind, failure: TriquetraError) -> SequenceOutcome {
        error!(%step, error = %failure, "installation stopped");
        self.enter(InstallState::Failed { step });
        self.finish(EnablementResult::NotOffered, Some(failure))
    }

    fn finish(self, enablement: EnablementResult, failure: Option<TriquetraError>) -> SequenceOutcome {
        SequenceOutcome {
            state: self.state,
            history: self.history,
            applied: self.applied,
            enablement,
            restart_required: self.restart_required,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use url::Url;

    use crate::config::default_enablement_packages;
    use crate::domain::{
        Architecture, ArtifactDetail, ArtifactManifest, BuildVersion, CuFormat, EditionTag,
    };
    use crate::hash::{Checksum, ChecksumAlgorithm};
    use crate::installer::RecordingInstaller;
    use crate::prompt::ScriptedDecisions;

    const DIGEST: &str = "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85";

    fn artifact(kind: ArtifactKind, name: &str, detail: ArtifactDetail) -> ArtifactDescriptor {
        ArtifactDescriptor {
            kind,
            detail,
            file_name: name.to_string(),
            remote_url: Url::parse(&format!("http://primary.test/26100.6899/amd64/{name}")).unwrap(),
            expected: Checksum::new(ChecksumAlgorithm::Blake3, DIGEST).unwrap(),
            cache_path: PathBuf::from("cache").join(name),
        }
    }

    fn manifest(ssu: bool, ndp: bool) -> ArtifactManifest {
        ArtifactManifest {
            version: BuildVersion::new(26100, 6899),
            arch: Architecture::Amd64,
            ssu: ssu.then(|| artifact(ArtifactKind::Ssu, "ssu.cab", ArtifactDetail::Plain)),
            cu: artifact(
                ArtifactKind::Cu,
                "windows11.0-kb1-x64.esd",
                ArtifactDetail::CumulativeUpdate {
                    format: CuFormat::CompactImage,
                },
            ),
            ndp: ndp.then(|| artifact(ArtifactKind::Ndp, "ndp481.cab", ArtifactDetail::Plain)),
        }
    }

    fn plan(update: Option<ArtifactManifest>, enablement: bool) -> InstallPlan {
        let package = default_enablement_packages()
            .into_iter()
            .find(|p| p.from == FeatureUpdate::V24H2)
            .unwrap();
        InstallPlan {
            local: BuildVersion::new(26100, 5074),
            edition: EditionTag {
                feature: FeatureUpdate::V24H2,
                arch: Architecture::Amd64,
            },
            endpoint: Url::parse("http://primary.test/").unwrap(),
            update,
            baseline_forced: false,
            deferred: None,
            enablement: enablement.then(|| EnablementOffer {
                target: FeatureUpdate::V25H2,
                package,
            }),
        }
    }

    fn ep_source(offer: &EnablementOffer) -> Result<ArtifactDescriptor> {
        Ok(artifact(
            ArtifactKind::Ep,
            "Windows11.0-KB5054156-x64.cab",
            ArtifactDetail::Enablement {
                target: offer.target,
            },
        ))
    }

    fn no_ep(_: &EnablementOffer) -> Result<ArtifactDescriptor> {
        Err(TriquetraError::IoError {
            message: "not expected".to_string(),
        })
    }

    #[test]
    fn test_full_sequence_in_order() {
        let installer = RecordingInstaller::new();
        let decisions = ScriptedDecisions::answering(true);

        let outcome = InstallSequencer::new(&installer, &decisions)
            .run(&plan(Some(manifest(true, true)), false), &no_ep)
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(
            installer.installed(),
            vec![ArtifactKind::Ssu, ArtifactKind::Cu, ArtifactKind::Ndp]
        );
        assert_eq!(
            outcome.history,
            vec![
                InstallState::Idle,
                InstallState::BaselineCheck,
                InstallState::ApplyingSsu,
                InstallState::ApplyingCu,
                InstallState::ApplyingNdp,
                InstallState::Complete,
            ]
        );
        assert_eq!(outcome.applied.len(), 3);
        assert!(outcome.restart_required);
    }

    #[test]
    fn test_absent_optional_packages_pass_without_installer_call() {
        let installer = RecordingInstaller::new();
        let decisions = ScriptedDecisions::answering(true);

        let outcome = InstallSequencer::new(&installer, &decisions)
            .run(&plan(Some(manifest(false, false)), false), &no_ep)
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(installer.installed(), vec![ArtifactKind::Cu]);
        assert!(outcome.history.contains(&InstallState::ApplyingNdp));
    }

    #[test]
    fn test_failure_stops_and_records_step() {
        let installer = RecordingInstaller::failing_on(ArtifactKind::Cu);
        let decisions = ScriptedDecisions::answering(true);

        let outcome = InstallSequencer::new(&installer, &decisions)
            .run(&plan(Some(manifest(true, true)), true), &ep_source)
            .unwrap();

        assert_eq!(
            outcome.state,
            InstallState::Failed {
                step: ArtifactKind::Cu
            }
        );
        assert_eq!(installer.installed(), vec![ArtifactKind::Ssu, ArtifactKind::Cu]);
        assert_eq!(outcome.applied.len(), 1);
        assert!(!decisions.was_asked(|g| matches!(g, Gate::EnablementPackage { .. })));
        assert!(matches!(
            outcome.failure,
            Some(TriquetraError::InstallStepFailure { .. })
        ));
    }

    #[test]
    fn test_enablement_accepted_after_update() {
        let installer = RecordingInstaller::new();
        let decisions = ScriptedDecisions::answering(true);

        let outcome = InstallSequencer::new(&installer, &decisions)
            .run(&plan(Some(manifest(true, false)), true), &ep_source)
            .unwrap();

        assert_eq!(
            outcome.enablement,
            EnablementResult::Installed {
                target: FeatureUpdate::V25H2
            }
        );
        assert_eq!(
            installer.installed(),
            vec![ArtifactKind::Ssu, ArtifactKind::Cu, ArtifactKind::Ep]
        );
        assert!(outcome.history.contains(&InstallState::EpOffer));
    }

    #[test]
    fn test_enablement_declined_completes() {
        let installer = RecordingInstaller::new();
        let decisions = ScriptedDecisions::answering(true)
            .with(Gate::EnablementPackage { target: FeatureUpdate::V25H2 }, false);

        let outcome = InstallSequencer::new(&installer, &decisions)
            .run(&plan(None, true), &no_ep)
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.enablement, EnablementResult::Declined);
        assert!(installer.installed().is_empty());
        assert_eq!(
            outcome.history,
            vec![
                InstallState::Idle,
                InstallState::BaselineCheck,
                InstallState::EpOffer,
                InstallState::Complete,
            ]
        );
    }

    #[test]
    fn test_enablement_acquire_failure_fails_run() {
        let installer = RecordingInstaller::new();
        let decisions = ScriptedDecisions::answering(true);

        let outcome = InstallSequencer::new(&installer, &decisions)
            .run(&plan(None, true), &no_ep)
            .unwrap();

        assert_eq!(
            outcome.state,
            InstallState::Failed {
                step: ArtifactKind::Ep
            }
        );
        assert!(installer.installed().is_empty());
    }
}
