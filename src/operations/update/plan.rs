//! Install plan building
//!
//! Turns the local environment and the candidates found on the endpoint into
//! the [`InstallPlan`] for one run: which build to apply (if any), whether
//! the baseline was forced ahead of a newer build, and whether the
//! Enablement Package is offered afterwards.

use tracing::{debug, info};
use url::Url;

use crate::config::{EnablementPackageConfig, EngineConfig};
use crate::domain::{ArtifactManifest, BuildVersion, EditionTag, FeatureUpdate};
use crate::error::{Result, TriquetraError};
use crate::scanner::{CandidateScanner, CandidateSet, select_candidate};

/// Build to apply, as decided from local and remote versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDecision {
    /// Nothing newer than the installed build
    UpToDate,
    Install {
        build: BuildVersion,
        /// The baseline was chosen instead of the selected build
        baseline_forced: bool,
        /// Newer build postponed to a later run by the baseline rule
        deferred: Option<BuildVersion>,
    },
}

/// Enablement Package offered after the update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnablementOffer {
    pub target: FeatureUpdate,
    pub package: EnablementPackageConfig,
}

/// Everything one run intends to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub local: BuildVersion,
    pub edition: EditionTag,
    pub endpoint: Url,
    /// `None` when the machine is up to date
    pub update: Option<ArtifactManifest>,
    pub baseline_forced: bool,
    pub deferred: Option<BuildVersion>,
    pub enablement: Option<EnablementOffer>,
}

impl InstallPlan {
    /// Build the update targets, if any
    pub fn target(&self) -> Option<BuildVersion> {
        self.update.as_ref().map(|m| m.version)
    }

    /// `true` when the run has nothing at all to do
    pub fn is_empty(&self) -> bool {
        self.update.is_none() && self.enablement.is_none()
    }
}

/// Decide which build a run installs.
///
/// Machines below the baseline install the baseline first whenever the
/// selected build is on the baseline's branch or later. An override is
/// installed even when it is not newer than the local build.
pub fn decide_target(
    local: BuildVersion,
    selected: BuildVersion,
    baseline: BuildVersion,
    is_override: bool,
) -> TargetDecision {
    if local < baseline && selected.major >= baseline.major {
        return TargetDecision::Install {
            build: baseline,
            baseline_forced: true,
            deferred: (selected > baseline).then_some(selected),
        };
    }

    if !is_override && selected <= local {
        return TargetDecision::UpToDate;
    }

    TargetDecision::Install {
        build: selected,
        baseline_forced: false,
        deferred: None,
    }
}

/// Enablement Package the machine qualifies for, judged on the build
/// installed before this run.
pub fn enablement_offer(
    local: BuildVersion,
    edition: EditionTag,
    config: &EngineConfig,
) -> Option<EnablementOffer> {
    let Some(target) = edition.feature.enablement_target() else {
        debug!(feature = %edition.feature, "no Enablement Package for this feature update");
        return None;
    };
    let package = config.enablement_for(edition.feature)?;

    if local.major != edition.feature.branch() || local < package.min_build {
        info!(
            %local,
            min_build = %package.min_build,
            "not offering Enablement Package, installed build is below its minimum"
        );
        return None;
    }

    Some(EnablementOffer {
        target,
        package: package.clone(),
    })
}

/// Resolve the plan for this run from the scanned candidates
pub fn build_plan(
    scanner: &CandidateScanner<'_>,
    set: &CandidateSet,
    local: BuildVersion,
    edition: EditionTag,
    endpoint: &Url,
    config: &EngineConfig,
) -> Result<InstallPlan> {
    let selected = select_candidate(set, config.build_override, endpoint)?;
    info!(build = %selected.version, "selected remote build");

    let decision = decide_target(
        local,
        selected.version,
        config.baseline,
        config.build_override.is_some(),
    );

    let (update, baseline_forced, deferred) = match decision {
        TargetDecision::UpToDate => {
            info!(%local, remote = %selected.version, "installed build is up to date");
            (None, false, None)
        }
        TargetDecision::Install {
            build,
            baseline_forced,
            deferred,
        } => {
            let candidate = if baseline_forced {
                set.find(build)
                    .cloned()
                    .ok_or_else(|| TriquetraError::BaselineUnavailable {
                        baseline: build.to_string(),
                    })?
            } else {
                selected
            };
            if let Some(deferred) = deferred {
                info!(
                    baseline = %build,
                    %deferred,
                    "installing baseline build first, newer build follows on the next run"
                );
            }
            (Some(scanner.manifest(&candidate)?), baseline_forced, deferred)
        }
    };

    Ok(InstallPlan {
        local,
        edition,
        endpoint: endpoint.clone(),
        update,
        baseline_forced,
        deferred,
        enablement: enablement_offer(local, edition, config),
    })
}
