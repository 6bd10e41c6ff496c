//! Update run orchestration
//!
//! One run, start to finish:
//!
//! 1. Probe the local environment and refuse unsupported systems
//! 2. Check for a newer updater and stop for a relaunch if one was staged
//! 3. Select the fastest reachable endpoint
//! 4. Scan candidates and build the [`InstallPlan`]
//! 5. Download and verify the packages
//! 6. Install them in order, then offer the Enablement Package
//! 7. Clean up and offer a restart, even after a failed step
//!
//! Every gate can stop the run cleanly. Each collaborator is injected so a
//! run can be driven entirely in memory.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::plan::{EnablementOffer, InstallPlan, build_plan};
use super::retention::{RetentionManager, RetentionResult};
use super::sequencer::{EnablementSource, InstallSequencer, SequenceOutcome};
use crate::cache::ArtifactCache;
use crate::config::EngineConfig;
use crate::domain::{Architecture, ArtifactDescriptor};
use crate::download::DownloadManager;
use crate::environment::EnvironmentProbe;
use crate::error::Result;
use crate::installer::PackageInstaller;
use crate::progress::ProgressDisplay;
use crate::prompt::{DecisionProvider, Gate};
use crate::remote::Transport;
use crate::scanner::CandidateScanner;
use crate::selector::{SelectedEndpoint, select_endpoint};
use crate::selfupdate::{SelfUpdateChecker, SelfUpdateDecision};

/// How a run ended without a fatal error
#[derive(Debug)]
pub enum UpdateOutcome {
    /// A verified updater was staged; relaunch before doing anything else
    Relaunch { staged: PathBuf },
    /// The user declined a gate
    Declined { gate: Gate },
    /// Installed build is current and no Enablement Package applies
    UpToDate { plan: InstallPlan },
    Finished(Box<RunSummary>),
}

/// What a finished run did
#[derive(Debug)]
pub struct RunSummary {
    pub endpoint: SelectedEndpoint,
    pub plan: InstallPlan,
    pub reused: usize,
    pub downloaded: usize,
    pub sequence: SequenceOutcome,
    pub retention: RetentionResult,
    pub rebooting: bool,
}

/// Drives one update run
pub struct UpdateEngine<'a> {
    config: &'a EngineConfig,
    transport: Arc<dyn Transport>,
    environment: &'a dyn EnvironmentProbe,
    installer: &'a dyn PackageInstaller,
    decisions: &'a dyn DecisionProvider,
    progress: ProgressDisplay,
    current_exe: Option<PathBuf>,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(
        config: &'a EngineConfig,
        transport: Arc<dyn Transport>,
        environment: &'a dyn EnvironmentProbe,
        installer: &'a dyn PackageInstaller,
        decisions: &'a dyn DecisionProvider,
    ) -> Self {
        Self {
            config,
            transport,
            environment,
            installer,
            decisions,
            progress: ProgressDisplay::hidden(),
            current_exe: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressDisplay) -> Self {
        self.progress = progress;
        self
    }

    /// Compare this binary against the published updater before each run
    #[must_use]
    pub fn with_self_update(mut self, current_exe: PathBuf) -> Self {
        self.current_exe = Some(current_exe);
        self
    }

    pub fn run(&self) -> Result<UpdateOutcome> {
        let local = self.environment.probe()?;
        let edition = local.require_supported()?;
        info!(build = %local.version, edition = %edition, "local system");

        if let Some(staged) = self.check_self_update() {
            return Ok(UpdateOutcome::Relaunch { staged });
        }

        if !self.decisions.confirm(Gate::Search)? {
            return Ok(declined(Gate::Search));
        }

        let spinner = self.progress.spinner("Selecting update server");
        let endpoint = select_endpoint(&self.transport, self.config);
        spinner.finish_and_clear();
        let endpoint = endpoint?;
        info!(endpoint = %endpoint.url, "using update server");

        let cache = ArtifactCache::new(self.config.cache_dir());
        let stale = cache.remove_stale_partials()?;
        if stale > 0 {
            info!(files = stale, "removed interrupted downloads");
        }

        let transport = self.transport.as_ref();
        let scanner = CandidateScanner::new(
            transport,
            &endpoint.url,
            &self.config.incomplete_marker,
            cache.root(),
        );
        let candidates = scanner.scan(edition.arch)?;
        let plan = build_plan(
            &scanner,
            &candidates,
            local.version,
            edition,
            &endpoint.url,
            self.config,
        )?;
        if plan.is_empty() {
            return Ok(UpdateOutcome::UpToDate { plan });
        }

        let manager = DownloadManager::new(transport, &cache, self.progress);
        let (reused, downloaded) = match self.acquire_update(&manager, &plan)? {
            Acquisition::Ready { reused, downloaded } => (reused, downloaded),
            Acquisition::Declined(gate) => return Ok(declined(gate)),
        };

        let enablement = RemoteEnablement {
            scanner: &scanner,
            manager: &manager,
            arch: edition.arch,
        };
        let mut sequence =
            InstallSequencer::new(self.installer, self.decisions).run(&plan, &enablement)?;

        let retention = if self.config.dry_run {
            RetentionResult::Skipped
        } else {
            RetentionManager::new(&cache, self.decisions).apply(&sequence)?
        };

        // Packages applied before a failure may still need the restart.
        let rebooting = sequence.restart_required
            && !self.config.dry_run
            && self.decisions.confirm(Gate::Reboot)?;
        if rebooting {
            self.installer.reboot()?;
        }
        if let Some(failure) = sequence.failure.take() {
            return Err(failure);
        }

        if let Some(deferred) = plan.deferred {
            info!(%deferred, "run triquetra again after restarting to install the newer build");
        }

        Ok(UpdateOutcome::Finished(Box::new(RunSummary {
            endpoint,
            plan,
            reused,
            downloaded,
            sequence,
            retention,
            rebooting,
        })))
    }

    /// Download and verify the update packages between the download and
    /// install gates
    fn acquire_update(
        &self,
        manager: &DownloadManager<'_>,
        plan: &InstallPlan,
    ) -> Result<Acquisition> {
        let Some(manifest) = &plan.update else {
            return Ok(Acquisition::Ready {
                reused: 0,
                downloaded: 0,
            });
        };
        let build = manifest.version;

        if !self.decisions.confirm(Gate::Download { build })? {
            return Ok(Acquisition::Declined(Gate::Download { build }));
        }

        let report = manager.acquire_all(&manifest.artifacts());
        let (reused, downloaded) = (report.reused.len(), report.downloaded.len());
        if let Some((_, failure)) = report.into_first_failure() {
            return Err(failure);
        }

        if self.config.dry_run {
            info!("dry run: packages downloaded and verified, nothing will be installed");
        } else if !self.decisions.confirm(Gate::Install { build })? {
            return Ok(Acquisition::Declined(Gate::Install { build }));
        }
        Ok(Acquisition::Ready { reused, downloaded })
    }

    /// Path of a staged updater, when one must replace this binary
    fn check_self_update(&self) -> Option<PathBuf> {
        if !self.config.self_update.enabled {
            return None;
        }
        let current_exe = self.current_exe.as_ref()?;
        let staging = self.config.staging_dir();
        let checker = SelfUpdateChecker::new(
            self.transport.as_ref(),
            &self.config.primary,
            &self.config.self_update.binary_name,
            &staging,
        );

        match checker.check(current_exe) {
            Ok(SelfUpdateDecision::UpdateAndRelaunch(staged)) => Some(staged),
            Ok(SelfUpdateDecision::NoUpdate) => None,
            Err(e) => {
                warn!(error = %e, "self-update check failed, continuing with this version");
                None
            }
        }
    }
}

enum Acquisition {
    Ready { reused: usize, downloaded: usize },
    Declined(Gate),
}

fn declined(gate: Gate) -> UpdateOutcome {
    info!(%gate, "stopped at user request");
    UpdateOutcome::Declined { gate }
}

/// Resolves the Enablement Package on the selected endpoint and downloads it
struct RemoteEnablement<'s> {
    scanner: &'s CandidateScanner<'s>,
    manager: &'s DownloadManager<'s>,
    arch: Architecture,
}

impl EnablementSource for RemoteEnablement<'_> {
    fn acquire(&self, offer: &EnablementOffer) -> Result<ArtifactDescriptor> {
        let artifact = self.scanner.enablement(self.arch, &offer.package)?;
        self.manager.acquire(&artifact)?;
        Ok(artifact)
    }
}
