//! Update command implementation
//!
//! Wires the real collaborators (HTTP transport, registry probe, PowerShell
//! installer, console prompts) into the update engine and reports the result.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::{Style, Term};
use tracing::{info, warn};

use crate::cli::UpdateArgs;
use crate::config::EngineConfig;
use crate::environment::{RegistryProbe, is_elevated};
use crate::error::{Result, TriquetraError};
use crate::installer::{DryRunInstaller, PackageInstaller, PowerShellInstaller};
use crate::lock::InstanceGuard;
use crate::logging;
use crate::operations::update::{
    EnablementResult, RetentionResult, RunSummary, UpdateEngine, UpdateOutcome,
};
use crate::progress::ProgressDisplay;
use crate::prompt::{AssumeYes, DecisionProvider, InteractiveDecisions};
use crate::remote::{HttpTransport, Transport};
use crate::selfupdate::{self, RELAUNCH_ENV};

/// How long a relaunched updater waits for its parent to release the lock
const RELAUNCH_LOCK_WAIT: Duration = Duration::from_secs(30);

pub fn run(
    workdir: Option<PathBuf>,
    config_file: Option<PathBuf>,
    verbose: u8,
    args: UpdateArgs,
) -> Result<()> {
    let config = EngineConfig::resolve(args.overrides(workdir, config_file))?;
    logging::init(logging::level_for(verbose), Some(&config.log_path()));
    info!(version = env!("CARGO_PKG_VERSION"), workdir = %config.workdir.display(), "Triquetra Updater");

    if !config.dry_run && !is_elevated() {
        return Err(TriquetraError::NotElevated);
    }
    let relaunched = env::var_os(RELAUNCH_ENV).is_some();
    let guard = if relaunched {
        InstanceGuard::acquire_waiting(&config.workdir, RELAUNCH_LOCK_WAIT)?
    } else {
        InstanceGuard::acquire(&config.workdir)?
    };

    let current_exe = env::current_exe().ok();
    if let Some(exe) = &current_exe {
        selfupdate::cleanup_previous(exe);
    }

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
        config.request_timeout,
        config.credentials.clone(),
    )?);
    let decisions: Box<dyn DecisionProvider> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(InteractiveDecisions)
    };
    let installer: Box<dyn PackageInstaller> = if config.dry_run {
        Box::new(DryRunInstaller)
    } else {
        Box::new(PowerShellInstaller)
    };
    let progress = ProgressDisplay::new(Term::stderr().is_term());
    let probe = RegistryProbe;

    let mut engine = UpdateEngine::new(
        &config,
        transport,
        &probe,
        installer.as_ref(),
        decisions.as_ref(),
    )
    .with_progress(progress);
    match (&current_exe, relaunched) {
        (Some(exe), false) => engine = engine.with_self_update(exe.clone()),
        (_, true) => info!("relaunched after self-update, skipping update check"),
        (None, false) => warn!("cannot locate the running executable, skipping self-update"),
    }

    match engine.run()? {
        UpdateOutcome::Relaunch { staged } => {
            let exe = current_exe.ok_or_else(|| TriquetraError::SelfUpdateFailed {
                reason: "cannot locate the running executable".to_string(),
            })?;
            let args: Vec<OsString> = env::args_os().skip(1).collect();
            guard.release();
            selfupdate::install_and_relaunch(&exe, &staged, &args)?;
            println!("Triquetra was updated and is restarting.");
        }
        UpdateOutcome::Declined { gate } => {
            println!("Stopped before {gate}, nothing else was changed.");
        }
        UpdateOutcome::UpToDate { plan } => {
            println!(
                "{} Installed build {} is up to date.",
                Style::new().green().bold().apply_to("✓"),
                plan.local
            );
        }
        UpdateOutcome::Finished(summary) => print_summary(&summary, config.dry_run),
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let bold = Style::new().bold();
    println!();
    println!("{} {}", bold.apply_to("Server:"), summary.endpoint.url);
    println!("{} {}", bold.apply_to("Installed build:"), summary.plan.local);

    if let Some(target) = summary.plan.target() {
        let verb = if dry_run { "Downloaded" } else { "Updated to" };
        println!(
            "{} {target} ({} downloaded, {} reused)",
            bold.apply_to(format!("{verb}:")),
            summary.downloaded,
            summary.reused
        );
        for artifact in &summary.sequence.applied {
            println!("  {} {}", Style::new().green().apply_to("✓"), artifact);
        }
    }
    if let Some(deferred) = summary.plan.deferred {
        println!(
            "{} build {deferred} is available; run triquetra again after restarting",
            Style::new().yellow().bold().apply_to("Next:")
        );
    }
    match summary.sequence.enablement {
        EnablementResult::Installed { target } => {
            println!("{} upgraded to {target}", bold.apply_to("Enablement Package:"));
        }
        EnablementResult::Declined => {
            println!("{} declined", bold.apply_to("Enablement Package:"));
        }
        EnablementResult::NotOffered => {}
    }
    if let RetentionResult::Deleted { files } = summary.retention {
        println!("{} deleted {files} installed file(s)", bold.apply_to("Cleanup:"));
    }
    if summary.sequence.restart_required && !summary.rebooting {
        println!(
            "{}",
            Style::new()
                .yellow()
                .apply_to("Restart the computer to finish the installation.")
        );
    }
}
