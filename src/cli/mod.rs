//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - update: update run arguments (the default command)
//! - cache: Cache command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub mod cache;
pub mod completions;
pub mod update;

pub use cache::{CacheArgs, CacheSubcommand, ClearCacheArgs};
pub use completions::CompletionsArgs;
pub use update::UpdateArgs;

/// Triquetra - Windows 11 updater
///
/// Installs servicing stack, cumulative, .NET and Enablement Package updates
/// from an h5ai-hosted repository.
#[derive(Parser, Debug)]
#[command(
    name = "triquetra",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Windows 11 updater using h5ai-hosted servicing packages",
    long_about = "Triquetra installs Windows 11 servicing packages (servicing stack, cumulative \
                  update, .NET Framework update and Enablement Package) from a remote repository, \
                  verifying every download against its published checksum.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  triquetra                          \x1b[90m# Check for and install the latest build\x1b[0m\n   \
                  triquetra --build 26100.6899       \x1b[90m# Install a specific build\x1b[0m\n   \
                  triquetra --dry-run                \x1b[90m# Download and verify only\x1b[0m\n   \
                  triquetra --failsafe               \x1b[90m# Use the fallback server\x1b[0m\n   \
                  triquetra cache list               \x1b[90m# List downloaded builds\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Working directory for downloads, logs and configuration
    #[arg(long, global = true, env = "TRIQUETRA_HOME")]
    pub workdir: Option<PathBuf>,

    /// Configuration file (defaults to <workdir>/triquetra.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (-vv for trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub update: UpdateArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show, list or clear downloaded packages
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BuildVersion;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_is_update() {
        let cli = Cli::try_parse_from(["triquetra", "--build", "26100.6899", "--dry-run", "-vv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.update.build, Some(BuildVersion::new(26100, 6899)));
        assert!(cli.update.dry_run);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_invalid_build_is_rejected() {
        assert!(Cli::try_parse_from(["triquetra", "--build", "latest"]).is_err());
    }

    #[test]
    fn test_repeated_mirrors() {
        let cli = Cli::try_parse_from([
            "triquetra",
            "--mirror",
            "https://a.test/",
            "--mirror",
            "https://b.test/",
        ])
        .unwrap();
        assert_eq!(cli.update.mirror.len(), 2);
    }

    #[test]
    fn test_cache_subcommand() {
        let cli = Cli::try_parse_from(["triquetra", "cache", "clear", "--only", "EP"]).unwrap();
        match cli.command {
            Some(Commands::Cache(CacheArgs {
                command: Some(CacheSubcommand::Clear(args)),
            })) => assert_eq!(args.only.as_deref(), Some("EP")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
