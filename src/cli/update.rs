use clap::Parser;

use crate::config::ConfigOverrides;
use crate::domain::BuildVersion;

/// Arguments for an update run
#[derive(Parser, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Install exactly this build (e.g. 26100.6899)
    #[arg(long, short = 'b', value_name = "MAJOR.MINOR")]
    pub build: Option<BuildVersion>,

    /// Download and verify packages but do not install them
    #[arg(long)]
    pub dry_run: bool,

    /// Answer yes to every question
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Skip self-update and mirror tests, use the fallback server
    #[arg(long)]
    pub failsafe: bool,

    /// Do not check for a newer triquetra
    #[arg(long)]
    pub no_self_update: bool,

    /// Primary update server
    #[arg(long, value_name = "URL", env = "TRIQUETRA_BASE_URL")]
    pub base_url: Option<String>,

    /// Additional mirror (repeatable)
    #[arg(long, value_name = "URL")]
    pub mirror: Vec<String>,

    /// HTTP Basic Auth username
    #[arg(long, env = "TRIQUETRA_USER")]
    pub user: Option<String>,

    /// HTTP Basic Auth password
    #[arg(long, env = "TRIQUETRA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl UpdateArgs {
    /// Command-line layer of the engine configuration
    pub fn overrides(
        &self,
        workdir: Option<std::path::PathBuf>,
        config_file: Option<std::path::PathBuf>,
    ) -> ConfigOverrides {
        ConfigOverrides {
            workdir,
            config_file,
            primary: self.base_url.clone(),
            mirrors: self.mirror.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            build: self.build,
            dry_run: self.dry_run,
            failsafe: self.failsafe,
            no_self_update: self.no_self_update,
        }
    }
}
