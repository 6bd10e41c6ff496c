//! Engine configuration
//!
//! [`EngineConfig`] is the explicit context handed to every component for a
//! run. It is resolved once at startup, lowest to highest precedence:
//! built-in defaults, the optional `triquetra.yaml`, then command-line flags
//! (which clap also fills from `TRIQUETRA_*` environment variables).

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::domain::{Architecture, BuildVersion, FeatureUpdate};
use crate::error::{Result, TriquetraError, config};

pub use file::{CONFIG_FILE, ConfigFile, EnablementPackageConfig};

/// Default primary update server
pub const DEFAULT_PRIMARY: &str = "https://updates.smce.pl/";

/// Default mirror
pub const DEFAULT_MIRROR: &str = "https://updates2.smce.pl/";

/// Server used directly with `--failsafe`
pub const DEFAULT_FAILSAFE: &str = "http://109.196.126.21:8042/";

/// Default basic-auth user and password
pub const DEFAULT_CREDENTIAL: &str = "w11updater";

/// Servicing level every machine below it must install first
pub const BASELINE_BUILD: BuildVersion = BuildVersion::new(26100, 1742);

/// Sentinel file present in a build folder while it is still being uploaded
pub const INCOMPLETE_MARKER: &str = "non_complete";

/// Working directory name under `%ProgramData%` (or the local data dir)
const WORKDIR_NAME: &str = "triquetra";

/// Environment variable overriding the working directory
pub const HOME_ENV: &str = "TRIQUETRA_HOME";

const CACHE_DIR: &str = "cache";
const STAGING_DIR: &str = "staging";
const LOG_FILE: &str = "triquetra.log";

/// HTTP basic-auth credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Mirror speed test settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Per-endpoint deadline
    pub timeout: Duration,
    /// Upper bound on bytes read from the test file
    pub max_bytes: u64,
    /// Test file name relative to each endpoint
    pub test_file: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_bytes: 1024 * 1024,
            test_file: "speed.test".to_string(),
        }
    }
}

/// Self-update settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfUpdateSettings {
    pub enabled: bool,
    /// Updater binary name relative to the primary endpoint
    pub binary_name: String,
}

impl Default for SelfUpdateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            binary_name: "triquetra.exe".to_string(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workdir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub primary: Option<String>,
    pub mirrors: Vec<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub build: Option<BuildVersion>,
    pub dry_run: bool,
    pub failsafe: bool,
    pub no_self_update: bool,
}

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workdir: PathBuf,
    pub primary: Url,
    pub mirrors: Vec<Url>,
    pub failsafe_endpoint: Url,
    pub failsafe: bool,
    pub credentials: Option<Credentials>,
    pub probe: ProbeSettings,
    /// Connect timeout for regular requests
    pub request_timeout: Duration,
    pub build_override: Option<BuildVersion>,
    pub dry_run: bool,
    pub self_update: SelfUpdateSettings,
    pub baseline: BuildVersion,
    pub enablement: Vec<EnablementPackageConfig>,
    pub incomplete_marker: String,
}

impl EngineConfig {
    /// Built-in defaults rooted at `workdir`
    pub fn with_workdir(workdir: PathBuf) -> Result<Self> {
        Ok(Self {
            workdir,
            primary: parse_endpoint(DEFAULT_PRIMARY)?,
            mirrors: vec![parse_endpoint(DEFAULT_MIRROR)?],
            failsafe_endpoint: parse_endpoint(DEFAULT_FAILSAFE)?,
            failsafe: false,
            credentials: Some(Credentials {
                user: DEFAULT_CREDENTIAL.to_string(),
                password: DEFAULT_CREDENTIAL.to_string(),
            }),
            probe: ProbeSettings::default(),
            request_timeout: Duration::from_secs(30),
            build_override: None,
            dry_run: false,
            self_update: SelfUpdateSettings::default(),
            baseline: BASELINE_BUILD,
            enablement: default_enablement_packages(),
            incomplete_marker: INCOMPLETE_MARKER.to_string(),
        })
    }

    /// Resolve the configuration for a run from defaults, file and overrides
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let workdir = match overrides.workdir.clone() {
            Some(dir) => dir,
            None => default_workdir()?,
        };

        let file = match &overrides.config_file {
            Some(path) if !path.exists() => {
                return Err(crate::error::fs::not_found(path));
            }
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load(&workdir.join(CONFIG_FILE))?,
        };

        let mut config = Self::with_workdir(workdir)?;
        config.apply_file(file)?;
        config.apply_overrides(overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(primary) = file.primary {
            self.primary = parse_endpoint(&primary)?;
        }
        if !file.mirrors.is_empty() {
            self.mirrors = file
                .mirrors
                .iter()
                .map(|m| parse_endpoint(m))
                .collect::<Result<_>>()?;
        }
        if let Some(failsafe) = file.failsafe_endpoint {
            self.failsafe_endpoint = parse_endpoint(&failsafe)?;
        }
        self.merge_credentials(file.user, file.password);
        if let Some(secs) = file.probe_timeout_secs {
            self.probe.timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = file.probe_max_bytes {
            self.probe.max_bytes = bytes;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(baseline) = file.baseline {
            self.baseline = baseline;
        }
        if let Some(binary) = file.updater_binary {
            self.self_update.binary_name = binary;
        }
        for package in file.enablement {
            self.enablement.retain(|p| p.from != package.from);
            self.enablement.push(package);
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(primary) = overrides.primary {
            self.primary = parse_endpoint(&primary)?;
        }
        if !overrides.mirrors.is_empty() {
            self.mirrors = overrides
                .mirrors
                .iter()
                .map(|m| parse_endpoint(m))
                .collect::<Result<_>>()?;
        }
        self.merge_credentials(overrides.user, overrides.password);
        self.build_override = overrides.build;
        self.dry_run = overrides.dry_run;
        self.failsafe = overrides.failsafe;
        if overrides.no_self_update || overrides.failsafe {
            self.self_update.enabled = false;
        }
        Ok(())
    }

    fn merge_credentials(&mut self, user: Option<String>, password: Option<String>) {
        if user.is_none() && password.is_none() {
            return;
        }
        let current = self.credentials.take().unwrap_or(Credentials {
            user: String::new(),
            password: String::new(),
        });
        let merged = Credentials {
            user: user.unwrap_or(current.user),
            password: password.unwrap_or(current.password),
        };
        self.credentials = if merged.user.is_empty() {
            None
        } else {
            Some(merged)
        };
    }

    fn validate(&self) -> Result<()> {
        if self.probe.timeout.is_zero() {
            return Err(config::invalid("probe timeout must be greater than zero"));
        }
        if self.probe.max_bytes == 0 {
            return Err(config::invalid("probe byte budget must be greater than zero"));
        }
        if self.enablement.iter().any(|p| p.from.enablement_target().is_none()) {
            return Err(config::invalid(
                "enablement packages can only be declared for 22H2 and 24H2",
            ));
        }
        Ok(())
    }

    /// Endpoints in declared priority order (primary first)
    pub fn endpoints(&self) -> Vec<Url> {
        let mut endpoints = vec![self.primary.clone()];
        for mirror in &self.mirrors {
            if !endpoints.contains(mirror) {
                endpoints.push(mirror.clone());
            }
        }
        endpoints
    }

    /// Enablement package declared for a feature update, if any
    pub fn enablement_for(&self, feature: FeatureUpdate) -> Option<&EnablementPackageConfig> {
        self.enablement.iter().find(|p| p.from == feature)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.workdir.join(CACHE_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.workdir.join(STAGING_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.workdir.join(LOG_FILE)
    }
}

impl EnablementPackageConfig {
    /// Package file name for an architecture
    pub fn file_name(&self, arch: Architecture) -> &str {
        match arch {
            Architecture::Amd64 => &self.amd64,
            Architecture::Arm64 => &self.arm64,
        }
    }
}

/// The two Enablement Packages published on the update server
pub fn default_enablement_packages() -> Vec<EnablementPackageConfig> {
    vec![
        EnablementPackageConfig {
            from: FeatureUpdate::V22H2,
            min_build: BuildVersion::new(22621, 2506),
            amd64: "Windows11.0-KB5027397-x64.cab".to_string(),
            arm64: "Windows11.0-KB5027397-arm64.cab".to_string(),
        },
        EnablementPackageConfig {
            from: FeatureUpdate::V24H2,
            min_build: BuildVersion::new(26100, 5074),
            amd64: "Windows11.0-KB5054156-x64.cab".to_string(),
            arm64: "Windows11.0-KB5054156-arm64.cab".to_string(),
        },
    ]
}

/// Parse an endpoint URL, normalizing it to end with `/` so that relative
/// joins stay inside it
pub fn parse_endpoint(value: &str) -> Result<Url> {
    let trimmed = value.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&normalized)
        .map_err(|e| config::invalid(format!("invalid endpoint URL '{trimmed}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(config::invalid(format!(
            "endpoint '{trimmed}' uses unsupported scheme '{other}'"
        ))),
    }
}

/// Get the default working directory
///
/// `%ProgramData%\triquetra` on Windows, the platform's local data directory
/// elsewhere. Can be overridden with the `TRIQUETRA_HOME` environment variable.
pub fn default_workdir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }

    if cfg!(windows) {
        if let Some(program_data) = std::env::var_os("ProgramData") {
            return Ok(PathBuf::from(program_data).join(WORKDIR_NAME));
        }
    }

    let base = dirs::data_local_dir().ok_or_else(|| TriquetraError::ConfigInvalid {
        message: "Could not determine working directory".to_string(),
    })?;
    Ok(base.join(WORKDIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn overrides_in(temp: &TempDir) -> ConfigOverrides {
        ConfigOverrides {
            workdir: Some(temp.path().to_path_buf()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn test_defaults() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::resolve(overrides_in(&temp)).unwrap();

        assert_eq!(config.primary.as_str(), DEFAULT_PRIMARY);
        assert_eq!(config.endpoints().len(), 2);
        assert_eq!(config.baseline, BuildVersion::new(26100, 1742));
        assert_eq!(config.probe.max_bytes, 1024 * 1024);
        assert_eq!(
            config.credentials.as_ref().map(|c| c.user.as_str()),
            Some(DEFAULT_CREDENTIAL)
        );
        assert!(config.self_update.enabled);
        assert_eq!(config.cache_dir(), temp.path().join("cache"));
        assert_eq!(config.log_path(), temp.path().join("triquetra.log"));
    }

    #[test]
    fn test_file_then_flags_precedence() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "primary: https://file.example/\nuser: fileuser\npassword: filepass\nprobe_timeout_secs: 2\n",
        )
        .unwrap();

        let mut overrides = overrides_in(&temp);
        overrides.user = Some("cliuser".to_string());
        let config = EngineConfig::resolve(overrides).unwrap();

        assert_eq!(config.primary.as_str(), "https://file.example/");
        assert_eq!(config.probe.timeout, Duration::from_secs(2));
        let creds = config.credentials.unwrap();
        assert_eq!(creds.user, "cliuser");
        assert_eq!(creds.password, "filepass");
    }

    #[test]
    fn test_flags_replace_mirrors() {
        let temp = TempDir::new().unwrap();
        let mut overrides = overrides_in(&temp);
        overrides.primary = Some("http://127.0.0.1:9000".to_string());
        overrides.mirrors = vec!["http://127.0.0.1:9001".to_string()];
        let config = EngineConfig::resolve(overrides).unwrap();

        let endpoints: Vec<String> = config.endpoints().iter().map(ToString::to_string).collect();
        assert_eq!(
            endpoints,
            vec!["http://127.0.0.1:9000/", "http://127.0.0.1:9001/"]
        );
    }

    #[test]
    fn test_failsafe_disables_self_update() {
        let temp = TempDir::new().unwrap();
        let mut overrides = overrides_in(&temp);
        overrides.failsafe = true;
        let config = EngineConfig::resolve(overrides).unwrap();
        assert!(config.failsafe);
        assert!(!config.self_update.enabled);
    }

    #[test]
    fn test_explicit_config_file_must_exist() {
        let temp = TempDir::new().unwrap();
        let mut overrides = overrides_in(&temp);
        overrides.config_file = Some(temp.path().join("missing.yaml"));
        assert!(matches!(
            EngineConfig::resolve(overrides),
            Err(TriquetraError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_file_enablement_replaces_default_for_same_feature() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "enablement:\n  - from: 24H2\n    min_build: \"26100.6000\"\n    amd64: a.cab\n    arm64: b.cab\n",
        )
        .unwrap();
        let config = EngineConfig::resolve(overrides_in(&temp)).unwrap();

        assert_eq!(config.enablement.len(), 2);
        let ep = config.enablement_for(FeatureUpdate::V24H2).unwrap();
        assert_eq!(ep.min_build, BuildVersion::new(26100, 6000));
        assert_eq!(ep.file_name(Architecture::Arm64), "b.cab");
    }

    #[test]
    fn test_invalid_enablement_source_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "enablement:\n  - from: 25H2\n    min_build: \"26200.1\"\n    amd64: a.cab\n    arm64: b.cab\n",
        )
        .unwrap();
        assert!(matches!(
            EngineConfig::resolve(overrides_in(&temp)),
            Err(TriquetraError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            parse_endpoint("https://updates.example").unwrap().as_str(),
            "https://updates.example/"
        );
        assert!(parse_endpoint("ftp://updates.example/").is_err());
        assert!(parse_endpoint("not a url").is_err());
    }

    #[test]
    fn test_zero_probe_timeout_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "probe_timeout_secs: 0\n").unwrap();
        assert!(EngineConfig::resolve(overrides_in(&temp)).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_default_workdir_from_env() {
        let temp = TempDir::new().unwrap();
        let original = std::env::var_os(HOME_ENV);
        unsafe {
            std::env::set_var(HOME_ENV, temp.path());
        }

        let workdir = default_workdir();

        unsafe {
            match original {
                Some(value) => std::env::set_var(HOME_ENV, value),
                None => std::env::remove_var(HOME_ENV),
            }
        }
        assert_eq!(workdir.unwrap(), temp.path());
    }
}
