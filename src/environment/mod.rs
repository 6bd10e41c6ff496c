//! Local environment detection
//!
//! Reads the installed build, feature update and architecture and decides
//! whether the machine is one the updater may service. Nothing here touches
//! the network.

pub mod registry;

use std::process::{Command, Stdio};

use tracing::debug;

use crate::domain::{Architecture, BuildVersion, EditionTag, FeatureUpdate};
use crate::error::{Result, environment};

pub use registry::{RegistryValues, parse_reg_query};

/// First Windows 11 kernel build
const WINDOWS_11_MIN_MAJOR: u32 = 22000;

/// What the probe found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEnvironment {
    pub version: BuildVersion,
    /// Edition tag, when the feature update and architecture are known
    pub edition: Option<EditionTag>,
    /// Why the machine cannot be serviced, if it cannot
    pub unsupported_reason: Option<String>,
    pub product_name: Option<String>,
}

impl LocalEnvironment {
    /// A supported machine with the given build and edition
    pub fn supported(version: BuildVersion, feature: FeatureUpdate, arch: Architecture) -> Self {
        Self {
            version,
            edition: Some(EditionTag { feature, arch }),
            unsupported_reason: None,
            product_name: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.unsupported_reason.is_none() && self.edition.is_some()
    }

    /// Edition tag of a supported machine; `UnsupportedEnvironment` otherwise
    pub fn require_supported(&self) -> Result<EditionTag> {
        if let Some(reason) = &self.unsupported_reason {
            return Err(environment::unsupported(reason.clone()));
        }
        self.edition
            .ok_or_else(|| environment::unsupported("edition could not be determined"))
    }
}

/// Source of the local environment description
pub trait EnvironmentProbe {
    fn probe(&self) -> Result<LocalEnvironment>;
}

/// Probe backed by the Windows registry
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryProbe;

impl EnvironmentProbe for RegistryProbe {
    fn probe(&self) -> Result<LocalEnvironment> {
        let values = registry::query_current_version()?;
        classify(&values)
    }
}

/// Probe returning a fixed description
#[derive(Debug, Clone)]
pub struct StaticProbe(pub LocalEnvironment);

impl EnvironmentProbe for StaticProbe {
    fn probe(&self) -> Result<LocalEnvironment> {
        Ok(self.0.clone())
    }
}

/// Turn raw `CurrentVersion` values into a [`LocalEnvironment`].
///
/// Missing or malformed version values are a read error; a readable but
/// unsupported system yields `unsupported_reason`.
pub fn classify(values: &RegistryValues) -> Result<LocalEnvironment> {
    let build_lab = values
        .get("BuildLab")
        .ok_or_else(|| environment::read_failed("BuildLab value is missing"))?;
    let major: u32 = build_lab
        .split('.')
        .next()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| environment::read_failed(format!("BuildLab '{build_lab}' has no build number")))?;
    let minor = values
        .get_dword("UBR")
        .ok_or_else(|| environment::read_failed("UBR value is missing or malformed"))?;
    let version = BuildVersion::new(major, minor);

    let product_name = values.get("ProductName").map(ToString::to_string);
    let unsupported = |reason: String| LocalEnvironment {
        version,
        edition: None,
        unsupported_reason: Some(reason),
        product_name: product_name.clone(),
    };

    let installation_type = values.get("InstallationType").unwrap_or_default();
    let edition_id = values.get("EditionID").unwrap_or_default();
    if !installation_type.eq_ignore_ascii_case("Client") || edition_id.contains("Server") {
        return Ok(unsupported(format!(
            "installation type '{installation_type}' ({edition_id}) is not a Windows client"
        )));
    }

    if major < WINDOWS_11_MIN_MAJOR {
        return Ok(unsupported(format!("build {version} is not Windows 11")));
    }

    let build_lab_ex = values.get("BuildLabEx").unwrap_or_default().to_ascii_lowercase();
    let arch = if build_lab_ex.contains("amd64fre") {
        Architecture::Amd64
    } else if build_lab_ex.contains("arm64fre") {
        Architecture::Arm64
    } else {
        return Ok(unsupported(format!(
            "architecture of '{build_lab_ex}' is not amd64 or arm64"
        )));
    };

    let display_version = values.get("DisplayVersion").unwrap_or_default();
    let Ok(feature) = display_version.parse::<FeatureUpdate>() else {
        return Ok(unsupported(format!(
            "feature update '{display_version}' is not supported"
        )));
    };

    debug!(%version, %feature, %arch, "classified local environment");
    Ok(LocalEnvironment {
        version,
        edition: Some(EditionTag { feature, arch }),
        unsupported_reason: None,
        product_name,
    })
}

/// Whether the process runs with administrator rights.
///
/// `net session` only succeeds for elevated processes.
pub fn is_elevated() -> bool {
    if !cfg!(windows) {
        return false;
    }

    Command::new("net")
        .arg("session")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
