//! Remote build candidates

use std::fmt;

use url::Url;

use super::artifact::ArtifactDescriptor;
use super::edition::Architecture;
use super::version::BuildVersion;

/// A build folder discovered on the update server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCandidate {
    pub version: BuildVersion,
    pub arch: Architecture,
    /// Build folder on the server, as listed
    pub folder: Url,
    /// `false` while the folder still carries the upload-in-progress marker
    pub complete: bool,
}

impl fmt::Display for RemoteCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.arch)
    }
}

/// Artifacts published for one candidate and architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactManifest {
    pub version: BuildVersion,
    pub arch: Architecture,
    /// Absent when the CU is an MSU, which carries its own servicing stack
    pub ssu: Option<ArtifactDescriptor>,
    pub cu: ArtifactDescriptor,
    pub ndp: Option<ArtifactDescriptor>,
}

impl ArtifactManifest {
    /// Artifacts in installation order
    pub fn artifacts(&self) -> Vec<&ArtifactDescriptor> {
        let mut out = Vec::with_capacity(3);
        if let Some(ssu) = &self.ssu {
            out.push(ssu);
        }
        out.push(&self.cu);
        if let Some(ndp) = &self.ndp {
            out.push(ndp);
        }
        out
    }
}
