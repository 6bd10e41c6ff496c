//! Artifact descriptors
//!
//! An artifact is one package the engine can apply. Each carries where to get
//! it, the checksum it must match and where it lives in the local cache.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use super::edition::FeatureUpdate;
use crate::hash::Checksum;

/// Kind of servicing package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Servicing Stack Update
    Ssu,
    /// Cumulative Update
    Cu,
    /// .NET Framework update
    Ndp,
    /// Enablement Package
    Ep,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Ssu => "SSU",
            ArtifactKind::Cu => "CU",
            ArtifactKind::Ndp => "NDP",
            ArtifactKind::Ep => "EP",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Packaging of a cumulative update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuFormat {
    /// Compact image (`.esd`) converted from the official update
    CompactImage,
    /// Microsoft Update Standalone package, bundles its own servicing stack
    Msu,
}

/// Per-kind details
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactDetail {
    Plain,
    CumulativeUpdate { format: CuFormat },
    Enablement { target: FeatureUpdate },
}

/// One downloadable, installable package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub kind: ArtifactKind,
    pub detail: ArtifactDetail,
    /// File name as published
    pub file_name: String,
    /// Absolute remote location
    pub remote_url: Url,
    /// Checksum published next to the artifact
    pub expected: Checksum,
    /// Where the artifact lives once downloaded
    pub cache_path: PathBuf,
}

impl ArtifactDescriptor {
    /// Target feature update of an Enablement Package
    pub fn enablement_target(&self) -> Option<FeatureUpdate> {
        match self.detail {
            ArtifactDetail::Enablement { target } => Some(target),
            _ => None,
        }
    }

    pub fn cu_format(&self) -> Option<CuFormat> {
        match self.detail {
            ArtifactDetail::CumulativeUpdate { format } => Some(format),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_name, self.kind)
    }
}
