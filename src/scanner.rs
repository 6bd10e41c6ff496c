//! Candidate discovery on the selected endpoint
//!
//! Build folders are listed from the endpoint's index page. A folder holding
//! the upload-in-progress sentinel is never offered. Once a candidate is
//! chosen its `<build>/<arch>/` folder is listed and the files are
//! classified into SSU, CU and NDP, each paired with the checksum published
//! in its sidecar file.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::cache::{ENABLEMENT_DIR, artifact_path, enablement_path};
use crate::config::EnablementPackageConfig;
use crate::domain::{
    Architecture, ArtifactDescriptor, ArtifactDetail, ArtifactKind, ArtifactManifest,
    BuildVersion, CuFormat, RemoteCandidate,
};
use crate::error::{Result, TriquetraError};
use crate::hash::{Checksum, ChecksumAlgorithm};
use crate::remote::{self, ListingEntry, Transport};

static SSU_FILE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)\bssu.*\.cab$").unwrap()
});

static CU_IMAGE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)\b(?:windows|kb).*\.esd$").unwrap()
});

static CU_MSU_FILE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)\.msu$").unwrap()
});

static NDP_FILE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)NDP.*\.cab$").unwrap()
});

/// Build folders found on the endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    /// Fully uploaded builds, ascending
    pub complete: Vec<RemoteCandidate>,
    /// Builds still carrying the upload sentinel
    pub uploading: Vec<RemoteCandidate>,
}

impl CandidateSet {
    pub fn latest(&self) -> Option<&RemoteCandidate> {
        self.complete.last()
    }

    pub fn find(&self, version: BuildVersion) -> Option<&RemoteCandidate> {
        self.complete.iter().find(|c| c.version == version)
    }

    fn is_uploading(&self, version: BuildVersion) -> bool {
        self.uploading.iter().any(|c| c.version == version)
    }

    fn available(&self) -> String {
        if self.complete.is_empty() {
            return "none".to_string();
        }
        self.complete
            .iter()
            .map(|c| c.version.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lists candidates and resolves their artifacts on one endpoint
pub struct CandidateScanner<'a> {
    transport: &'a dyn Transport,
    endpoint: &'a Url,
    marker: &'a str,
    cache_root: &'a Path,
}

impl<'a> CandidateScanner<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        endpoint: &'a Url,
        marker: &'a str,
        cache_root: &'a Path,
    ) -> Self {
        Self {
            transport,
            endpoint,
            marker,
            cache_root,
        }
    }

    /// List build folders and sort them into complete and uploading
    pub fn scan(&self, arch: Architecture) -> Result<CandidateSet> {
        let mut set = CandidateSet::default();

        for entry in self.transport.list(self.endpoint)? {
            if !entry.is_dir || entry.name == ENABLEMENT_DIR {
                continue;
            }
            let Some(version) = BuildVersion::from_folder_name(&entry.name) else {
                debug!(folder = %entry.name, "skipping folder without a build number");
                continue;
            };

            let marker_url = remote::join(&entry.url, self.marker)?;
            let complete = !self.transport.exists(&marker_url)?;
            let candidate = RemoteCandidate {
                version,
                arch,
                folder: entry.url,
                complete,
            };

            if complete {
                set.complete.push(candidate);
            } else {
                info!(build = %version, "skipping build that is still being uploaded");
                set.uploading.push(candidate);
            }
        }

        set.complete.sort_by_key(|c| c.version);
        set.complete.dedup_by_key(|c| c.version);
        set.uploading.sort_by_key(|c| c.version);
        debug!(
            complete = set.complete.len(),
            uploading = set.uploading.len(),
            "scanned build folders"
        );
        Ok(set)
    }

    /// Resolve the artifacts published for a candidate
    pub fn manifest(&self, candidate: &RemoteCandidate) -> Result<ArtifactManifest> {
        let arch_dir = remote::join(&candidate.folder, &format!("{}/", candidate.arch))?;
        let entries: Vec<ListingEntry> = self
            .transport
            .list(&arch_dir)?
            .into_iter()
            .filter(|e| !e.is_dir)
            .collect();
        let incomplete = |missing: String| TriquetraError::IncompleteCandidate {
            build: candidate.version.to_string(),
            arch: candidate.arch.to_string(),
            missing,
        };

        let packages: Vec<&ListingEntry> = entries.iter().filter(|e| !is_sidecar(&e.name)).collect();
        let ndp = packages.iter().copied().find(|e| NDP_FILE.is_match(&e.name));
        let msu = packages.iter().copied().find(|e| CU_MSU_FILE.is_match(&e.name));
        let image = packages
            .iter()
            .copied()
            .find(|e| CU_IMAGE_FILE.is_match(&e.name) && !NDP_FILE.is_match(&e.name));
        let ssu = packages
            .iter()
            .copied()
            .find(|e| SSU_FILE.is_match(&e.name) && !NDP_FILE.is_match(&e.name));

        let describe = |entry: &ListingEntry, kind: ArtifactKind, detail: ArtifactDetail| {
            let expected = self
                .sidecar_checksum(&entries, entry)?
                .ok_or_else(|| incomplete(format!("a checksum for {}", entry.name)))?;
            Ok::<_, TriquetraError>(ArtifactDescriptor {
                kind,
                detail,
                file_name: entry.name.clone(),
                remote_url: entry.url.clone(),
                expected,
                cache_path: artifact_path(
                    self.cache_root,
                    candidate.version,
                    candidate.arch,
                    &entry.name,
                ),
            })
        };

        let (ssu, cu) = if let Some(msu) = msu {
            let cu = describe(
                msu,
                ArtifactKind::Cu,
                ArtifactDetail::CumulativeUpdate {
                    format: CuFormat::Msu,
                },
            )?;
            (None, cu)
        } else {
            let image = image.ok_or_else(|| incomplete("a cumulative update".to_string()))?;
            let ssu = ssu.ok_or_else(|| incomplete("a servicing stack update".to_string()))?;
            let ssu = describe(ssu, ArtifactKind::Ssu, ArtifactDetail::Plain)?;
            let cu = describe(
                image,
                ArtifactKind::Cu,
                ArtifactDetail::CumulativeUpdate {
                    format: CuFormat::CompactImage,
                },
            )?;
            (Some(ssu), cu)
        };
        let ndp = ndp
            .map(|e| describe(e, ArtifactKind::Ndp, ArtifactDetail::Plain))
            .transpose()?;

        let manifest = ArtifactManifest {
            version: candidate.version,
            arch: candidate.arch,
            ssu,
            cu,
            ndp,
        };
        for artifact in manifest.artifacts() {
            debug!(build = %candidate.version, artifact = %artifact, "resolved artifact");
        }
        Ok(manifest)
    }

    /// Resolve the Enablement Package published for `arch`
    pub fn enablement(
        &self,
        arch: Architecture,
        package: &EnablementPackageConfig,
    ) -> Result<ArtifactDescriptor> {
        let missing = |what: String| TriquetraError::IncompleteCandidate {
            build: ENABLEMENT_DIR.to_string(),
            arch: arch.to_string(),
            missing: what,
        };
        let target = package
            .from
            .enablement_target()
            .ok_or_else(|| missing(format!("a target for {}", package.from)))?;

        let dir = remote::join(self.endpoint, &format!("{ENABLEMENT_DIR}/{arch}/"))?;
        let entries = self.transport.list(&dir)?;
        let file_name = package.file_name(arch);
        let entry = entries
            .iter()
            .find(|e| !e.is_dir && e.name.eq_ignore_ascii_case(file_name))
            .ok_or_else(|| missing(file_name.to_string()))?;
        let expected = self
            .sidecar_checksum(&entries, entry)?
            .ok_or_else(|| missing(format!("a checksum for {file_name}")))?;

        Ok(ArtifactDescriptor {
            kind: ArtifactKind::Ep,
            detail: ArtifactDetail::Enablement { target },
            file_name: entry.name.clone(),
            remote_url: entry.url.clone(),
            expected,
            cache_path: enablement_path(self.cache_root, arch, &entry.name),
        })
    }

    /// Checksum from `<file>.blake3` (preferred) or `<file>.sha256`
    fn sidecar_checksum(
        &self,
        entries: &[ListingEntry],
        entry: &ListingEntry,
    ) -> Result<Option<Checksum>> {
        for algorithm in ChecksumAlgorithm::ALL {
            let sidecar_name = format!("{}{}", entry.name, algorithm.sidecar_suffix());
            if let Some(sidecar) = entries.iter().find(|e| e.name == sidecar_name) {
                let text = self.transport.get_text(&sidecar.url)?;
                return Checksum::from_sidecar(&text, algorithm).map(Some);
            }
        }
        Ok(None)
    }
}

/// Pick the candidate to install.
///
/// With an override exactly that build is used; otherwise the highest
/// complete build.
pub fn select_candidate(
    set: &CandidateSet,
    build_override: Option<BuildVersion>,
    endpoint: &Url,
) -> Result<RemoteCandidate> {
    if let Some(build) = build_override {
        if let Some(candidate) = set.find(build) {
            return Ok(candidate.clone());
        }
        if set.is_uploading(build) {
            return Err(TriquetraError::CandidateUploading {
                build: build.to_string(),
            });
        }
        return Err(TriquetraError::CandidateNotFound {
            build: build.to_string(),
            available: set.available(),
        });
    }

    set.latest()
        .cloned()
        .ok_or_else(|| TriquetraError::NoCandidatesAvailable {
            endpoint: endpoint.to_string(),
        })
}

fn is_sidecar(name: &str) -> bool {
    ChecksumAlgorithm::ALL
        .iter()
        .any(|a| name.to_ascii_lowercase().ends_with(a.sidecar_suffix()))
}
