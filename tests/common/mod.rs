//! Common test utilities for Triquetra integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assert_cmd::Command;
use tempfile::TempDir;
use url::Url;

use triquetra::config::EngineConfig;
use triquetra::domain::{Architecture, BuildVersion, FeatureUpdate};
use triquetra::environment::{LocalEnvironment, StaticProbe};
use triquetra::error::Result;
use triquetra::hash::{ChecksumAlgorithm, hash_reader};
use triquetra::installer::PackageInstaller;
use triquetra::operations::{UpdateEngine, UpdateOutcome};
use triquetra::operations::update::RunSummary;
use triquetra::prompt::DecisionProvider;
use triquetra::remote::{MemoryTransport, Transport};

pub const PRIMARY: &str = "http://primary.test/";
pub const MIRROR: &str = "http://mirror.test/";

/// Environment variables a developer shell might set that would leak into tests
const TRIQUETRA_ENV: [&str; 4] = [
    "TRIQUETRA_HOME",
    "TRIQUETRA_BASE_URL",
    "TRIQUETRA_USER",
    "TRIQUETRA_PASSWORD",
];

/// The triquetra binary, isolated from the developer's environment
#[allow(deprecated)]
pub fn triquetra_cmd() -> Command {
    let mut cmd = Command::cargo_bin("triquetra").unwrap();
    for var in TRIQUETRA_ENV {
        cmd.env_remove(var);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Hex BLAKE3 digest of `bytes`
pub fn digest(bytes: &[u8]) -> String {
    hash_reader(bytes, ChecksumAlgorithm::Blake3)
        .unwrap()
        .digest()
        .to_string()
}

pub fn ssu_name(build: &str) -> String {
    format!("ssu-{build}-x64.cab")
}

pub fn cu_name(build: &str) -> String {
    format!("windows11.0-kb{}-x64.esd", build.replace('.', ""))
}

pub fn ndp_name(build: &str) -> String {
    format!("windows11.0-kb{}-ndp481-x64.cab", build.replace('.', ""))
}

pub const EP_24H2: &str = "Windows11.0-KB5054156-x64.cab";

/// An update server kept in memory
pub struct TestServer {
    pub transport: Arc<MemoryTransport>,
}

impl TestServer {
    /// Primary endpoint with its speed test file
    pub fn new() -> Self {
        let transport = Arc::new(MemoryTransport::new());
        transport.insert(&format!("{PRIMARY}speed.test"), vec![0u8; 4096]);
        Self { transport }
    }

    pub fn url(path: &str) -> String {
        format!("{PRIMARY}{path}")
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Publish a file and its `.blake3` sidecar
    pub fn publish(&self, path: &str, content: &[u8]) {
        self.transport.insert(&Self::url(path), content.to_vec());
        self.transport.insert(
            &format!("{}.blake3", Self::url(path)),
            format!("{}  {path}\n", digest(content)),
        );
    }

    /// Publish a file whose sidecar does not match its content
    pub fn publish_corrupt(&self, path: &str) {
        self.transport.insert(&Self::url(path), b"truncated".to_vec());
        self.transport.insert(
            &format!("{}.blake3", Self::url(path)),
            digest(b"the real package"),
        );
    }

    /// Publish SSU, CU and NDP for `build` on amd64
    pub fn publish_build(&self, build: &str) {
        for name in [ssu_name(build), cu_name(build), ndp_name(build)] {
            let path = format!("{build}/amd64/{name}");
            self.publish(&path, format!("{path} payload").as_bytes());
        }
    }

    /// Mark a build folder as still being uploaded
    pub fn mark_uploading(&self, build: &str) {
        self.transport
            .insert(&Self::url(&format!("{build}/non_complete")), Vec::new());
    }

    pub fn publish_enablement(&self) {
        let path = format!("EP/amd64/{EP_24H2}");
        self.publish(&path, b"enablement package");
    }

    pub fn get_count(&self, path: &str) -> usize {
        self.transport.get_count(&Self::url(path))
    }
}

/// Engine configuration pointing at the in-memory server
pub fn config(workdir: &TempDir) -> EngineConfig {
    let mut config = EngineConfig::with_workdir(workdir.path().to_path_buf()).unwrap();
    config.primary = Url::parse(PRIMARY).unwrap();
    config.mirrors = Vec::new();
    config.credentials = None;
    config.probe.timeout = Duration::from_secs(2);
    config.self_update.enabled = false;
    config
}

/// A supported amd64 machine
pub fn machine(major: u32, minor: u32, feature: FeatureUpdate) -> StaticProbe {
    StaticProbe(LocalEnvironment::supported(
        BuildVersion::new(major, minor),
        feature,
        Architecture::Amd64,
    ))
}

/// Cached location of a build file
pub fn cached(config: &EngineConfig, build: &str, name: &str) -> PathBuf {
    config.cache_dir().join(build).join("amd64").join(name)
}

/// Run the engine once
pub fn run(
    config: &EngineConfig,
    server: &TestServer,
    probe: &StaticProbe,
    installer: &dyn PackageInstaller,
    decisions: &dyn DecisionProvider,
) -> Result<UpdateOutcome> {
    UpdateEngine::new(config, server.transport(), probe, installer, decisions).run()
}

/// Summary of a run that must have finished
pub fn finished(outcome: UpdateOutcome) -> Box<RunSummary> {
    match outcome {
        UpdateOutcome::Finished(summary) => summary,
        other => panic!("expected a finished run, got {other:?}"),
    }
}
