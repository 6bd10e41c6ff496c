//! Error types and handling for Triquetra
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`environment`]: Local OS detection errors
//! - [`network`]: Endpoint, listing and transfer errors
//! - [`integrity`]: Checksum errors
//! - [`config`]: Configuration errors
//! - [`fs`]: File system errors
//! - [`cache`]: Cache errors

pub mod cache;
pub mod config;
pub mod environment;
pub mod fs;
pub mod integrity;
pub mod network;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Triquetra operations
#[derive(Error, Diagnostic, Debug)]
pub enum TriquetraError {
    // Environment errors
    #[error("Failed to read OS version information: {reason}")]
    #[diagnostic(
        code(triquetra::environment::read_failed),
        help("Triquetra reads HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion")
    )]
    EnvironmentRead { reason: String },

    #[error("This system is not supported: {reason}")]
    #[diagnostic(
        code(triquetra::environment::unsupported),
        help("Only Windows 11 Client (22H2, 23H2, 24H2, 25H2) on amd64 or arm64 is supported")
    )]
    UnsupportedEnvironment { reason: String },

    #[error("This program must be run as Administrator")]
    #[diagnostic(
        code(triquetra::environment::not_elevated),
        help("Right-click the executable and select 'Run as administrator'")
    )]
    NotElevated,

    // Network errors
    #[error("No update server is reachable (tried: {tried})")]
    #[diagnostic(
        code(triquetra::network::no_endpoint),
        help("Check your connection, or run with --failsafe to use the fallback server")
    )]
    NoEndpointAvailable { tried: String },

    #[error("Request to {url} failed: {reason}")]
    #[diagnostic(code(triquetra::network::http))]
    Http { url: String, reason: String },

    #[error("Failed to parse directory listing at {url}: {reason}")]
    #[diagnostic(code(triquetra::network::listing))]
    ListingParse { url: String, reason: String },

    // Candidate errors
    #[error("No completely uploaded builds found at {endpoint}")]
    #[diagnostic(
        code(triquetra::candidate::none_available),
        help("Builds that are still being uploaded are skipped; try again later")
    )]
    NoCandidatesAvailable { endpoint: String },

    #[error("Build {build} not found among available builds ({available})")]
    #[diagnostic(code(triquetra::candidate::not_found))]
    CandidateNotFound { build: String, available: String },

    #[error("Build {build} exists but is still being uploaded")]
    #[diagnostic(
        code(triquetra::candidate::incomplete_upload),
        help("Wait for the upload to finish or choose another build with --build")
    )]
    CandidateUploading { build: String },

    #[error("Required baseline build {baseline} not found on server")]
    #[diagnostic(
        code(triquetra::candidate::baseline_unavailable),
        help("Machines below the baseline must install it before any newer build")
    )]
    BaselineUnavailable { baseline: String },

    #[error("Build {build} ({arch}) is missing {missing}")]
    #[diagnostic(code(triquetra::candidate::incomplete))]
    IncompleteCandidate {
        build: String,
        arch: String,
        missing: String,
    },

    #[error("Invalid build version: {input}")]
    #[diagnostic(
        code(triquetra::candidate::invalid_version),
        help("Build versions look like 26100.1742")
    )]
    InvalidBuildVersion { input: String },

    // Integrity errors
    #[error("Failed to compute checksum of {path}: {reason}")]
    #[diagnostic(code(triquetra::integrity::compute_failed))]
    ChecksumCompute { path: String, reason: String },

    #[error("Invalid checksum '{value}': {reason}")]
    #[diagnostic(code(triquetra::integrity::invalid_checksum))]
    InvalidChecksum { value: String, reason: String },

    #[error("Downloaded {artifact} does not match its published checksum")]
    #[diagnostic(
        code(triquetra::integrity::download_mismatch),
        help("The corrupt file was discarded; run triquetra again to retry the download")
    )]
    DownloadIntegrity {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("Downloaded updater does not match its published checksum")]
    #[diagnostic(code(triquetra::integrity::self_update_mismatch))]
    IntegrityMismatch { expected: String, actual: String },

    // Install errors
    #[error("Installing {artifact} ({step}) failed: {reason}")]
    #[diagnostic(
        code(triquetra::install::step_failed),
        help("Downloaded files were kept; run triquetra again to resume without downloading")
    )]
    InstallStepFailure {
        step: String,
        artifact: String,
        reason: String,
    },

    #[error("Self-update failed: {reason}")]
    #[diagnostic(code(triquetra::selfupdate::failed))]
    SelfUpdateFailed { reason: String },

    // Configuration errors
    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(triquetra::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(triquetra::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(triquetra::config::invalid))]
    ConfigInvalid { message: String },

    // Locking errors
    #[error("Another triquetra instance is already running")]
    #[diagnostic(
        code(triquetra::lock::locked),
        help("Wait for the other instance to finish")
    )]
    InstanceLocked,

    #[error("Failed to acquire instance lock: {reason}")]
    #[diagnostic(code(triquetra::lock::failed))]
    LockFailed { reason: String },

    // Prompt errors
    #[error("Prompt failed: {reason}")]
    #[diagnostic(code(triquetra::prompt::failed))]
    Prompt { reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(triquetra::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(triquetra::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(triquetra::fs::io_error))]
    IoError { message: String },

    // Cache errors
    #[error("Cache operation failed: {message}")]
    #[diagnostic(code(triquetra::cache::operation_failed))]
    CacheOperationFailed { message: String },
}

impl From<std::io::Error> for TriquetraError {
    fn from(err: std::io::Error) -> Self {
        TriquetraError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for TriquetraError {
    fn from(err: serde_yaml::Error) -> Self {
        TriquetraError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TriquetraError {
    fn from(err: serde_json::Error) -> Self {
        TriquetraError::CacheOperationFailed {
            message: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for TriquetraError {
    fn from(err: inquire::InquireError) -> Self {
        TriquetraError::Prompt {
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, TriquetraError>;
