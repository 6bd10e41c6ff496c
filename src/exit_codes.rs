//! Process exit codes
//!
//! Scripts can tell why a run stopped without parsing its output. Codes are
//! stable:
//! - 0: success, nothing to do, or the user declined a gate
//! - 10-19: environment and usage errors
//! - 20-29: server and candidate errors
//! - 30-39: integrity and installation errors
//! - 40-49: local state errors

use crate::error::TriquetraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    EnvironmentRead = 10,
    Unsupported = 11,
    NotElevated = 12,
    Config = 13,
    InstanceLocked = 14,
    Prompt = 15,

    NoEndpoint = 20,
    Network = 21,
    NoCandidates = 22,
    CandidateNotFound = 23,
    BaselineUnavailable = 24,
    IncompleteCandidate = 25,

    DownloadIntegrity = 30,
    ChecksumCompute = 31,
    InstallFailed = 32,
    SelfUpdate = 33,

    Io = 40,
    Cache = 41,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl From<&TriquetraError> for ExitCode {
    fn from(err: &TriquetraError) -> Self {
        use TriquetraError as E;
        match err {
            E::EnvironmentRead { .. } => ExitCode::EnvironmentRead,
            E::UnsupportedEnvironment { .. } => ExitCode::Unsupported,
            E::NotElevated => ExitCode::NotElevated,
            E::ConfigReadFailed { .. }
            | E::ConfigParseFailed { .. }
            | E::ConfigInvalid { .. }
            | E::InvalidBuildVersion { .. } => ExitCode::Config,
            E::InstanceLocked | E::LockFailed { .. } => ExitCode::InstanceLocked,
            E::Prompt { .. } => ExitCode::Prompt,
            E::NoEndpointAvailable { .. } => ExitCode::NoEndpoint,
            E::Http { .. } | E::ListingParse { .. } => ExitCode::Network,
            E::NoCandidatesAvailable { .. } => ExitCode::NoCandidates,
            E::CandidateNotFound { .. } | E::CandidateUploading { .. } => {
                ExitCode::CandidateNotFound
            }
            E::BaselineUnavailable { .. } => ExitCode::BaselineUnavailable,
            E::IncompleteCandidate { .. } => ExitCode::IncompleteCandidate,
            E::DownloadIntegrity { .. } | E::InvalidChecksum { .. } => ExitCode::DownloadIntegrity,
            E::ChecksumCompute { .. } => ExitCode::ChecksumCompute,
            E::InstallStepFailure { .. } => ExitCode::InstallFailed,
            E::IntegrityMismatch { .. } | E::SelfUpdateFailed { .. } => ExitCode::SelfUpdate,
            E::FileNotFound { .. }
            | E::FileWriteFailed { .. }
            | E::IoError { .. } => ExitCode::Io,
            E::CacheOperationFailed { .. } => ExitCode::Cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds_have_distinct_codes() {
        let errors = [
            TriquetraError::EnvironmentRead {
                reason: String::new(),
            },
            TriquetraError::NoEndpointAvailable {
                tried: String::new(),
            },
            TriquetraError::NoCandidatesAvailable {
                endpoint: String::new(),
            },
            TriquetraError::CandidateNotFound {
                build: String::new(),
                available: String::new(),
            },
            TriquetraError::DownloadIntegrity {
                artifact: String::new(),
                expected: String::new(),
                actual: String::new(),
            },
            TriquetraError::ChecksumCompute {
                path: String::new(),
                reason: String::new(),
            },
            TriquetraError::InstallStepFailure {
                step: String::new(),
                artifact: String::new(),
                reason: String::new(),
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| ExitCode::from(e).as_i32()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_success_is_zero() {
        assert_eq!(i32::from(ExitCode::Success), 0);
    }
}
