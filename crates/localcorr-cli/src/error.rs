//! CLI exit code handling.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Runtime failure (bad input data, I/O, shape errors)
//! - 2: Configuration or usage error, raised before any data is read

use localcorr::prelude::LocalCorrError;
use std::process::ExitCode;

/// Exit codes for the `localcorr` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    /// Results written.
    Success = 0,
    /// The pipeline failed while reading, computing or writing.
    Failure = 1,
    /// Arguments or configuration rejected.
    Usage = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&LocalCorrError> for CliExitCode {
    fn from(err: &LocalCorrError) -> Self {
        if err.is_configuration() {
            CliExitCode::Usage
        } else {
            CliExitCode::Failure
        }
    }
}
