//! Structured error handling and exit codes for the `ddup` binary.

use serde::Serialize;

/// Exit codes for the `ddup` application.
///
/// - 0: Success (command completed, results produced where applicable)
/// - 1: General error (unexpected failure)
/// - 2: Empty result (query completed but the canonical set was empty)
/// - 3: Partial success (ingest completed but some records were rejected)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: command completed normally.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Empty result: query completed but produced no rows.
    EmptyResult = 2,
    /// Partial success: ingest completed with some rejected records.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DD000",
            Self::GeneralError => "DD001",
            Self::EmptyResult => "DD002",
            Self::PartialSuccess => "DD003",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
