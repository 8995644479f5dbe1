//! Error types for the reposync CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error
//! messages. Note that individual git operation failures during a sync pass
//! are *not* errors; they are recorded as issues on the result and the pass
//! keeps going. `SyncError` covers only the environmental failures that
//! prevent a pass from running at all.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for reposync operations.
///
/// Each variant maps to a specific exit code.
#[derive(Error, Debug)]
pub enum SyncError {
    /// User provided invalid arguments or an unusable search directory.
    #[error("{0}")]
    UserError(String),

    /// The config file could not be read or parsed.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// The git binary itself could not be executed.
    #[error("Git environment failure: {0}")]
    GitEnvironment(String),
}

impl SyncError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::UserError(_) => exit_codes::USER_ERROR,
            SyncError::ConfigError(_) => exit_codes::USER_ERROR,
            SyncError::GitEnvironment(_) => exit_codes::GIT_FAILURE,
        }
    }
}

/// Result type alias for reposync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
