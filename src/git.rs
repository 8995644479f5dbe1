//! Git command runner for reposync.
//!
//! Provides a safe wrapper around git commands with captured stdout/stderr
//! and structured error handling. All git operations go through this module;
//! the repository driver turns failures into `OperationResult` data rather
//! than propagating them.

use crate::error::{Result, SyncError};
use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Failure of a single git invocation.
///
/// `spawn_failure` distinguishes "git could not be executed at all" from a
/// normal non-zero exit.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GitCommandError {
    pub message: String,
    pub spawn_failure: bool,
}

/// Result type for raw git invocations.
pub type GitResult<T> = std::result::Result<T, GitCommandError>;

/// Run a git command with the specified working directory.
///
/// # Arguments
///
/// * `cwd` - The working directory to run the command in
/// * `args` - The git command arguments (without "git" prefix)
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(GitCommandError)` - On spawn failure or non-zero exit code
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> GitResult<GitOutput> {
    let cwd = cwd.as_ref();

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| GitCommandError {
            message: format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ),
            spawn_failure: true,
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(GitCommandError {
            message: format!(
                "git {} failed (exit code {}): {}",
                args.first().unwrap_or(&""),
                exit_code,
                error_msg
            ),
            spawn_failure: false,
        })
    }
}

/// Preflight check that the git binary is executable.
///
/// Run once before a pass starts so a missing git install surfaces as a
/// clean environment error instead of a FAILED issue on every repository.
pub fn ensure_git_available() -> Result<()> {
    let output = Command::new("git").arg("--version").output().map_err(|e| {
        SyncError::GitEnvironment(format!("failed to execute git: {} (is git installed?)", e))
    })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(SyncError::GitEnvironment(
            "git --version returned a non-zero exit code".to_string(),
        ))
    }
}
