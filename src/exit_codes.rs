//! Exit code constants for the reposync CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable directory, invalid config)
//! - 2: Sync completed but critical issues were found
//! - 3: Git environment failure (git not executable)

/// Successful execution with no critical issues.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid search directory, or broken config file.
pub const USER_ERROR: i32 = 1;

/// The pass completed but recorded critical issues
/// (failed operations, stash conflicts, or diverged branches).
pub const CRITICAL_ISSUES: i32 = 2;

/// Git environment failure: the git binary could not be executed at all.
pub const GIT_FAILURE: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, CRITICAL_ISSUES, GIT_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
