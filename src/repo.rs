//! Repository driver: the `GitRepository` trait and its git-subprocess
//! implementation.
//!
//! The trait is the seam the sync engine is tested through: a scripted
//! in-memory implementation replaces it entirely in unit tests. Individual
//! operation failures surface as `OperationResult` data; only "this is not a
//! usable repository" is an error.

use crate::error::{Result, SyncError};
use crate::git::{GitCommandError, run_git};
use crate::model::{BranchInfo, BranchStatus, ChangeCounts, OperationResult, OperationType};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Capability set the sync engine needs from one repository.
///
/// Mirrors the primitive git operations: every method maps to a small number
/// of git invocations scoped to this repository's working tree.
pub trait GitRepository {
    /// Absolute path to the repository root.
    fn path(&self) -> &Path;

    /// Name of the checked-out branch, or None when HEAD is detached.
    fn current_branch(&self) -> Option<String>;

    /// Fetch from a remote, optionally pruning deleted upstream refs.
    fn fetch(&self, remote: &str, prune: bool) -> OperationResult;

    /// Check out a local branch by name.
    fn checkout(&self, branch: &str) -> OperationResult;

    /// Pull from remote/branch, rebasing or merging. Must leave the tree in
    /// its pre-pull state on failure (aborts a partial rebase/merge).
    fn pull(&self, remote: &str, branch: &str, rebase: bool) -> OperationResult;

    /// Create a local branch tracking the given start point.
    fn create_branch(&self, name: &str, start_point: &str) -> OperationResult;

    /// Delete a local branch. `force` deletes unmerged branches too.
    fn delete_branch(&self, name: &str, force: bool) -> OperationResult;

    /// Stash working tree changes under a descriptive message.
    fn stash_push(&self, message: &str, include_untracked: bool) -> OperationResult;

    /// Pop and apply the most recent stash entry.
    fn stash_pop(&self) -> OperationResult;

    /// All local branches, including tracking configuration.
    fn local_branches(&self) -> Vec<BranchInfo>;

    /// All branches on the given remote (the HEAD pseudo-ref excluded).
    fn remote_branches(&self, remote: &str) -> Vec<BranchInfo>;

    /// Best-effort status probe of one branch against its upstream.
    /// Lookup failures degrade to false/zero fields, never errors.
    fn branch_status(&self, branch: &str) -> BranchStatus;

    /// True when the working tree has no staged, unstaged, or untracked
    /// changes. Canonical; `BranchStatus::is_clean` is advisory.
    fn is_clean(&self) -> bool;

    /// Counts of staged, unstaged, and untracked changes.
    fn change_counts(&self) -> ChangeCounts;

    /// Committer date of a ref's latest commit, when resolvable.
    fn commit_date(&self, refname: &str) -> Option<DateTime<Utc>>;
}

/// Driver implementation that shells out to the git binary.
pub struct GitCliRepository {
    path: PathBuf,
}

impl GitCliRepository {
    /// Open a repository at the given path.
    ///
    /// Fails when the path is not the root of a usable git repository;
    /// the caller turns that into a repo-level FAILED issue.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        run_git(&path, &["rev-parse", "--git-dir"]).map_err(|e| {
            SyncError::UserError(format!(
                "not a valid git repository: {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { path })
    }

    fn run(&self, args: &[&str]) -> std::result::Result<crate::git::GitOutput, GitCommandError> {
        run_git(&self.path, args)
    }

    fn op(
        &self,
        operation: OperationType,
        args: &[&str],
        ok_msg: &str,
        fail_msg: &str,
    ) -> OperationResult {
        match self.run(args) {
            Ok(_) => OperationResult::ok(operation, ok_msg),
            Err(e) => {
                if e.spawn_failure {
                    log::warn!("{}: {}", self.path.display(), e.message);
                }
                OperationResult::fail_with(operation, fail_msg, e.message)
            }
        }
    }
}

impl GitRepository for GitCliRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn current_branch(&self) -> Option<String> {
        // symbolic-ref fails on detached HEAD
        self.run(&["symbolic-ref", "--short", "-q", "HEAD"])
            .ok()
            .map(|o| o.stdout)
            .filter(|s| !s.is_empty())
    }

    fn fetch(&self, remote: &str, prune: bool) -> OperationResult {
        let mut args = vec!["fetch"];
        if prune {
            args.push("--prune");
        }
        args.push(remote);
        self.op(
            OperationType::Fetch,
            &args,
            &format!("Fetched from {}", remote),
            "Fetch failed",
        )
    }

    fn checkout(&self, branch: &str) -> OperationResult {
        self.op(
            OperationType::Checkout,
            &["checkout", branch],
            &format!("Checked out {}", branch),
            "Checkout failed",
        )
    }

    fn pull(&self, remote: &str, branch: &str, rebase: bool) -> OperationResult {
        let (operation, args): (OperationType, Vec<&str>) = if rebase {
            (OperationType::Rebase, vec!["pull", "--rebase", remote, branch])
        } else {
            (OperationType::Pull, vec!["pull", remote, branch])
        };

        match self.run(&args) {
            Ok(_) => OperationResult::ok(operation, format!("Pulled from {}/{}", remote, branch)),
            Err(e) => {
                // Leave the tree in its pre-pull state.
                let abort = if rebase {
                    ["rebase", "--abort"]
                } else {
                    ["merge", "--abort"]
                };
                if let Err(abort_err) = self.run(&abort) {
                    log::debug!(
                        "{}: {} abort after failed pull: {}",
                        self.path.display(),
                        abort[0],
                        abort_err.message
                    );
                }
                OperationResult::fail_with(operation, "Pull failed", e.message)
            }
        }
    }

    fn create_branch(&self, name: &str, start_point: &str) -> OperationResult {
        self.op(
            OperationType::BranchCreate,
            &["branch", "--track", name, start_point],
            &format!("Created branch {}", name),
            "Branch creation failed",
        )
    }

    fn delete_branch(&self, name: &str, force: bool) -> OperationResult {
        let flag = if force { "-D" } else { "-d" };
        self.op(
            OperationType::BranchDelete,
            &["branch", flag, name],
            &format!("Deleted branch {}", name),
            "Branch deletion failed",
        )
    }

    fn stash_push(&self, message: &str, include_untracked: bool) -> OperationResult {
        let mut args = vec!["stash", "push"];
        if include_untracked {
            args.push("-u");
        }
        args.push("-m");
        args.push(message);
        self.op(
            OperationType::Stash,
            &args,
            &format!("Stashed changes: {}", message),
            "Stash failed",
        )
    }

    fn stash_pop(&self) -> OperationResult {
        self.op(
            OperationType::Stash,
            &["stash", "pop"],
            "Popped stash",
            "Stash pop failed",
        )
    }

    fn local_branches(&self) -> Vec<BranchInfo> {
        let output = match self.run(&[
            "for-each-ref",
            "refs/heads",
            "--format=%(refname:short)%09%(objectname)%09%(upstream:short)",
        ]) {
            Ok(o) => o,
            Err(e) => {
                log::warn!("{}: listing local branches: {}", self.path.display(), e.message);
                return Vec::new();
            }
        };

        output
            .lines()
            .iter()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let name = fields.next()?.to_string();
                let commit = fields.next().map(str::to_string);
                let upstream = fields
                    .next()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);

                // branch.<name>.remote survives upstream deletion, which is
                // exactly what stale detection needs to see.
                let has_tracking_config = self
                    .run(&["config", "--get", &format!("branch.{}.remote", name)])
                    .map(|o| !o.stdout.is_empty())
                    .unwrap_or(false);

                Some(BranchInfo {
                    name,
                    is_remote: false,
                    remote_name: None,
                    commit_hash: commit,
                    tracking_branch: upstream,
                    has_tracking_config,
                })
            })
            .collect()
    }

    fn remote_branches(&self, remote: &str) -> Vec<BranchInfo> {
        let prefix = format!("refs/remotes/{}", remote);
        let output = match self.run(&[
            "for-each-ref",
            &prefix,
            "--format=%(refname:short)%09%(objectname)",
        ]) {
            Ok(o) => o,
            Err(e) => {
                log::warn!("{}: listing remote branches: {}", self.path.display(), e.message);
                return Vec::new();
            }
        };

        let head_ref = format!("{}/HEAD", remote);
        let strip = format!("{}/", remote);
        output
            .lines()
            .iter()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let full = fields.next()?;
                if full == head_ref {
                    return None;
                }
                let name = full.strip_prefix(&strip)?.to_string();
                Some(BranchInfo {
                    name,
                    is_remote: true,
                    remote_name: Some(remote.to_string()),
                    commit_hash: fields.next().map(str::to_string),
                    tracking_branch: None,
                    has_tracking_config: false,
                })
            })
            .collect()
    }

    fn branch_status(&self, branch: &str) -> BranchStatus {
        let mut status = BranchStatus::default();

        if self.run(&["rev-parse", "--verify", branch]).is_err() {
            return status;
        }
        status.exists = true;
        status.is_clean = self.is_clean();
        status.local_commit = self.run(&["rev-parse", branch]).ok().map(|o| o.stdout);

        let upstream_ref = format!("{}@{{upstream}}", branch);
        if self
            .run(&["rev-parse", "--abbrev-ref", &upstream_ref])
            .is_err()
        {
            return status;
        }
        status.has_upstream = true;
        status.remote_commit = self.run(&["rev-parse", &upstream_ref]).ok().map(|o| o.stdout);

        let count = |range: &str| -> u32 {
            self.run(&["rev-list", "--count", range])
                .ok()
                .and_then(|o| o.stdout.parse().ok())
                .unwrap_or(0)
        };
        status.commits_ahead = count(&format!("{}@{{upstream}}..{}", branch, branch));
        status.commits_behind = count(&format!("{}..{}@{{upstream}}", branch, branch));
        status.is_diverged = status.commits_ahead > 0 && status.commits_behind > 0;

        status
    }

    fn is_clean(&self) -> bool {
        self.run(&["status", "--porcelain"])
            .map(|o| o.is_empty())
            .unwrap_or(false)
    }

    fn change_counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        let Ok(output) = self.run(&["status", "--porcelain"]) else {
            return counts;
        };
        for line in output.lines() {
            let mut chars = line.chars();
            let index_state = chars.next().unwrap_or(' ');
            let tree_state = chars.next().unwrap_or(' ');
            if index_state == '?' {
                counts.untracked += 1;
                continue;
            }
            if index_state != ' ' {
                counts.staged += 1;
            }
            if tree_state != ' ' {
                counts.unstaged += 1;
            }
        }
        counts
    }

    fn commit_date(&self, refname: &str) -> Option<DateTime<Utc>> {
        let output = self
            .run(&["log", "-1", "--format=%cI", refname])
            .ok()
            .filter(|o| !o.is_empty())?;
        DateTime::parse_from_rfc3339(&output.stdout)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
