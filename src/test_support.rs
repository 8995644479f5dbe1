//! Shared test fixtures: real-git tempdir repositories and a scripted
//! in-memory `GitRepository` for unit tests.

use crate::model::{BranchInfo, BranchStatus, ChangeCounts, OperationResult, OperationType};
use crate::repo::GitRepository;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub(crate) fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }
}

/// Create a standalone repository with one commit on `main`.
pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    // Deterministic default branch name across environments: set HEAD to an
    // unborn `main` before the first commit.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);

    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    temp_dir
}

/// Commit a file to a repository's current branch.
pub(crate) fn commit_file(repo_dir: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(repo_dir.join(name), content).unwrap();
    git(repo_dir, &["add", "."]);
    git(repo_dir, &["commit", "-m", message]);
}

/// Create a (remote, local) pair: a repository with one commit on `main`
/// and a clone of it whose `origin` points back at it.
///
/// The remote is a plain (non-bare) repository; tests advance it by
/// committing directly, which is enough for fetch/pull flows.
pub(crate) fn create_remote_clone_pair() -> (TempDir, TempDir) {
    let remote = create_test_repo();
    let local = TempDir::new().unwrap();

    let remote_path = remote.path().to_string_lossy().to_string();
    let local_path = local.path().to_string_lossy().to_string();
    git(remote.path(), &["clone", &remote_path, &local_path]);
    git(local.path(), &["config", "user.email", "test@example.com"]);
    git(local.path(), &["config", "user.name", "Test User"]);

    (remote, local)
}

/// Scripted in-memory repository implementing [`GitRepository`].
///
/// Records every mutating operation (plus fetch) in order and can be told
/// to fail specific operations. Probes (status, branch listings,
/// cleanliness) are served from configured state and tracked separately.
pub(crate) struct FakeRepository {
    path: PathBuf,
    clean: Cell<bool>,
    clean_before_stash: Cell<bool>,
    change_counts: Cell<ChangeCounts>,
    current: RefCell<Option<String>>,
    local: RefCell<Vec<BranchInfo>>,
    remote: RefCell<Vec<BranchInfo>>,
    statuses: RefCell<HashMap<String, BranchStatus>>,
    commit_dates: RefCell<HashMap<String, DateTime<Utc>>>,
    failing: RefCell<HashSet<String>>,
    fetch_failures_remaining: Cell<u32>,
    calls: RefCell<Vec<String>>,
    status_queries: RefCell<Vec<String>>,
}

impl FakeRepository {
    pub(crate) fn new() -> Self {
        Self {
            path: PathBuf::from("/fake/repo"),
            clean: Cell::new(true),
            clean_before_stash: Cell::new(true),
            change_counts: Cell::new(ChangeCounts::default()),
            current: RefCell::new(Some("main".to_string())),
            local: RefCell::new(Vec::new()),
            remote: RefCell::new(Vec::new()),
            statuses: RefCell::new(HashMap::new()),
            commit_dates: RefCell::new(HashMap::new()),
            failing: RefCell::new(HashSet::new()),
            fetch_failures_remaining: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            status_queries: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn set_clean(&self, clean: bool) {
        self.clean.set(clean);
    }

    pub(crate) fn set_change_counts(&self, counts: ChangeCounts) {
        self.change_counts.set(counts);
    }

    pub(crate) fn set_current(&self, branch: Option<&str>) {
        *self.current.borrow_mut() = branch.map(str::to_string);
    }

    pub(crate) fn add_local_branch(
        &self,
        name: &str,
        tracking: Option<&str>,
        has_tracking_config: bool,
    ) {
        self.local.borrow_mut().push(BranchInfo {
            name: name.to_string(),
            is_remote: false,
            remote_name: None,
            commit_hash: Some("aaa".to_string()),
            tracking_branch: tracking.map(str::to_string),
            has_tracking_config,
        });
    }

    pub(crate) fn add_remote_branch(&self, name: &str) {
        self.remote.borrow_mut().push(BranchInfo {
            name: name.to_string(),
            is_remote: true,
            remote_name: Some("origin".to_string()),
            commit_hash: Some("bbb".to_string()),
            tracking_branch: None,
            has_tracking_config: false,
        });
    }

    /// Configure the status returned for one branch.
    pub(crate) fn set_status(&self, name: &str, ahead: u32, behind: u32) {
        self.statuses.borrow_mut().insert(
            name.to_string(),
            BranchStatus {
                exists: true,
                is_clean: self.clean.get(),
                has_upstream: true,
                commits_ahead: ahead,
                commits_behind: behind,
                is_diverged: ahead > 0 && behind > 0,
                local_commit: Some("aaa".to_string()),
                remote_commit: Some("bbb".to_string()),
            },
        );
    }

    pub(crate) fn set_commit_date(&self, refname: &str, date: DateTime<Utc>) {
        self.commit_dates
            .borrow_mut()
            .insert(refname.to_string(), date);
    }

    /// Make one operation fail from now on. Names: fetch, checkout, pull,
    /// create_branch, delete_branch, stash_push, stash_pop.
    pub(crate) fn fail_operation(&self, name: &str) {
        self.failing.borrow_mut().insert(name.to_string());
    }

    /// Make the next `n` fetches fail, then succeed.
    pub(crate) fn fail_fetch_times(&self, n: u32) {
        self.fetch_failures_remaining.set(n);
    }

    /// Every recorded operation, in call order (mutations plus fetch).
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Recorded operations that mutate repository state (fetch excluded;
    /// a dry run still fetches so its report is accurate).
    pub(crate) fn mutating_calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| !c.starts_with("fetch"))
            .cloned()
            .collect()
    }

    /// Branches whose status was probed, in order.
    pub(crate) fn status_queries(&self) -> Vec<String> {
        self.status_queries.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn fails(&self, name: &str) -> bool {
        self.failing.borrow().contains(name)
    }

    fn result(
        &self,
        name: &str,
        operation: OperationType,
        ok_msg: &str,
        fail_msg: &str,
    ) -> OperationResult {
        if self.fails(name) {
            OperationResult::fail_with(operation, fail_msg, format!("{} rejected by fixture", name))
        } else {
            OperationResult::ok(operation, ok_msg)
        }
    }
}

impl GitRepository for FakeRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn current_branch(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    fn fetch(&self, remote: &str, prune: bool) -> OperationResult {
        self.record(if prune {
            format!("fetch --prune {}", remote)
        } else {
            format!("fetch {}", remote)
        });
        if self.fetch_failures_remaining.get() > 0 {
            self.fetch_failures_remaining
                .set(self.fetch_failures_remaining.get() - 1);
            return OperationResult::fail_with(
                OperationType::Fetch,
                "Fetch failed",
                "transient fetch failure",
            );
        }
        self.result("fetch", OperationType::Fetch, "Fetched", "Fetch failed")
    }

    fn checkout(&self, branch: &str) -> OperationResult {
        self.record(format!("checkout {}", branch));
        let result = self.result(
            "checkout",
            OperationType::Checkout,
            "Checked out",
            "Checkout failed",
        );
        if result.success {
            *self.current.borrow_mut() = Some(branch.to_string());
        }
        result
    }

    fn pull(&self, remote: &str, branch: &str, rebase: bool) -> OperationResult {
        self.record(if rebase {
            format!("pull --rebase {} {}", remote, branch)
        } else {
            format!("pull {} {}", remote, branch)
        });
        self.result("pull", OperationType::Pull, "Pulled", "Pull failed")
    }

    fn create_branch(&self, name: &str, start_point: &str) -> OperationResult {
        self.record(format!("branch --track {} {}", name, start_point));
        self.result(
            "create_branch",
            OperationType::BranchCreate,
            "Created",
            "Branch creation failed",
        )
    }

    fn delete_branch(&self, name: &str, force: bool) -> OperationResult {
        self.record(format!("branch {} {}", if force { "-D" } else { "-d" }, name));
        self.result(
            "delete_branch",
            OperationType::BranchDelete,
            "Deleted",
            "Branch deletion failed",
        )
    }

    fn stash_push(&self, message: &str, _include_untracked: bool) -> OperationResult {
        self.record(format!("stash push {}", message));
        let result = self.result("stash_push", OperationType::Stash, "Stashed", "Stash failed");
        if result.success {
            self.clean_before_stash.set(self.clean.get());
            self.clean.set(true);
        }
        result
    }

    fn stash_pop(&self) -> OperationResult {
        self.record("stash pop".to_string());
        let result = self.result(
            "stash_pop",
            OperationType::Stash,
            "Popped stash",
            "Stash pop failed",
        );
        if result.success {
            self.clean.set(self.clean_before_stash.get());
        }
        result
    }

    fn local_branches(&self) -> Vec<BranchInfo> {
        self.local.borrow().clone()
    }

    fn remote_branches(&self, _remote: &str) -> Vec<BranchInfo> {
        self.remote.borrow().clone()
    }

    fn branch_status(&self, branch: &str) -> BranchStatus {
        self.status_queries.borrow_mut().push(branch.to_string());
        self.statuses
            .borrow()
            .get(branch)
            .cloned()
            .unwrap_or_default()
    }

    fn is_clean(&self) -> bool {
        self.clean.get()
    }

    fn change_counts(&self) -> ChangeCounts {
        self.change_counts.get()
    }

    fn commit_date(&self, refname: &str) -> Option<DateTime<Utc>> {
        self.commit_dates.borrow().get(refname).copied()
    }
}
