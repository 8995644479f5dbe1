//! Domain model for sync passes: branches, statuses, issues, and results.
//!
//! Everything here is plain data. `BranchInfo`, `SyncIssue`, and
//! `OperationResult` are immutable records; `BranchStatus` is a point-in-time
//! snapshot discarded after the strategy consumes it; `SyncResult` is the
//! mutable accumulator owned by the orchestrating caller for one pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type-safe issue categories.
///
/// `Failed`, `StashConflict`, and `Diverged` are critical: they drive
/// non-zero exit signaling. The rest are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Failed,
    StashConflict,
    Diverged,
    LocalChanges,
    Unpushed,
    Stale,
}

impl IssueType {
    /// Whether this issue kind requires operator attention before the repo
    /// can be considered healthy.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            IssueType::Failed | IssueType::StashConflict | IssueType::Diverged
        )
    }
}

/// Kinds of primitive git operations the driver can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Fetch,
    Checkout,
    Pull,
    Rebase,
    Stash,
    BranchCreate,
    BranchDelete,
}

/// Information about a git branch, local or remote-tracking.
///
/// Created by enumerating repository refs; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Short branch name (without the remote prefix for remote branches).
    pub name: String,
    /// True for remote-tracking refs.
    pub is_remote: bool,
    /// Owning remote, set for remote branches only.
    pub remote_name: Option<String>,
    /// Latest commit id, when known.
    pub commit_hash: Option<String>,
    /// Configured upstream branch name (e.g. "origin/main"), if any.
    pub tracking_branch: Option<String>,
    /// True when `branch.<name>.remote` is configured, even if the upstream
    /// ref itself no longer exists.
    pub has_tracking_config: bool,
}

impl BranchInfo {
    /// Fully qualified name: `{remote}/{name}` for remote branches, else `name`.
    pub fn full_name(&self) -> String {
        if self.is_remote {
            if let Some(remote) = &self.remote_name {
                return format!("{}/{}", remote, self.name);
            }
        }
        self.name.clone()
    }
}

/// Status of one local branch relative to its upstream at a point in time.
///
/// Computed fresh per branch per sync pass. `is_clean` here is advisory;
/// the repository's own `is_clean()` is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchStatus {
    pub exists: bool,
    pub is_clean: bool,
    pub has_upstream: bool,
    pub commits_ahead: u32,
    pub commits_behind: u32,
    pub is_diverged: bool,
    pub local_commit: Option<String>,
    pub remote_commit: Option<String>,
}

/// Immutable record of one problem found during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncIssue {
    /// Repository this issue belongs to.
    pub repo_path: String,
    /// Branch name; empty for repo-level issues.
    pub branch: String,
    pub issue_type: IssueType,
    /// Free-text detail.
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl SyncIssue {
    /// Create an issue stamped with the current time.
    pub fn new(
        repo_path: impl Into<String>,
        branch: impl Into<String>,
        issue_type: IssueType,
        details: impl Into<String>,
    ) -> Self {
        Self {
            repo_path: repo_path.into(),
            branch: branch.into(),
            issue_type,
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of one primitive repository operation.
///
/// Operation failures are data, not errors: the caller records them as
/// issues and the pass continues.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub success: bool,
    pub operation: OperationType,
    pub message: String,
    /// Underlying error text, when the operation failed.
    pub error: Option<String>,
}

impl OperationResult {
    /// Successful operation with a human message.
    pub fn ok(operation: OperationType, message: impl Into<String>) -> Self {
        Self {
            success: true,
            operation,
            message: message.into(),
            error: None,
        }
    }

    /// Failed operation with a human message only.
    pub fn fail(operation: OperationType, message: impl Into<String>) -> Self {
        Self {
            success: false,
            operation,
            message: message.into(),
            error: None,
        }
    }

    /// Failed operation carrying the underlying error text.
    pub fn fail_with(
        operation: OperationType,
        message: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            operation,
            message: message.into(),
            error: Some(error.into()),
        }
    }

    /// Best available description of a failure: the underlying error text
    /// when present, the human message otherwise.
    pub fn failure_detail(&self) -> String {
        self.error.clone().unwrap_or_else(|| self.message.clone())
    }
}

/// Working tree change counts, as reported by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub staged: usize,
    pub unstaged: usize,
    pub untracked: usize,
}

/// Mutable result accumulator for one sync pass.
///
/// Owned by the orchestrating caller; merged additively across
/// repositories. Order is only meaningful within one repository's issues.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    pub repos_processed: usize,
    /// Ordered (repo, branch) pairs created during the pass.
    pub branches_created: Vec<(String, String)>,
    /// Ordered (repo, branch) pairs updated during the pass.
    pub branches_updated: Vec<(String, String)>,
    pub issues: Vec<SyncIssue>,
}

impl SyncResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sync issue encountered during processing.
    pub fn add_issue(&mut self, issue: SyncIssue) {
        self.issues.push(issue);
    }

    /// Issues of one category (e.g. Failed, Diverged).
    pub fn issues_of_type(&self, issue_type: IssueType) -> Vec<&SyncIssue> {
        self.issues
            .iter()
            .filter(|i| i.issue_type == issue_type)
            .collect()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// True if any Failed, StashConflict, or Diverged issue exists.
    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.issue_type.is_critical())
    }

    /// Fold another result into this one. Counts sum, lists concatenate;
    /// the operation is associative.
    pub fn merge(&mut self, other: SyncResult) {
        self.repos_processed += other.repos_processed;
        self.branches_created.extend(other.branches_created);
        self.branches_updated.extend(other.branches_updated);
        self.issues.extend(other.issues);
    }
}

/// A (repo, branch) pair in the machine-readable report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub repo: String,
    pub branch: String,
}

/// One issue in the machine-readable report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub repo_path: String,
    pub branch: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub details: String,
    /// RFC3339 / ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Machine-readable serialization of a [`SyncResult`].
///
/// This structure is the sync pass's sole externally-persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub repos_processed: usize,
    pub branches_created: Vec<BranchRef>,
    pub branches_updated: Vec<BranchRef>,
    pub issues: Vec<IssueRecord>,
    pub has_critical_issues: bool,
}

impl From<&SyncResult> for SyncReport {
    fn from(result: &SyncResult) -> Self {
        let pair = |(repo, branch): &(String, String)| BranchRef {
            repo: repo.clone(),
            branch: branch.clone(),
        };
        Self {
            repos_processed: result.repos_processed,
            branches_created: result.branches_created.iter().map(pair).collect(),
            branches_updated: result.branches_updated.iter().map(pair).collect(),
            issues: result
                .issues
                .iter()
                .map(|i| IssueRecord {
                    repo_path: i.repo_path.clone(),
                    branch: i.branch.clone(),
                    issue_type: i.issue_type,
                    details: i.details.clone(),
                    timestamp: i.timestamp,
                })
                .collect(),
            has_critical_issues: result.has_critical_issues(),
        }
    }
}

impl SyncReport {
    /// Reconstruct the accumulator form. `has_critical_issues` is derived
    /// state and is recomputed from the issues on the way back.
    pub fn into_result(self) -> SyncResult {
        SyncResult {
            repos_processed: self.repos_processed,
            branches_created: self
                .branches_created
                .into_iter()
                .map(|b| (b.repo, b.branch))
                .collect(),
            branches_updated: self
                .branches_updated
                .into_iter()
                .map(|b| (b.repo, b.branch))
                .collect(),
            issues: self
                .issues
                .into_iter()
                .map(|i| SyncIssue {
                    repo_path: i.repo_path,
                    branch: i.branch,
                    issue_type: i.issue_type,
                    details: i.details,
                    timestamp: i.timestamp,
                })
                .collect(),
        }
    }
}
