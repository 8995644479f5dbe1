//! Branch sync strategies: one handler per branch state.
//!
//! The five states form a closed set, so classification is a sum type and
//! dispatch is an exhaustive match. Applicability is evaluated in a fixed
//! order; the predicates are disjoint, but the order is still part of the
//! contract and pinned by tests.

use crate::config::SyncConfig;
use crate::model::{BranchInfo, BranchStatus, ChangeCounts, IssueType, SyncIssue};
use crate::output::OutputHandler;
use crate::repo::GitRepository;
use chrono::Local;

/// The closed set of branch states the sync engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// In sync with upstream; nothing to do.
    UpToDate,
    /// Behind upstream with a clean tree; safe to pull.
    CleanFastForward,
    /// Behind upstream with local modifications in the tree.
    DirtyWorkingTree,
    /// Unpushed local commits, nothing incoming.
    AheadOfRemote,
    /// Local and upstream histories both advanced; manual resolution only.
    Diverged,
}

/// Classify a branch status, evaluating predicates in the fixed order
/// UpToDate, CleanFastForward, DirtyWorkingTree, AheadOfRemote, Diverged.
///
/// Returns None when no state claims the pair, notably when the branch has
/// no upstream, which is branch-creation territory, not strategy territory.
///
/// `tree_clean` is the repository's canonical cleanliness, not the advisory
/// snapshot on the status.
pub fn classify(status: &BranchStatus, tree_clean: bool) -> Option<BranchState> {
    if status.has_upstream && status.commits_ahead == 0 && status.commits_behind == 0 {
        return Some(BranchState::UpToDate);
    }
    if status.exists
        && status.has_upstream
        && status.commits_ahead == 0
        && status.commits_behind > 0
        && tree_clean
    {
        return Some(BranchState::CleanFastForward);
    }
    // A dirty diverged branch must land in Diverged below, so the dirty
    // predicate explicitly declines diverged branches.
    if status.exists
        && status.has_upstream
        && status.commits_behind > 0
        && !tree_clean
        && !status.is_diverged
    {
        return Some(BranchState::DirtyWorkingTree);
    }
    if status.has_upstream && status.commits_ahead > 0 && status.commits_behind == 0 {
        return Some(BranchState::AheadOfRemote);
    }
    if status.is_diverged {
        return Some(BranchState::Diverged);
    }
    None
}

/// Everything a strategy handler needs to act on one branch.
pub struct StrategyContext<'a> {
    pub repo: &'a dyn GitRepository,
    pub output: &'a dyn OutputHandler,
    pub config: &'a SyncConfig,
}

impl<'a> StrategyContext<'a> {
    fn repo_path(&self) -> String {
        self.repo.path().display().to_string()
    }

    fn issue(&self, branch: &str, issue_type: IssueType, details: impl Into<String>) -> SyncIssue {
        SyncIssue::new(self.repo_path(), branch, issue_type, details)
    }
}

/// Dispatch a classified branch to its handler.
///
/// Returns the issue the handler produced, or None when the branch is fine
/// (the caller records those as updated).
pub fn execute(
    state: BranchState,
    ctx: &StrategyContext<'_>,
    branch: &BranchInfo,
    remote_name: &str,
    status: &BranchStatus,
) -> Option<SyncIssue> {
    match state {
        BranchState::UpToDate => up_to_date(ctx),
        BranchState::CleanFastForward => clean_fast_forward(ctx, branch, remote_name),
        BranchState::DirtyWorkingTree => dirty_working_tree(ctx, branch, remote_name),
        BranchState::AheadOfRemote => ahead_of_remote(ctx, branch, status),
        BranchState::Diverged => diverged(ctx, branch, status),
    }
}

fn pull_verb(config: &SyncConfig) -> &'static str {
    if config.use_rebase { "rebase" } else { "merge" }
}

fn up_to_date(ctx: &StrategyContext<'_>) -> Option<SyncIssue> {
    if ctx.repo.is_clean() {
        ctx.output.info("Already up to date", 1);
    } else {
        ctx.output.info("Already up to date (local changes kept)", 1);
    }
    None
}

fn clean_fast_forward(
    ctx: &StrategyContext<'_>,
    branch: &BranchInfo,
    remote_name: &str,
) -> Option<SyncIssue> {
    if ctx.config.dry_run {
        ctx.output.info(
            &format!("[dry-run] would {} {}", pull_verb(ctx.config), branch.name),
            1,
        );
        return None;
    }

    let result = ctx
        .repo
        .pull(remote_name, &branch.name, ctx.config.use_rebase);
    if result.success {
        ctx.output
            .success(&format!("Updated via {}", pull_verb(ctx.config)), 1);
        None
    } else {
        let detail = result.failure_detail();
        ctx.output.error(&format!("Pull failed: {}", detail), 1);
        Some(ctx.issue(&branch.name, IssueType::Failed, detail))
    }
}

/// Human summary of working tree changes, e.g. "2 staged, 1 modified".
fn change_summary(counts: ChangeCounts) -> String {
    let mut parts = Vec::new();
    if counts.staged > 0 {
        parts.push(format!("{} staged", counts.staged));
    }
    if counts.unstaged > 0 {
        parts.push(format!("{} modified", counts.unstaged));
    }
    if counts.untracked > 0 {
        parts.push(format!("{} untracked", counts.untracked));
    }
    if parts.is_empty() {
        "uncommitted changes".to_string()
    } else {
        parts.join(", ")
    }
}

fn dirty_working_tree(
    ctx: &StrategyContext<'_>,
    branch: &BranchInfo,
    remote_name: &str,
) -> Option<SyncIssue> {
    let changes = change_summary(ctx.repo.change_counts());
    ctx.output
        .warning(&format!("Local changes detected: {}", changes), 1);

    if !ctx.config.stash_and_pull {
        ctx.output
            .warning("Skipping pull to avoid conflicts", 1);
        ctx.output.info("To update this branch, you can:", 1);
        ctx.output
            .info("  1. Commit changes: git add -A && git commit -m 'WIP'", 1);
        ctx.output
            .info("  2. Stash and pull: git stash && git pull && git stash pop", 1);
        ctx.output.info("  3. Use --stash-and-pull to automate", 1);
        return Some(ctx.issue(&branch.name, IssueType::LocalChanges, changes));
    }

    stash_pull_and_pop(ctx, branch, remote_name)
}

fn stash_pull_and_pop(
    ctx: &StrategyContext<'_>,
    branch: &BranchInfo,
    remote_name: &str,
) -> Option<SyncIssue> {
    if ctx.config.dry_run {
        ctx.output
            .info("[dry-run] would stash, pull, and reapply", 1);
        return None;
    }

    let stash_msg = format!(
        "reposync-auto-stash-{}-{}",
        Local::now().format("%Y%m%d-%H%M%S"),
        branch.name
    );

    let stash = ctx.repo.stash_push(&stash_msg, true);
    if !stash.success {
        let detail = stash.failure_detail();
        ctx.output.error(&format!("Failed to stash: {}", detail), 1);
        return Some(ctx.issue(
            &branch.name,
            IssueType::Failed,
            format!("Stash failed: {}", detail),
        ));
    }
    ctx.output
        .success(&format!("Stashed changes: {}", stash_msg), 1);

    let pull = ctx
        .repo
        .pull(remote_name, &branch.name, ctx.config.use_rebase);
    if !pull.success {
        let detail = pull.failure_detail();
        ctx.output.error(&format!("Pull failed: {}", detail), 1);
        // Best-effort restore of the stashed work.
        let restore = ctx.repo.stash_pop();
        if !restore.success {
            ctx.output
                .warning("Stashed changes could not be reapplied automatically", 1);
        }
        return Some(ctx.issue(
            &branch.name,
            IssueType::Failed,
            format!("Pull failed: {}", detail),
        ));
    }
    ctx.output
        .success(&format!("Updated via {}", pull_verb(ctx.config)), 1);

    ctx.output.info("Reapplying stashed changes...", 1);
    let pop = ctx.repo.stash_pop();
    if pop.success {
        ctx.output.success("Stash reapplied", 1);
        None
    } else {
        ctx.output
            .error("Stash conflict: the pull succeeded but stashed changes conflict", 1);
        ctx.output.info("To resolve:", 1);
        ctx.output
            .info(&format!("  cd '{}'", ctx.repo.path().display()), 1);
        ctx.output.info("  git stash show -p stash@{0}", 1);
        ctx.output.info("  git stash apply stash@{0}", 1);
        ctx.output
            .info("  # resolve conflicts, then: git stash drop stash@{0}", 1);
        Some(ctx.issue(
            &branch.name,
            IssueType::StashConflict,
            format!("stash: {}", stash_msg),
        ))
    }
}

fn ahead_of_remote(
    ctx: &StrategyContext<'_>,
    branch: &BranchInfo,
    status: &BranchStatus,
) -> Option<SyncIssue> {
    ctx.output.info(
        &format!(
            "Branch is ahead of remote ({} commits)",
            status.commits_ahead
        ),
        1,
    );
    Some(ctx.issue(
        &branch.name,
        IssueType::Unpushed,
        format!("{} commits ahead", status.commits_ahead),
    ))
}

fn diverged(
    ctx: &StrategyContext<'_>,
    branch: &BranchInfo,
    status: &BranchStatus,
) -> Option<SyncIssue> {
    ctx.output.warning("Branch has diverged", 1);
    ctx.output.info(
        &format!(
            "  {} commits ahead, {} commits behind",
            status.commits_ahead, status.commits_behind
        ),
        1,
    );
    ctx.output.info("  Manual resolution required:", 1);
    ctx.output.info(
        &format!("  cd '{}' && git status", ctx.repo.path().display()),
        1,
    );
    Some(ctx.issue(
        &branch.name,
        IssueType::Diverged,
        format!(
            "{} ahead, {} behind",
            status.commits_ahead, status.commits_behind
        ),
    ))
}
