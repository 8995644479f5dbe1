//! Summary reporting for a completed sync pass.

use crate::config::SyncConfig;
use crate::model::{IssueType, SyncIssue, SyncResult};
use crate::output::{OutputHandler, SECTION_WIDTH};

/// Renders the final human-readable report for a pass.
pub struct SummaryReporter<'a> {
    output: &'a dyn OutputHandler,
}

impl<'a> SummaryReporter<'a> {
    pub fn new(output: &'a dyn OutputHandler) -> Self {
        Self { output }
    }

    /// Print the final summary: counts, categorized issues, and
    /// recommendations.
    pub fn print_summary(&self, result: &SyncResult, config: &SyncConfig) {
        self.output.section("Summary");
        self.output.info(
            &format!("Total repositories processed: {}", result.repos_processed),
            0,
        );
        self.output.info("", 0);

        if result.has_issues() {
            self.print_issues_summary(result, config);
        } else {
            self.print_success_summary(result, config);
        }

        self.output.info("", 0);
        self.output.info(&"=".repeat(SECTION_WIDTH), 0);
    }

    fn print_issues_summary(&self, result: &SyncResult, config: &SyncConfig) {
        self.output.warning("Attention required", 0);
        self.output.info("", 0);

        self.print_issue_category("Failed operations", result.issues_of_type(IssueType::Failed));
        self.print_issue_category(
            "Stash conflicts",
            result.issues_of_type(IssueType::StashConflict),
        );
        self.print_issue_category(
            "Diverged branches",
            result.issues_of_type(IssueType::Diverged),
        );
        self.print_issue_category(
            "Local changes",
            result.issues_of_type(IssueType::LocalChanges),
        );
        self.print_issue_category(
            "Unpushed commits",
            result.issues_of_type(IssueType::Unpushed),
        );
        self.print_issue_category("Stale branches", result.issues_of_type(IssueType::Stale));

        self.output.info("Recommendations:", 0);
        if !result.issues_of_type(IssueType::StashConflict).is_empty() {
            self.output
                .error("  Resolve stash conflicts first", 0);
        }
        if !result.issues_of_type(IssueType::LocalChanges).is_empty() && !config.stash_and_pull {
            self.output
                .info("  Use --stash-and-pull for repos with local changes", 0);
        }
        if !result.issues_of_type(IssueType::Diverged).is_empty() {
            self.output
                .info("  Diverged branches need manual resolution", 0);
        }

        self.print_dry_run_reminder(config);
    }

    fn print_success_summary(&self, result: &SyncResult, config: &SyncConfig) {
        self.output.success("All repositories are in sync", 0);

        let (created_verb, updated_verb) = if config.dry_run {
            ("Would create", "Would update")
        } else {
            ("Created", "Updated")
        };
        if !result.branches_created.is_empty() {
            self.output.info(
                &format!(
                    "{} {} branch(es)",
                    created_verb,
                    result.branches_created.len()
                ),
                0,
            );
        }
        if !result.branches_updated.is_empty() {
            self.output.info(
                &format!(
                    "{} {} branch(es)",
                    updated_verb,
                    result.branches_updated.len()
                ),
                0,
            );
        }

        self.print_dry_run_reminder(config);
    }

    fn print_dry_run_reminder(&self, config: &SyncConfig) {
        if config.dry_run {
            self.output.info("", 0);
            self.output
                .info("This was a dry run - use --execute to apply changes", 0);
        }
    }

    fn print_issue_category(&self, title: &str, issues: Vec<&SyncIssue>) {
        if issues.is_empty() {
            return;
        }

        self.output
            .info(&format!("{} ({}):", title, issues.len()), 0);
        for issue in issues {
            self.output.info(&format!("  {}", issue.repo_path), 0);
            if issue.branch.is_empty() {
                self.output.info(&format!("    -> {}", issue.details), 0);
            } else {
                self.output
                    .info(&format!("    {}: {}", issue.branch, issue.details), 0);
            }
        }
        self.output.info("", 0);
    }
}
