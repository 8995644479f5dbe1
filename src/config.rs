//! Configuration for sync passes.
//!
//! Two layers: `SyncConfig`, the immutable runtime snapshot the engine
//! reads, and `FileConfig`, the optional `.reposync.yaml` file. Precedence
//! is CLI flag > config file > built-in default; the merge happens in the
//! CLI layer.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::thread;

/// Name of the config file searched for in the sync root and home dir.
pub const CONFIG_FILE_NAME: &str = ".reposync.yaml";

/// Default worker pool size: min(available parallelism, 8).
pub fn default_max_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

/// Immutable configuration snapshot for one sync pass.
///
/// Constructed once per invocation. Derived copies use `Clone` plus
/// struct-update syntax; the original is never mutated.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Compute and report only; never mutate repository state.
    pub dry_run: bool,
    /// Pull with rebase rather than merge.
    pub use_rebase: bool,
    /// Delete local branches whose upstream disappeared.
    pub remove_stale: bool,
    /// Stash local changes around pulls instead of skipping dirty branches.
    pub stash_and_pull: bool,
    /// Sync repositories on a worker pool instead of sequentially.
    pub parallel: bool,
    /// Worker pool size in parallel mode.
    pub max_workers: usize,
    /// Enable debug narration.
    pub verbose: bool,
    /// Substring patterns excluding repository paths from the scan.
    pub exclude_patterns: Vec<String>,
    /// Remote to sync against.
    pub remote_name: String,
    /// Branch name globs; empty matches every branch.
    pub branch_patterns: Vec<String>,
    /// Emit the machine-readable report instead of narration.
    pub json_output: bool,
    /// Additional fetch attempts after a failure.
    pub fetch_retries: u32,
    /// Create local branches for remote-only branches.
    pub create_branches: bool,
    /// Skip creating branches whose newest commit is older than this many
    /// days. Zero disables the age gate.
    pub max_branch_age_days: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            use_rebase: true,
            remove_stale: true,
            stash_and_pull: false,
            parallel: false,
            max_workers: default_max_workers(),
            verbose: false,
            exclude_patterns: Vec::new(),
            remote_name: "origin".to_string(),
            branch_patterns: Vec::new(),
            json_output: false,
            fetch_retries: 0,
            create_branches: true,
            max_branch_age_days: 180,
        }
    }
}

/// Contents of an optional `.reposync.yaml` config file.
///
/// Every field is optional so the file only pins what it names; unknown
/// keys are ignored for forward compatibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub execute: Option<bool>,
    pub use_rebase: Option<bool>,
    pub remove_stale: Option<bool>,
    pub stash_and_pull: Option<bool>,
    pub parallel: Option<bool>,
    pub max_workers: Option<usize>,
    pub verbose: Option<bool>,
    pub exclude_patterns: Option<Vec<String>>,
    pub remote_name: Option<String>,
    pub branch_patterns: Option<Vec<String>>,
    pub json_output: Option<bool>,
    pub fetch_retries: Option<u32>,
    pub create_branches: Option<bool>,
    pub max_branch_age_days: Option<u32>,
}

impl FileConfig {
    /// Parse a config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SyncError::ConfigError(format!("failed to parse config YAML: {}", e)))
    }

    /// Load a config file from an explicit path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Locate and load the effective config file.
    ///
    /// An explicit path must exist and parse. Otherwise the search dir and
    /// then the home directory are probed for `.reposync.yaml`; a missing
    /// file simply yields the empty config.
    pub fn discover(search_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let mut candidates = vec![search_dir.join(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(CONFIG_FILE_NAME));
        }

        for candidate in candidates {
            if candidate.is_file() {
                log::debug!("using config file {}", candidate.display());
                return Self::load(&candidate);
            }
        }

        Ok(Self::default())
    }
}
