//! Repository scanner: finds git repositories under a directory.
//!
//! The walk never follows symlinks, never descends into a repository it
//! already yielded, and never yields the same resolved path twice.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds git repository roots under a search directory.
pub struct RepositoryScanner {
    exclude_patterns: Vec<String>,
}

impl RepositoryScanner {
    /// Create a scanner with substring-based exclude patterns.
    pub fn new(exclude_patterns: Vec<String>) -> Self {
        Self { exclude_patterns }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude_patterns.iter().any(|p| path_str.contains(p.as_str()))
    }

    /// Lazily yield repository roots found under `search_dir`.
    ///
    /// A repository root is a directory containing `.git` (directory or
    /// file; worktrees and submodules keep a `.git` file).
    pub fn find_repositories(&self, search_dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
        let mut walker = WalkDir::new(search_dir).follow_links(false).into_iter();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        std::iter::from_fn(move || {
            loop {
                let entry = match walker.next()? {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("scan error: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_dir() {
                    continue;
                }
                let path = entry.path();
                if self.is_excluded(path) {
                    if entry.depth() > 0 {
                        walker.skip_current_dir();
                    }
                    continue;
                }
                if path.join(".git").exists() {
                    walker.skip_current_dir();
                    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                    if seen.insert(resolved) {
                        return Some(path.to_path_buf());
                    }
                }
            }
        })
    }
}
