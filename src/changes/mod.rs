//! Change detection for deciding which files a coverage report is about.
//!
//! Only files modified by the change under review are actionable, so the
//! aggregate is filtered down to them before diffing.
//!
//! # Example
//!
//! ```rust,ignore
//! use covdelta::changes::{ChangeDetector, GitChangeProvider, ConcernedFileProvider};
//!
//! // Go files changed since the merge base with origin/main
//! let detector = ChangeDetector::new(".")
//!     .with_extensions(&["go"])
//!     .with_exclude_patterns(&["vendor/**"])?;
//! let provider = GitChangeProvider::new(detector, "origin/main");
//! let concerned = provider.concerned_files()?;
//! ```

mod concerned;

pub use concerned::{ConcernedFileProvider, ConcernedFiles, StaticConcernedFiles, Unfiltered};

use crate::error::{CovError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Detects changed files in a git repository.
///
/// Lists files added, copied, deleted, modified or renamed between a base
/// ref and `HEAD`. Deleted files are included so the report can show them as
/// removed.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    /// Path to the repository root
    repo_path: PathBuf,
    /// File extensions to keep (empty means all files)
    extensions: Vec<String>,
    /// Patterns of files to drop even if they match an extension
    exclude: GlobSet,
    exclude_patterns: Vec<String>,
}

impl ChangeDetector {
    /// Create a new `ChangeDetector` for the given repository path.
    #[must_use]
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            extensions: Vec::new(),
            exclude: GlobSet::empty(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Keep only files with the given extensions (without the leading dot).
    #[must_use]
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|s| s.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Drop files matching any of the glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`CovError::InvalidConfig`] if a pattern is not a valid glob.
    pub fn with_exclude_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.exclude = build_globset(patterns)?;
        self.exclude_patterns = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        Ok(self)
    }

    /// Repository this detector runs git in.
    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Glob patterns of excluded files, as configured.
    #[must_use]
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    /// Detect files changed on `HEAD` since it diverged from `base_ref`.
    ///
    /// Uses the three-dot form so commits that landed on the base branch
    /// after the change branched off are not attributed to the change.
    ///
    /// # Errors
    ///
    /// Returns an error if git is not installed, the path is not a git
    /// repository, or the ref does not exist.
    pub fn changed_since_merge_base(&self, base_ref: &str) -> Result<Vec<PathBuf>> {
        self.changed_since(&format!("{}...HEAD", base_ref))
    }

    /// Detect files changed in the given revision range or since a commit.
    ///
    /// # Errors
    ///
    /// Returns an error if git is not installed or the git command fails.
    pub fn changed_since(&self, revision: &str) -> Result<Vec<PathBuf>> {
        which::which("git").map_err(|_| CovError::MissingTool {
            tool: "git".to_string(),
        })?;

        // --diff-filter=ACDMR includes Added, Copied, Deleted, Modified, Renamed
        let output = Command::new("git")
            .args(["diff", "--name-status", "--diff-filter=ACDMR", "-M", revision])
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| CovError::git("diff", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CovError::git("diff", stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let files = self.parse_name_status_output(&stdout);
        tracing::debug!(revision, count = files.len(), "Detected changed files");
        Ok(files)
    }

    /// Parse git diff --name-status output into a list of file paths.
    ///
    /// For renames and copies the new path is kept.
    fn parse_name_status_output(&self, output: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Format: STATUS<tab>path or STATUS<tab>old_path<tab>new_path
            let parts: Vec<&str> = line.split('\t').collect();
            let status = parts[0];
            let file_path = if status.starts_with('R') || status.starts_with('C') {
                match parts.get(2) {
                    Some(path) => *path,
                    None => continue,
                }
            } else {
                match parts.get(1) {
                    Some(path) => *path,
                    None => continue,
                }
            };

            let path = PathBuf::from(file_path);
            if self.is_concerned(&path) {
                files.push(path);
            }
        }

        files
    }

    /// Whether a changed path passes the extension and exclude filters.
    fn is_concerned(&self, path: &Path) -> bool {
        if !self.extensions.is_empty() && !self.matches_extension(path) {
            return false;
        }
        !self.exclude.is_match(path)
    }

    /// Check if a path matches any of the configured extensions.
    fn matches_extension(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext_str = ext.to_string_lossy();
                self.extensions.iter().any(|e| e == ext_str.as_ref())
            }
            None => false,
        }
    }
}

/// Compile glob patterns into a single matcher.
///
/// # Errors
///
/// Returns [`CovError::InvalidConfig`] naming the first invalid pattern.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.as_ref()).map_err(|e| {
            CovError::invalid_config("changes.exclude", format!("'{}': {}", pattern.as_ref(), e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CovError::invalid_config("changes.exclude", e.to_string()))
}

// ============================================================================
// Git-backed provider
// ============================================================================

/// Concerned files taken from git: everything the current branch changed
/// relative to its merge base with `base_ref`.
#[derive(Debug, Clone)]
pub struct GitChangeProvider {
    detector: ChangeDetector,
    base_ref: String,
}

impl GitChangeProvider {
    #[must_use]
    pub fn new(detector: ChangeDetector, base_ref: impl Into<String>) -> Self {
        Self {
            detector,
            base_ref: base_ref.into(),
        }
    }
}

impl ConcernedFileProvider for GitChangeProvider {
    fn concerned_files(&self) -> Result<Option<ConcernedFiles>> {
        let changed = self.detector.changed_since_merge_base(&self.base_ref)?;
        let files = ConcernedFiles::from_paths(changed.iter().map(|p| p.to_string_lossy()));
        tracing::info!(
            base_ref = %self.base_ref,
            count = files.len(),
            "Collected concerned files from git"
        );
        Ok(Some(files))
    }
}
