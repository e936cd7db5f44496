//! The set of files a change touches.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sorted set of repository-relative paths modified by a change.
///
/// Iteration is always in path order so reports built from it are
/// reproducible.
///
/// # Example
///
/// ```
/// use covdelta::changes::ConcernedFiles;
///
/// let files = ConcernedFiles::from_paths(["./pkg/b.go", "pkg/a.go"]);
/// assert!(files.contains("pkg/b.go"));
/// assert_eq!(files.iter().next(), Some("pkg/a.go"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcernedFiles(BTreeSet<String>);

impl ConcernedFiles {
    /// Build a set from paths, dropping a leading `./` and blank entries.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            paths
                .into_iter()
                .map(|p| normalize(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    /// Whether `path` is part of the change.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ConcernedFiles {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::from_paths(iter)
    }
}

impl fmt::Display for ConcernedFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<&str> = self.iter().collect();
        write!(f, "{}", paths.join(", "))
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
}

// ============================================================================
// Providers
// ============================================================================

/// Supplies the concerned files for the change under review.
///
/// `Ok(None)` means there is no connection to a review system and the
/// aggregate should not be filtered. `Ok(Some(set))` with an empty set means
/// the change touches nothing that has coverage.
pub trait ConcernedFileProvider: Send + Sync {
    /// Look up the files touched by the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing system cannot be queried.
    fn concerned_files(&self) -> Result<Option<ConcernedFiles>>;
}

/// Provider for runs without a repository connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unfiltered;

impl ConcernedFileProvider for Unfiltered {
    fn concerned_files(&self) -> Result<Option<ConcernedFiles>> {
        Ok(None)
    }
}

/// Provider backed by a fixed list, e.g. paths passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticConcernedFiles {
    files: ConcernedFiles,
}

impl StaticConcernedFiles {
    #[must_use]
    pub fn new(files: ConcernedFiles) -> Self {
        Self { files }
    }
}

impl ConcernedFileProvider for StaticConcernedFiles {
    fn concerned_files(&self) -> Result<Option<ConcernedFiles>> {
        Ok(Some(self.files.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paths_normalizes_and_sorts() {
        let files = ConcernedFiles::from_paths(["./z.go", "a.go", "  ", "a.go"]);
        assert_eq!(files.len(), 2);
        assert_eq!(files.iter().collect::<Vec<_>>(), vec!["a.go", "z.go"]);
    }

    #[test]
    fn test_display_joins_paths() {
        let files = ConcernedFiles::from_paths(["b.go", "a.go"]);
        assert_eq!(files.to_string(), "a.go, b.go");
    }

    #[test]
    fn test_unfiltered_provider() {
        assert_eq!(Unfiltered.concerned_files().unwrap(), None);
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticConcernedFiles::new(ConcernedFiles::from_paths(["a.go"]));
        let files = provider.concerned_files().unwrap().unwrap();
        assert!(files.contains("a.go"));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let files = ConcernedFiles::from_paths(["b.go", "a.go"]);
        assert_eq!(serde_json::to_string(&files).unwrap(), r#"["a.go","b.go"]"#);
    }
}
