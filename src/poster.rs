//! Comment posters: where a finished report goes.
//!
//! The engine only produces text. Publishing it to a review system is the
//! job of a [`CommentPoster`]; this module ships the two posters the CLI
//! needs.

use crate::error::{CovError, Result};
use crate::report::Report;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// What a poster did with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    /// The report was published.
    Posted,
    /// An identical report was already published.
    Unchanged,
    /// The poster has no destination and dropped the report.
    Skipped,
}

/// Consumer of finished reports.
#[async_trait]
pub trait CommentPoster: Send + Sync {
    /// Publish the report, replacing any earlier report from this tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written.
    async fn post(&self, report: &Report) -> Result<PostStatus>;
}

/// Writes the report to a comment file that a CI step publishes later.
#[derive(Debug, Clone)]
pub struct FileCommentPoster {
    path: PathBuf,
}

impl FileCommentPoster {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the file the report is written to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CommentPoster for FileCommentPoster {
    async fn post(&self, report: &Report) -> Result<PostStatus> {
        let path = &self.path;

        if let Ok(existing) = tokio::fs::read_to_string(path).await {
            if existing == report.text {
                tracing::debug!(path = %path.display(), "Report unchanged, not rewriting");
                return Ok(PostStatus::Unchanged);
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CovError::poster(format!("{}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(path, &report.text)
            .await
            .map_err(|e| CovError::poster(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), digest = %report.digest(), "Wrote coverage report");
        Ok(PostStatus::Posted)
    }
}

/// Prints the report to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutCommentPoster;

#[async_trait]
impl CommentPoster for StdoutCommentPoster {
    async fn post(&self, report: &Report) -> Result<PostStatus> {
        print!("{}", report.text);
        Ok(PostStatus::Posted)
    }
}

/// Drops reports. Used when there is no review system to talk to and the
/// caller consumes the outcome itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommentPoster;

#[async_trait]
impl CommentPoster for NoopCommentPoster {
    async fn post(&self, _report: &Report) -> Result<PostStatus> {
        Ok(PostStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report(text: &str) -> Report {
        Report {
            text: text.to_string(),
            is_empty: false,
            is_coverage_low: false,
        }
    }

    #[tokio::test]
    async fn test_file_poster_writes_comment_file() {
        let temp = TempDir::new().unwrap();
        let poster = FileCommentPoster::new(temp.path().join("out/comment.md"));

        let status = poster.post(&report("hello\n")).await.unwrap();
        assert_eq!(status, PostStatus::Posted);
        let written = std::fs::read_to_string(temp.path().join("out/comment.md")).unwrap();
        assert_eq!(written, "hello\n");
    }

    #[tokio::test]
    async fn test_file_poster_skips_identical_report() {
        let temp = TempDir::new().unwrap();
        let poster = FileCommentPoster::new(temp.path().join("comment.md"));

        assert_eq!(
            poster.post(&report("same")).await.unwrap(),
            PostStatus::Posted
        );
        assert_eq!(
            poster.post(&report("same")).await.unwrap(),
            PostStatus::Unchanged
        );
        assert_eq!(
            poster.post(&report("different")).await.unwrap(),
            PostStatus::Posted
        );
    }

    #[tokio::test]
    async fn test_noop_poster_skips_without_claiming_a_duplicate() {
        let status = NoopCommentPoster.post(&report("anything")).await.unwrap();
        assert_eq!(status, PostStatus::Skipped);
        assert_ne!(status, PostStatus::Unchanged);
    }
}
