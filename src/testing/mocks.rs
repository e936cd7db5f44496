//! Controllable test doubles for the driver's collaborators.

use crate::changes::{ConcernedFileProvider, ConcernedFiles};
use crate::error::{CovError, Result};
use crate::poster::{CommentPoster, PostStatus};
use crate::profile::ProfileSource;
use crate::report::Report;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock profile source.
///
/// # Example
///
/// ```rust,ignore
/// let source = MockProfileSource::new("base")
///     .with_text("mode: set\na.go:1.1,2.2 1 1\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProfileSource {
    name: String,
    text: String,
    failure: Option<String>,
    delay: Option<Duration>,
    fetches: Arc<AtomicU32>,
}

impl MockProfileSource {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Profile text returned by `fetch`.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Make `fetch` fail with this message.
    #[must_use]
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `fetch` was called.
    #[must_use]
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for MockProfileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(CovError::profile_source(&self.name, message.clone())),
            None => Ok(self.text.clone()),
        }
    }
}

/// Mock concerned-file provider.
#[derive(Debug, Clone, Default)]
pub struct MockConcernedFiles {
    files: Option<ConcernedFiles>,
    failure: Option<String>,
    calls: Arc<AtomicU32>,
}

impl MockConcernedFiles {
    /// A provider without a repository connection (returns `None`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_files(mut self, paths: &[&str]) -> Self {
        self.files = Some(ConcernedFiles::from_paths(paths.iter().copied()));
        self
    }

    /// Make the provider fail as if git errored.
    #[must_use]
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConcernedFileProvider for MockConcernedFiles {
    fn concerned_files(&self) -> Result<Option<ConcernedFiles>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(CovError::git("diff", message.clone())),
            None => Ok(self.files.clone()),
        }
    }
}

/// Mock comment poster that records every report it receives.
#[derive(Debug, Clone, Default)]
pub struct MockCommentPoster {
    posted: Arc<Mutex<Vec<Report>>>,
    failure: Option<String>,
}

impl MockCommentPoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Reports posted so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn posted(&self) -> Vec<Report> {
        self.posted.lock().expect("poster lock poisoned").clone()
    }
}

#[async_trait]
impl CommentPoster for MockCommentPoster {
    async fn post(&self, report: &Report) -> Result<PostStatus> {
        if let Some(message) = &self.failure {
            return Err(CovError::poster(message.clone()));
        }
        self.posted
            .lock()
            .map_err(|_| CovError::poster("poster lock poisoned"))?
            .push(report.clone());
        Ok(PostStatus::Posted)
    }
}
