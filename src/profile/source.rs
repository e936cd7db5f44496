//! Providers of raw profile bytes.
//!
//! The engine does not care whether a profile came from object storage, a
//! local file or a test fixture. Anything that can hand over the text
//! implements [`ProfileSource`].

use crate::error::{CovError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Abstraction for fetching the raw text of one coverage profile.
///
/// # Example
///
/// ```rust,ignore
/// use covdelta::profile::{ProfileSource, StaticProfileSource};
///
/// let source = StaticProfileSource::new("base", "mode: set\n");
/// let text = source.fetch().await?;
/// ```
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Human-readable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Fetch the profile text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn fetch(&self) -> Result<String>;
}

/// Reads a profile from the local file system.
#[derive(Debug, Clone)]
pub struct FileProfileSource {
    name: String,
    path: PathBuf,
}

impl FileProfileSource {
    /// Create a source named after the role it plays (`base`, `candidate`).
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProfileSource for FileProfileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CovError::MissingFile {
                path: self.path.clone(),
            }),
            Err(e) => Err(CovError::profile_source(
                &self.name,
                format!("{}: {}", self.path.display(), e),
            )),
        }
    }
}

/// Serves a profile held in memory.
#[derive(Debug, Clone)]
pub struct StaticProfileSource {
    name: String,
    text: String,
}

impl StaticProfileSource {
    /// Create an in-memory source.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl ProfileSource for StaticProfileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}
