//! Configuration for the coverage gate.
//!
//! Settings live in a TOML file (`covdelta.toml` at the project root by
//! default). Every field has a default, so an empty file or no file at all
//! is a valid configuration.
//!
//! # Example covdelta.toml
//!
//! ```toml
//! threshold = 70
//! artifacts_dir = "artifacts"
//!
//! [profile]
//! path_prefix = "example.com/repo/"
//!
//! [changes]
//! base_ref = "origin/main"
//! extensions = ["go"]
//! exclude = ["vendor/**"]
//!
//! [report]
//! rerun_command = "/test pull-coverage"
//! ```

pub mod resolution;
pub mod validation;

pub use resolution::{ConfigLocations, ConfigSource};
pub use validation::ValidationReport;

use crate::aggregate::Threshold;
use crate::error::{CovError, Result};
use crate::report::{ReportOptions, DEFAULT_TITLE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on how long fetching both profiles may take.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

/// Top-level gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Minimum acceptable coverage percentage.
    pub threshold: Threshold,

    /// Bound on profile retrieval, in seconds.
    pub fetch_timeout_secs: u64,

    /// Directory for the `bot-post` and JSON outcome artifacts.
    pub artifacts_dir: Option<PathBuf>,

    pub profile: ProfileConfig,

    pub changes: ChangesConfig,

    pub report: ReportConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            artifacts_dir: None,
            profile: ProfileConfig::default(),
            changes: ChangesConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// How profile paths map to repository paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Module import path prefix stripped from profile file paths.
    pub path_prefix: Option<String>,
}

/// Which changed files count as concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangesConfig {
    /// Ref the change is compared against when asking git.
    pub base_ref: String,

    /// Extensions of files that carry coverage.
    pub extensions: Vec<String>,

    /// Glob patterns of files never considered.
    pub exclude: Vec<String>,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            base_ref: "origin/main".to_string(),
            extensions: vec!["go".to_string()],
            exclude: vec![
                "vendor/**".to_string(),
                "third_party/**".to_string(),
                "**/zz_generated*".to_string(),
            ],
        }
    }
}

/// Report layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub title: String,
    pub rerun_command: Option<String>,
    pub list_uncovered_lines: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            rerun_command: None,
            list_uncovered_lines: true,
        }
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            title: config.title.clone(),
            rerun_command: config.rerun_command.clone(),
            list_uncovered_lines: config.list_uncovered_lines,
        }
    }
}

impl GateConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CovError::Toml`] if the text is not valid TOML or contains
    /// unknown keys or an out-of-range threshold.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`CovError::MissingFile`] if the file does not exist and a
    /// configuration error naming the file if it cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CovError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| CovError::config_with_path(e.to_string(), path.to_path_buf()))
    }

    /// Resolve and load configuration for a project.
    ///
    /// An explicit path wins; otherwise the first existing file among the
    /// project and user locations is used; otherwise defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let locations = ConfigLocations::new(project_dir);
        match locations.resolve(explicit) {
            Some(source) => {
                let config = Self::from_file(source.path())?;
                tracing::debug!(path = %source.path().display(), "Loaded configuration");
                Ok((config, source))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// The profile retrieval bound.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Report layout options.
    #[must_use]
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions::from(&self.report)
    }

    /// Override the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the artifacts directory.
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: PathBuf) -> Self {
        self.artifacts_dir = Some(dir);
        self
    }

    /// Check semantic constraints that the TOML schema cannot express.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        validation::validate(self)
    }

    /// Serialize back to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CovError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_toml_is_default() {
        let config = GateConfig::parse("").unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.threshold.percent(), 50);
        assert_eq!(config.changes.extensions, vec!["go"]);
        assert!(config.report.list_uncovered_lines);
    }

    #[test]
    fn test_parse_full_config() {
        let config = GateConfig::parse(
            r#"
threshold = 80
fetch_timeout_secs = 30
artifacts_dir = "out"

[profile]
path_prefix = "example.com/repo/"

[changes]
base_ref = "upstream/release"
extensions = ["go", "s"]
exclude = []

[report]
title = "Coverage"
rerun_command = "/test cov"
list_uncovered_lines = false
"#,
        )
        .unwrap();

        assert_eq!(config.threshold.percent(), 80);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.artifacts_dir, Some(PathBuf::from("out")));
        assert_eq!(
            config.profile.path_prefix.as_deref(),
            Some("example.com/repo/")
        );
        assert_eq!(config.changes.base_ref, "upstream/release");
        assert!(config.changes.exclude.is_empty());

        let options = config.report_options();
        assert_eq!(options.title, "Coverage");
        assert_eq!(options.rerun_command.as_deref(), Some("/test cov"));
        assert!(!options.list_uncovered_lines);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(GateConfig::parse("threshold = 150").is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(GateConfig::parse("treshold = 70").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GateConfig::default().with_threshold(Threshold::new(65).unwrap());
        let text = config.to_toml().unwrap();
        assert_eq!(GateConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_load_prefers_explicit_then_project() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("covdelta.toml"), "threshold = 60").unwrap();
        let explicit = temp.path().join("ci.toml");
        std::fs::write(&explicit, "threshold = 90").unwrap();

        let (config, source) = GateConfig::load(temp.path(), Some(&explicit)).unwrap();
        assert_eq!(config.threshold.percent(), 90);
        assert!(matches!(source, ConfigSource::Explicit(_)));

        let (config, source) = GateConfig::load(temp.path(), None).unwrap();
        assert_eq!(config.threshold.percent(), 60);
        assert!(matches!(source, ConfigSource::Project(_)));
    }

    #[test]
    fn test_load_missing_explicit_file_errors() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        let err = GateConfig::load(temp.path(), Some(&missing)).unwrap_err();
        assert!(matches!(err, CovError::MissingFile { .. }));
    }

    #[test]
    fn test_from_file_parse_error_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("covdelta.toml");
        std::fs::write(&path, "threshold = \"high\"").unwrap();
        let err = GateConfig::from_file(&path).unwrap_err();
        match err {
            CovError::Config { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("Wrong error variant: {:?}", other),
        }
    }
}
