//! Custom error types for covdelta.
//!
//! This module provides structured error types so the presubmit driver and
//! the CLI can report what went wrong and map it to a stable exit status.

use crate::profile::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status used by the CLI when the coverage gate fails.
///
/// This is not an error variant: a low-coverage verdict is a successful run
/// whose outcome happens to block the change.
pub const EXIT_COVERAGE_LOW: i32 = 3;

/// Main error type for covdelta operations
#[derive(Error, Debug)]
pub enum CovError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Missing required file
    #[error("Missing required file: {path}")]
    MissingFile { path: PathBuf },

    // =========================================================================
    // Profile Errors
    // =========================================================================
    /// A coverage profile could not be parsed
    #[error("Malformed coverage profile '{profile}': {source}")]
    Profile {
        profile: String,
        #[source]
        source: ParseError,
    },

    /// A profile source failed to deliver its bytes
    #[error("Failed to read coverage profile '{profile}': {message}")]
    ProfileSource { profile: String, message: String },

    /// Profile retrieval exceeded the configured bound
    #[error("Timed out after {seconds}s while fetching coverage profiles")]
    Timeout { seconds: u64 },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// Missing required tool
    #[error("Missing required tool: {tool}")]
    MissingTool { tool: String },

    /// Git operation failed
    #[error("Git operation failed: {operation} - {message}")]
    Git { operation: String, message: String },

    /// The comment poster could not publish the report
    #[error("Failed to post coverage report: {message}")]
    Poster { message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML error wrapper
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CovError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Attach the name of the profile a parse error came from
    pub fn profile(profile: impl Into<String>, source: ParseError) -> Self {
        Self::Profile {
            profile: profile.into(),
            source,
        }
    }

    /// Create a profile source error
    pub fn profile_source(profile: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProfileSource {
            profile: profile.into(),
            message: message.into(),
        }
    }

    /// Create a git error
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a poster error
    pub fn poster(message: impl Into<String>) -> Self {
        Self::Poster {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error was caused by bad coverage input rather than the
    /// environment.
    ///
    /// Retrying a run that failed this way cannot change the outcome.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Profile { .. })
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Profile { .. } | Self::ProfileSource { .. } | Self::Timeout { .. } => 2,
            Self::MissingFile { .. } | Self::MissingTool { .. } => 6,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::Toml(_) => 7,
            _ => 1,
        }
    }
}

/// Type alias for covdelta results
pub type Result<T> = std::result::Result<T, CovError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_parse_error() -> ParseError {
        ParseError::new(4, "pkg/a.go:1.1,x 1 1", "invalid end position")
    }

    #[test]
    fn test_profile_error_names_profile_and_line() {
        let err = CovError::profile("candidate", sample_parse_error());
        let msg = err.to_string();
        assert!(msg.contains("candidate"));
        assert!(msg.contains("line 4"));
    }

    #[test]
    fn test_is_input_error() {
        assert!(CovError::profile("base", sample_parse_error()).is_input_error());
        assert!(!CovError::git("diff", "boom").is_input_error());
        assert!(!CovError::config("bad").is_input_error());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CovError::profile("base", sample_parse_error()).exit_code(),
            2
        );
        assert_eq!(CovError::Timeout { seconds: 5 }.exit_code(), 2);
        assert_eq!(
            CovError::MissingTool {
                tool: "git".into()
            }
            .exit_code(),
            6
        );
        assert_eq!(CovError::config("test").exit_code(), 7);
        assert_eq!(CovError::invalid_config("threshold", "too big").exit_code(), 7);
        assert_eq!(CovError::poster("offline").exit_code(), 1);
        assert_ne!(CovError::poster("offline").exit_code(), EXIT_COVERAGE_LOW);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/covdelta.toml");
        let err = CovError::config_with_path("failed to parse", path.clone());
        if let CovError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_git_error() {
        let err = CovError::git("diff", "not a git repository");
        if let CovError::Git { operation, message } = err {
            assert_eq!(operation, "diff");
            assert_eq!(message, "not a git repository");
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: CovError = io_err.into();
        assert!(matches!(err, CovError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
