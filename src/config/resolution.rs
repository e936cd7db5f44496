//! Where configuration files are looked up.
//!
//! Lookup order, first match wins:
//!
//! 1. **Explicit** - the path passed with `--config`
//! 2. **Project** - `covdelta.toml` in the project root
//! 3. **User** - `<config dir>/covdelta/config.toml` (e.g. `~/.config/covdelta/config.toml`)
//!
//! When none exists the built-in defaults apply. Files are never merged.

use std::path::{Path, PathBuf};

/// File name looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "covdelta.toml";

// ============================================================================
// Configuration Source
// ============================================================================

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Project(PathBuf),
    User(PathBuf),
    Defaults,
}

impl ConfigSource {
    /// Path of the configuration file; empty for [`ConfigSource::Defaults`].
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::User(p) => p,
            Self::Defaults => Path::new(""),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "explicit ({})", p.display()),
            Self::Project(p) => write!(f, "project ({})", p.display()),
            Self::User(p) => write!(f, "user ({})", p.display()),
            Self::Defaults => write!(f, "built-in defaults"),
        }
    }
}

// ============================================================================
// Configuration Locations
// ============================================================================

/// Candidate configuration paths for a project.
#[derive(Debug, Clone)]
pub struct ConfigLocations {
    project: PathBuf,
    user: Option<PathBuf>,
}

impl ConfigLocations {
    #[must_use]
    pub fn new(project_dir: &Path) -> Self {
        Self {
            project: project_dir.join(PROJECT_CONFIG_FILE),
            user: dirs::config_dir().map(|d| d.join("covdelta").join("config.toml")),
        }
    }

    /// Replace the user-level path (tests point it at a temp dir).
    #[must_use]
    pub fn with_user_path(mut self, path: Option<PathBuf>) -> Self {
        self.user = path;
        self
    }

    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project
    }

    #[must_use]
    pub fn user(&self) -> Option<&Path> {
        self.user.as_deref()
    }

    /// Pick the configuration file to load.
    ///
    /// An explicit path is returned even when it does not exist so that the
    /// caller reports it as missing instead of silently falling back.
    #[must_use]
    pub fn resolve(&self, explicit: Option<&Path>) -> Option<ConfigSource> {
        if let Some(path) = explicit {
            return Some(ConfigSource::Explicit(path.to_path_buf()));
        }
        if self.project.is_file() {
            return Some(ConfigSource::Project(self.project.clone()));
        }
        self.user
            .as_ref()
            .filter(|p| p.is_file())
            .map(|p| ConfigSource::User(p.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_nothing_found() {
        let temp = TempDir::new().unwrap();
        let locations = ConfigLocations::new(temp.path()).with_user_path(None);
        assert_eq!(locations.resolve(None), None);
    }

    #[test]
    fn test_resolve_user_when_no_project_file() {
        let temp = TempDir::new().unwrap();
        let user = temp.path().join("user.toml");
        std::fs::write(&user, "").unwrap();
        let locations =
            ConfigLocations::new(&temp.path().join("proj")).with_user_path(Some(user.clone()));
        assert_eq!(locations.resolve(None), Some(ConfigSource::User(user)));
    }

    #[test]
    fn test_project_beats_user() {
        let temp = TempDir::new().unwrap();
        let user = temp.path().join("user.toml");
        std::fs::write(&user, "").unwrap();
        std::fs::write(temp.path().join(PROJECT_CONFIG_FILE), "").unwrap();
        let locations = ConfigLocations::new(temp.path()).with_user_path(Some(user));
        assert!(matches!(
            locations.resolve(None),
            Some(ConfigSource::Project(_))
        ));
    }

    #[test]
    fn test_explicit_returned_even_if_missing() {
        let temp = TempDir::new().unwrap();
        let locations = ConfigLocations::new(temp.path());
        let missing = temp.path().join("missing.toml");
        assert_eq!(
            locations.resolve(Some(&missing)),
            Some(ConfigSource::Explicit(missing))
        );
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::Defaults.to_string(), "built-in defaults");
        assert!(ConfigSource::Project(PathBuf::from("covdelta.toml"))
            .to_string()
            .starts_with("project"));
    }
}
