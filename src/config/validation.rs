//! Semantic validation of a loaded [`GateConfig`].
//!
//! Parsing already rejects malformed TOML, unknown keys and out-of-range
//! thresholds. This pass catches values that parse but cannot work.

use super::GateConfig;
use crate::changes::build_globset;

/// Errors and warnings found in a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the configuration unusable.
    pub errors: Vec<String>,
    /// Suspicious but workable settings.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings do not affect validity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// 0 if valid, 7 (configuration error) otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() {
            0
        } else {
            7
        }
    }

    #[must_use]
    pub fn summary(&self) -> String {
        if !self.is_valid() {
            return format!(
                "Configuration is invalid with {} error(s).",
                self.errors.len()
            );
        }
        if self.warnings.is_empty() {
            "Configuration is valid.".to_string()
        } else {
            format!(
                "Configuration is valid with {} warning(s).",
                self.warnings.len()
            )
        }
    }
}

pub(super) fn validate(config: &GateConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    if config.fetch_timeout_secs == 0 {
        report
            .errors
            .push("fetch_timeout_secs: must be greater than zero".to_string());
    }

    if config.changes.extensions.is_empty() {
        report
            .warnings
            .push("changes.extensions: empty, every changed file is considered".to_string());
    }
    for ext in &config.changes.extensions {
        if ext.trim_start_matches('.').trim().is_empty() {
            report
                .errors
                .push("changes.extensions: entries must not be empty".to_string());
            break;
        }
    }

    if let Err(e) = build_globset(&config.changes.exclude) {
        report.errors.push(e.to_string());
    }

    if config.changes.base_ref.trim().is_empty() {
        report
            .errors
            .push("changes.base_ref: must not be empty".to_string());
    }

    if config.threshold.percent() == 0 {
        report
            .warnings
            .push("threshold: 0% never flags coverage as low".to_string());
    }

    if let Some(prefix) = &config.profile.path_prefix {
        if prefix.is_empty() {
            report
                .warnings
                .push("profile.path_prefix: empty prefix has no effect".to_string());
        }
    }

    report
}
