//! The presubmit run: fetch, aggregate, diff, report, post.
//!
//! [`Presubmit`] wires the pure engine to its collaborators. It asks a
//! [`ConcernedFileProvider`] which files the change touches, fetches the
//! base and candidate profiles concurrently, and hands a non-empty report
//! to a [`CommentPoster`].

use crate::aggregate::{aggregate, Aggregate, Threshold};
use crate::changes::{ConcernedFileProvider, ConcernedFiles};
use crate::config::GateConfig;
use crate::delta::GroupChanges;
use crate::error::{CovError, Result};
use crate::poster::{CommentPoster, PostStatus};
use crate::profile::{parse_profile, CoverageProfile, ProfileSource};
use crate::report::{format_line_coverage, Report, ReportFormatter, ReportOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Artifact holding the rendered report text.
pub const BOT_POST_FILE: &str = "bot-post";

/// Artifact holding the machine-readable outcome.
pub const OUTCOME_FILE: &str = "coverage-delta.json";

/// Artifact holding the candidate records of concerned files, in profile format.
pub const KEY_PROFILE_FILE: &str = "key-cov-prof.txt";

/// Artifact listing covered and uncovered lines per concerned file.
pub const LINE_COVERAGE_FILE: &str = "line-cov.txt";

/// Result of a presubmit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PresubmitOutcome {
    /// The change touches no file that carries coverage.
    NothingToCheck,
    /// Profiles were compared.
    Checked {
        report: Report,
        changes: GroupChanges,
    },
}

impl PresubmitOutcome {
    #[must_use]
    pub fn is_coverage_low(&self) -> bool {
        match self {
            Self::NothingToCheck => false,
            Self::Checked { report, .. } => report.is_coverage_low,
        }
    }

    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::NothingToCheck => None,
            Self::Checked { report, .. } => Some(report),
        }
    }

    #[must_use]
    pub fn changes(&self) -> Option<&GroupChanges> {
        match self {
            Self::NothingToCheck => None,
            Self::Checked { changes, .. } => Some(changes),
        }
    }
}

/// Outcome artifact written next to `bot-post`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub generated_at: DateTime<Utc>,
    pub threshold: Threshold,
    pub is_coverage_low: bool,
    pub outcome: PresubmitOutcome,
}

impl OutcomeRecord {
    #[must_use]
    pub fn new(outcome: PresubmitOutcome, threshold: Threshold) -> Self {
        Self {
            generated_at: Utc::now(),
            threshold,
            is_coverage_low: outcome.is_coverage_low(),
            outcome,
        }
    }
}

/// Presubmit driver.
#[derive(Debug, Clone)]
pub struct Presubmit {
    threshold: Threshold,
    fetch_timeout: Duration,
    path_prefix: Option<String>,
    artifacts_dir: Option<PathBuf>,
    formatter: ReportFormatter,
}

impl Presubmit {
    #[must_use]
    pub fn new(threshold: Threshold) -> Self {
        Self::from_config(&GateConfig::default()).with_threshold(threshold)
    }

    #[must_use]
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            threshold: config.threshold,
            fetch_timeout: config.fetch_timeout(),
            path_prefix: config.profile.path_prefix.clone(),
            artifacts_dir: config.artifacts_dir.clone(),
            formatter: ReportFormatter::new(config.report_options()),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.formatter = ReportFormatter::new(options);
        self
    }

    #[must_use]
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Run one presubmit check.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails, a profile cannot be fetched
    /// or parsed, fetching exceeds the timeout, an artifact cannot be
    /// written, or the poster fails.
    pub async fn run(
        &self,
        candidate: &dyn ProfileSource,
        base: &dyn ProfileSource,
        provider: &dyn ConcernedFileProvider,
        poster: &dyn CommentPoster,
    ) -> Result<PresubmitOutcome> {
        tracing::info!(
            candidate = candidate.name(),
            base = base.name(),
            threshold = %self.threshold,
            "Starting presubmit coverage check"
        );

        let concerned = provider.concerned_files()?;
        if concerned.as_ref().is_some_and(ConcernedFiles::is_empty) {
            tracing::info!("No concerned files in this change, nothing to check");
            return self.finish(PresubmitOutcome::NothingToCheck).await;
        }

        let (candidate_profile, base_profile) = self.fetch_both(candidate, base).await?;

        let new = aggregate(&candidate_profile, concerned.as_ref(), self.threshold);
        let old = aggregate(&base_profile, concerned.as_ref(), self.threshold);
        self.write_candidate_artifacts(candidate_profile, concerned.as_ref(), &new)
            .await?;
        if new.is_empty() && old.is_empty() {
            tracing::info!("Neither profile covers a concerned file, nothing to check");
            return self.finish(PresubmitOutcome::NothingToCheck).await;
        }

        let changes = GroupChanges::compute(
            &old.into_group_or_empty(self.threshold),
            &new.into_group_or_empty(self.threshold),
        );
        tracing::debug!(summary = %changes, "Computed coverage changes");

        let report = self.formatter.format(&changes, concerned.as_ref());
        self.write_bot_post(&report).await?;

        if report.is_empty {
            tracing::info!("Coverage unchanged, no report to post");
        } else {
            match poster.post(&report).await? {
                PostStatus::Posted => tracing::debug!("Report posted"),
                PostStatus::Unchanged => {
                    tracing::info!("Identical report already posted, skipped");
                }
                PostStatus::Skipped => {
                    tracing::debug!("No comment destination, report not posted");
                }
            }
        }

        self.finish(PresubmitOutcome::Checked { report, changes })
            .await
    }

    async fn fetch_both(
        &self,
        candidate: &dyn ProfileSource,
        base: &dyn ProfileSource,
    ) -> Result<(CoverageProfile, CoverageProfile)> {
        let fetch = async {
            futures::try_join!(self.load(candidate), self.load(base))
        };
        tokio::time::timeout(self.fetch_timeout, fetch)
            .await
            .map_err(|_| CovError::Timeout {
                seconds: self.fetch_timeout.as_secs(),
            })?
    }

    async fn load(&self, source: &dyn ProfileSource) -> Result<CoverageProfile> {
        let text = source.fetch().await?;
        let profile = parse_profile(&text).map_err(|e| CovError::profile(source.name(), e))?;
        tracing::debug!(
            profile = source.name(),
            records = profile.len(),
            "Parsed coverage profile"
        );
        Ok(match &self.path_prefix {
            Some(prefix) => profile.strip_prefix(prefix),
            None => profile,
        })
    }

    async fn write_candidate_artifacts(
        &self,
        profile: CoverageProfile,
        concerned: Option<&ConcernedFiles>,
        new: &Aggregate,
    ) -> Result<()> {
        let Some(dir) = &self.artifacts_dir else {
            return Ok(());
        };
        let key = profile.retain_files(|file| concerned.is_none_or(|set| set.contains(file)));
        write_artifact(dir, KEY_PROFILE_FILE, key.to_string().as_bytes()).await?;

        let listing = new.group().map(format_line_coverage).unwrap_or_default();
        write_artifact(dir, LINE_COVERAGE_FILE, listing.as_bytes()).await
    }

    async fn write_bot_post(&self, report: &Report) -> Result<()> {
        if let Some(dir) = &self.artifacts_dir {
            write_artifact(dir, BOT_POST_FILE, report.text.as_bytes()).await?;
        }
        Ok(())
    }

    async fn finish(&self, outcome: PresubmitOutcome) -> Result<PresubmitOutcome> {
        if let Some(dir) = &self.artifacts_dir {
            let record = OutcomeRecord::new(outcome.clone(), self.threshold);
            let json = serde_json::to_vec_pretty(&record)?;
            write_artifact(dir, OUTCOME_FILE, &json).await?;
        }
        tracing::info!(
            is_coverage_low = outcome.is_coverage_low(),
            "Completed presubmit coverage check"
        );
        Ok(outcome)
    }
}

async fn write_artifact(dir: &Path, name: &str, content: &[u8]) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, content).await?;
    tracing::debug!(path = %path.display(), "Wrote artifact");
    Ok(())
}
