//! covdelta - coverage delta gate for code review
//!
//! Compares the statement-coverage profile of a candidate change against
//! the profile of its base, restricted to the files the change touches, and
//! decides whether coverage dropped below a threshold.
//!
//! # Architecture
//!
//! - [`profile`] - cover profile parsing and profile sources
//! - [`aggregate`] - per-file line coverage and thresholds
//! - [`delta`] - base vs candidate comparison and the gate verdict
//! - [`report`] - markdown rendering for review comments
//! - [`changes`] - which files a change concerns (git or static)
//! - [`poster`] - where rendered reports go
//! - [`presubmit`] - the end-to-end presubmit run
//! - [`config`] - TOML configuration loading and validation
//! - [`error`] - error types and exit codes
//! - [`testing`] - mocks and fixtures
//!
//! # Example
//!
//! ```
//! use covdelta::{aggregate, parse_profile, GroupChanges, ReportFormatter, Threshold};
//!
//! let threshold = Threshold::new(70).unwrap();
//! let base = parse_profile("mode: set\na.go:1.1,4.2 4 1\n").unwrap();
//! let candidate = parse_profile("mode: set\na.go:1.1,2.2 2 1\na.go:3.1,4.2 2 0\n").unwrap();
//!
//! let changes = GroupChanges::compute(
//!     &aggregate(&base, None, threshold).into_group_or_empty(threshold),
//!     &aggregate(&candidate, None, threshold).into_group_or_empty(threshold),
//! );
//! assert!(changes.is_coverage_low());
//!
//! let report = ReportFormatter::default().format(&changes, None);
//! assert!(report.text.contains("-50.0"));
//! ```

pub mod aggregate;
pub mod changes;
pub mod config;
pub mod delta;
pub mod error;
pub mod poster;
pub mod presubmit;
pub mod profile;
pub mod report;
pub mod testing;

pub use error::{CovError, Result, EXIT_COVERAGE_LOW};

pub use aggregate::{aggregate, Aggregate, CoverageGroup, FileCoverage, Threshold};
pub use changes::{
    ChangeDetector, ConcernedFileProvider, ConcernedFiles, GitChangeProvider,
    StaticConcernedFiles, Unfiltered,
};
pub use config::GateConfig;
pub use delta::{GroupChange, GroupChanges, OverallChange};
pub use poster::{
    CommentPoster, FileCommentPoster, NoopCommentPoster, PostStatus, StdoutCommentPoster,
};
pub use presubmit::{OutcomeRecord, Presubmit, PresubmitOutcome};
pub use profile::{
    parse_profile, CoverageProfile, FileProfileSource, ParseError, ProfileMode, ProfileSource,
    StatementRecord, StaticProfileSource,
};
pub use report::{Report, ReportFormatter, ReportOptions};
