//! Coverage delta computation.
//!
//! Compares the aggregated coverage of a base build with a candidate build
//! and records, per file, what changed.
//!
//! # Example
//!
//! ```
//! use covdelta::aggregate::{aggregate, Threshold};
//! use covdelta::delta::GroupChanges;
//! use covdelta::profile::parse_profile;
//!
//! let t = Threshold::new(70).unwrap();
//! let base = parse_profile("a.go:1.1,1.9 1 1\na.go:2.1,2.9 1 1\n").unwrap();
//! let new = parse_profile("a.go:1.1,1.9 1 1\na.go:2.1,2.9 1 0\n").unwrap();
//!
//! let changes = GroupChanges::compute(
//!     &aggregate(&base, None, t).into_group_or_empty(t),
//!     &aggregate(&new, None, t).into_group_or_empty(t),
//! );
//! assert_eq!(changes.overall().percentage_delta, -50.0);
//! assert!(changes.is_coverage_low());
//! ```

use crate::aggregate::{CoverageGroup, FileCoverage, Threshold};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Deltas smaller than this are treated as no change.
pub const DELTA_EPSILON: f64 = 1e-9;

// ============================================================================
// Per-file change
// ============================================================================

/// How one file's coverage changed between base and candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupChange {
    /// Repository path of the file.
    pub file: String,

    /// Coverage in the base build, absent for new files.
    pub base_coverage: Option<FileCoverage>,

    /// Coverage in the candidate build, absent for removed files.
    pub new_coverage: Option<FileCoverage>,

    /// Candidate minus base percentage. New files count from zero; removed
    /// files have no delta.
    pub percentage_delta: f64,

    /// Lines covered in base that are uncovered in the candidate.
    pub newly_uncovered_lines: BTreeSet<u32>,

    /// The file only exists in the candidate.
    pub is_new_file: bool,

    /// The file only exists in the base.
    pub is_removed_file: bool,
}

impl GroupChange {
    fn new_file(file: &str, new: &FileCoverage) -> Self {
        Self {
            file: file.to_string(),
            base_coverage: None,
            new_coverage: Some(new.clone()),
            percentage_delta: new.percentage,
            newly_uncovered_lines: BTreeSet::new(),
            is_new_file: true,
            is_removed_file: false,
        }
    }

    fn removed_file(file: &str, base: &FileCoverage) -> Self {
        Self {
            file: file.to_string(),
            base_coverage: Some(base.clone()),
            new_coverage: None,
            percentage_delta: 0.0,
            newly_uncovered_lines: BTreeSet::new(),
            is_new_file: false,
            is_removed_file: true,
        }
    }

    fn modified_file(file: &str, base: &FileCoverage, new: &FileCoverage) -> Self {
        let newly_uncovered_lines = new
            .uncovered_line_numbers
            .intersection(&base.covered_line_numbers)
            .copied()
            .collect();
        Self {
            file: file.to_string(),
            base_coverage: Some(base.clone()),
            new_coverage: Some(new.clone()),
            percentage_delta: new.percentage - base.percentage,
            newly_uncovered_lines,
            is_new_file: false,
            is_removed_file: false,
        }
    }

    /// Whether the percentage moved at all.
    #[must_use]
    pub fn has_delta(&self) -> bool {
        self.percentage_delta.abs() > DELTA_EPSILON
    }

    /// Whether the file lost coverage. Removed files never regress.
    #[must_use]
    pub fn is_regression(&self) -> bool {
        !self.is_removed_file && self.percentage_delta < -DELTA_EPSILON
    }

    /// Whether this entry is worth mentioning in a report.
    #[must_use]
    pub fn is_notable(&self) -> bool {
        self.is_new_file || self.is_removed_file || self.has_delta()
    }

    /// Candidate percentage, if the file still exists.
    #[must_use]
    pub fn new_percentage(&self) -> Option<f64> {
        self.new_coverage.as_ref().map(|c| c.percentage)
    }

    /// Base percentage, if the file existed before.
    #[must_use]
    pub fn base_percentage(&self) -> Option<f64> {
        self.base_coverage.as_ref().map(|c| c.percentage)
    }
}

// ============================================================================
// Overall change
// ============================================================================

/// Aggregate before/after numbers and the gate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallChange {
    /// Base coverage over files that still exist, absent when there were no
    /// such lines.
    pub base_percentage: Option<f64>,

    /// Candidate overall coverage.
    pub new_percentage: f64,

    /// Candidate minus base; a missing base counts as zero.
    pub percentage_delta: f64,

    /// Threshold the candidate was judged against.
    pub threshold: Threshold,

    /// The candidate is below threshold and worse than base.
    pub is_coverage_low: bool,
}

impl OverallChange {
    fn compute(base: &CoverageGroup, candidate: &CoverageGroup) -> Self {
        // Removed files cannot regress, so they leave the baseline too.
        let (surviving, base_total, base_covered) = base
            .files()
            .iter()
            .filter(|(path, _)| candidate.file(path).is_some())
            .fold((0usize, 0usize, 0usize), |(n, total, covered), (_, f)| {
                (n + 1, total + f.total_lines, covered + f.covered_lines)
            });
        // Surviving files with no countable lines are vacuously covered.
        let base_percentage = (surviving > 0)
            .then(|| crate::aggregate::percentage(base_covered, base_total));

        let new_percentage = candidate.percentage();
        let percentage_delta = new_percentage - base_percentage.unwrap_or(0.0);
        let threshold = candidate.threshold();
        let is_coverage_low =
            threshold.is_low(new_percentage) && percentage_delta < -DELTA_EPSILON;

        Self {
            base_percentage,
            new_percentage,
            percentage_delta,
            threshold,
            is_coverage_low,
        }
    }
}

// ============================================================================
// Group changes
// ============================================================================

/// All per-file changes between two coverage groups, in file path order,
/// plus the overall verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupChanges {
    changes: Vec<GroupChange>,
    overall: OverallChange,
}

impl GroupChanges {
    /// Diff `base` against `candidate`.
    ///
    /// Both groups are expected to be filtered to the same concerned files.
    #[must_use]
    pub fn compute(base: &CoverageGroup, candidate: &CoverageGroup) -> Self {
        let paths: BTreeSet<&str> = base
            .files()
            .keys()
            .chain(candidate.files().keys())
            .map(String::as_str)
            .collect();

        let changes = paths
            .into_iter()
            .filter_map(|path| match (base.file(path), candidate.file(path)) {
                (None, Some(new)) => Some(GroupChange::new_file(path, new)),
                (Some(old), None) => Some(GroupChange::removed_file(path, old)),
                (Some(old), Some(new)) => Some(GroupChange::modified_file(path, old, new)),
                (None, None) => None,
            })
            .collect();

        Self {
            changes,
            overall: OverallChange::compute(base, candidate),
        }
    }

    /// Per-file changes sorted by path.
    #[must_use]
    pub fn changes(&self) -> &[GroupChange] {
        &self.changes
    }

    #[must_use]
    pub fn overall(&self) -> &OverallChange {
        &self.overall
    }

    /// The gate verdict.
    #[must_use]
    pub fn is_coverage_low(&self) -> bool {
        self.overall.is_coverage_low
    }

    /// Whether nothing worth reporting changed.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        !self.changes.iter().any(GroupChange::is_notable)
    }

    /// Changes ordered by delta magnitude, largest first; ties by path.
    #[must_use]
    pub fn most_changed(&self) -> Vec<&GroupChange> {
        let mut sorted: Vec<&GroupChange> =
            self.changes.iter().filter(|c| c.is_notable()).collect();
        sorted.sort_by(|a, b| {
            b.percentage_delta
                .abs()
                .partial_cmp(&a.percentage_delta.abs())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.file.cmp(&b.file))
        });
        sorted
    }

    /// Files that lost coverage, worst first; ties by path.
    #[must_use]
    pub fn regressions(&self) -> Vec<&GroupChange> {
        let mut sorted: Vec<&GroupChange> =
            self.changes.iter().filter(|c| c.is_regression()).collect();
        sorted.sort_by(|a, b| {
            a.percentage_delta
                .partial_cmp(&b.percentage_delta)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.file.cmp(&b.file))
        });
        sorted
    }

    /// Newly uncovered lines per file, for files that have any.
    #[must_use]
    pub fn newly_uncovered(&self) -> BTreeMap<&str, &BTreeSet<u32>> {
        self.changes
            .iter()
            .filter(|c| !c.newly_uncovered_lines.is_empty())
            .map(|c| (c.file.as_str(), &c.newly_uncovered_lines))
            .collect()
    }

    /// One-line summary of the diff.
    #[must_use]
    pub fn summary(&self) -> String {
        let added = self.changes.iter().filter(|c| c.is_new_file).count();
        let removed = self.changes.iter().filter(|c| c.is_removed_file).count();
        let regressed = self.changes.iter().filter(|c| c.is_regression()).count();

        let mut parts = vec![format!(
            "coverage: {:.1}% ({:+.1})",
            self.overall.new_percentage, self.overall.percentage_delta
        )];
        if regressed > 0 {
            parts.push(format!("regressed: {}", regressed));
        }
        if added > 0 || removed > 0 {
            parts.push(format!("files: +{} -{}", added, removed));
        }
        if self.overall.is_coverage_low {
            parts.push(format!("below threshold {}", self.overall.threshold));
        }
        parts.join(", ")
    }
}

impl fmt::Display for GroupChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
