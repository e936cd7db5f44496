//! Coverage aggregation.
//!
//! Turns a [`CoverageProfile`] into per-file, per-line statistics and marks
//! each file and the whole group against a [`Threshold`].
//!
//! # Line accounting
//!
//! ```text
//! records ──group by file──> blocks ──dedupe by range──> lines
//!                                     (last record wins)   │
//!                                                          v
//!                       covered  = every block on the line was hit
//!                       uncovered = at least one block on the line was not
//! ```
//!
//! Blocks with zero statements do not contribute lines. A file whose blocks
//! contribute no lines is vacuously 100% covered.
//!
//! # Example
//!
//! ```
//! use covdelta::aggregate::{aggregate, Threshold};
//! use covdelta::profile::parse_profile;
//!
//! let profile = parse_profile("a.go:1.1,2.5 2 1\na.go:3.1,4.5 2 0\n").unwrap();
//! let result = aggregate(&profile, None, Threshold::new(50).unwrap());
//! let group = result.group().unwrap();
//! assert_eq!(group.percentage(), 50.0);
//! assert!(group.threshold_pass());
//! ```

pub mod threshold;

pub use threshold::{Threshold, DEFAULT_THRESHOLD};

use crate::changes::ConcernedFiles;
use crate::profile::{CoverageProfile, StatementRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Percentage of `covered` out of `total`, 100 when there is nothing to cover.
#[must_use]
pub fn percentage(covered: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        covered as f64 * 100.0 / total as f64
    }
}

// ============================================================================
// File Coverage
// ============================================================================

/// Line coverage of a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Number of lines touched by at least one statement block.
    pub total_lines: usize,
    /// Number of those lines whose blocks all ran.
    pub covered_lines: usize,
    /// Line numbers counted as covered.
    pub covered_line_numbers: BTreeSet<u32>,
    /// Line numbers counted as uncovered.
    pub uncovered_line_numbers: BTreeSet<u32>,
    /// `covered_lines / total_lines * 100`, or 100 for an empty file.
    pub percentage: f64,
    /// Whether `percentage` meets the threshold.
    pub threshold_pass: bool,
}

impl FileCoverage {
    /// Compute coverage from the deduplicated blocks of one file.
    fn from_blocks<'a>(
        blocks: impl IntoIterator<Item = &'a StatementRecord>,
        threshold: Threshold,
    ) -> Self {
        let mut lines: BTreeMap<u32, bool> = BTreeMap::new();
        for block in blocks {
            if block.num_statements == 0 {
                continue;
            }
            let covered = block.is_covered();
            for line in block.start_line..=block.end_line {
                lines
                    .entry(line)
                    .and_modify(|c| *c &= covered)
                    .or_insert(covered);
            }
        }

        let (covered, uncovered): (Vec<_>, Vec<_>) = lines.into_iter().partition(|(_, c)| *c);
        let covered_line_numbers: BTreeSet<u32> = covered.into_iter().map(|(l, _)| l).collect();
        let uncovered_line_numbers: BTreeSet<u32> =
            uncovered.into_iter().map(|(l, _)| l).collect();

        let covered_lines = covered_line_numbers.len();
        let total_lines = covered_lines + uncovered_line_numbers.len();
        let percentage = percentage(covered_lines, total_lines);

        Self {
            total_lines,
            covered_lines,
            covered_line_numbers,
            uncovered_line_numbers,
            percentage,
            threshold_pass: threshold.is_met(percentage),
        }
    }

    /// Whether the given line was counted as covered.
    #[must_use]
    pub fn is_line_covered(&self, line: u32) -> bool {
        self.covered_line_numbers.contains(&line)
    }
}

// ============================================================================
// Coverage Group
// ============================================================================

/// Aggregated coverage of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGroup {
    files: BTreeMap<String, FileCoverage>,
    total_lines: usize,
    covered_lines: usize,
    percentage: f64,
    threshold: Threshold,
    threshold_pass: bool,
}

impl CoverageGroup {
    /// Build a group from per-file coverage, computing the line-weighted
    /// overall percentage.
    #[must_use]
    pub fn from_files(files: BTreeMap<String, FileCoverage>, threshold: Threshold) -> Self {
        let total_lines = files.values().map(|f| f.total_lines).sum();
        let covered_lines = files.values().map(|f| f.covered_lines).sum();
        let percentage = percentage(covered_lines, total_lines);
        Self {
            files,
            total_lines,
            covered_lines,
            percentage,
            threshold,
            threshold_pass: threshold.is_met(percentage),
        }
    }

    /// A group with no files.
    #[must_use]
    pub fn empty(threshold: Threshold) -> Self {
        Self::from_files(BTreeMap::new(), threshold)
    }

    /// Per-file coverage, sorted by path.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, FileCoverage> {
        &self.files
    }

    /// Coverage of a single file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Number of files in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    #[must_use]
    pub fn covered_lines(&self) -> usize {
        self.covered_lines
    }

    /// Line-weighted overall percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[must_use]
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Whether the overall percentage meets the threshold.
    #[must_use]
    pub fn threshold_pass(&self) -> bool {
        self.threshold_pass
    }

    /// Files below the threshold, in path order.
    pub fn low_coverage_files(&self) -> impl Iterator<Item = (&str, &FileCoverage)> {
        self.files
            .iter()
            .filter(|(_, f)| !f.threshold_pass)
            .map(|(path, f)| (path.as_str(), f))
    }
}

// ============================================================================
// Aggregate
// ============================================================================

/// Result of an aggregation pass.
///
/// `Empty` means the concerned-file filter left nothing to measure. It is a
/// success state, distinct from a group that measured 0% or 100%, so callers
/// can say "nothing to check" instead of raising a false alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    /// The filter removed every file.
    Empty,
    /// Coverage of the remaining files.
    Coverage(CoverageGroup),
}

impl Aggregate {
    /// Whether this is the empty aggregate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The group, unless the aggregate is empty.
    #[must_use]
    pub fn group(&self) -> Option<&CoverageGroup> {
        match self {
            Self::Empty => None,
            Self::Coverage(group) => Some(group),
        }
    }

    /// The group, or a group with no files when the aggregate is empty.
    #[must_use]
    pub fn into_group_or_empty(self, threshold: Threshold) -> CoverageGroup {
        match self {
            Self::Empty => CoverageGroup::empty(threshold),
            Self::Coverage(group) => group,
        }
    }
}

/// Aggregate a profile into per-file and overall coverage.
///
/// When `concerned` is given, only files in the set participate; if none
/// remain the result is [`Aggregate::Empty`]. Without a filter every file in
/// the profile participates and an empty profile yields an empty group.
///
/// Duplicate records for the same block range do not double count: the last
/// one in profile order wins.
#[must_use]
pub fn aggregate(
    profile: &CoverageProfile,
    concerned: Option<&ConcernedFiles>,
    threshold: Threshold,
) -> Aggregate {
    let mut blocks: BTreeMap<&str, BTreeMap<(u32, u32, u32, u32), &StatementRecord>> =
        BTreeMap::new();

    for record in profile.records() {
        if concerned.is_some_and(|set| !set.contains(&record.file)) {
            continue;
        }
        blocks
            .entry(record.file.as_str())
            .or_default()
            .insert(record.block(), record);
    }

    if concerned.is_some() && blocks.is_empty() {
        return Aggregate::Empty;
    }

    let files = blocks
        .into_iter()
        .map(|(file, file_blocks)| {
            (
                file.to_string(),
                FileCoverage::from_blocks(file_blocks.into_values(), threshold),
            )
        })
        .collect();

    Aggregate::Coverage(CoverageGroup::from_files(files, threshold))
}
