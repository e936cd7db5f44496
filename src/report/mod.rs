//! Report rendering for code-review comments.
//!
//! Turns [`GroupChanges`] into markdown that a comment poster can publish,
//! and carries the verdict alongside it.
//!
//! # Example
//!
//! ```
//! use covdelta::aggregate::{aggregate, Threshold};
//! use covdelta::delta::GroupChanges;
//! use covdelta::profile::parse_profile;
//! use covdelta::report::ReportFormatter;
//!
//! let t = Threshold::new(50).unwrap();
//! let base = aggregate(&parse_profile("a.go:1.1,1.9 1 0\n").unwrap(), None, t);
//! let new = aggregate(&parse_profile("a.go:1.1,1.9 1 1\n").unwrap(), None, t);
//! let changes = GroupChanges::compute(
//!     &base.into_group_or_empty(t),
//!     &new.into_group_or_empty(t),
//! );
//!
//! let report = ReportFormatter::default().format(&changes, None);
//! assert!(!report.is_empty);
//! assert!(report.text.contains("| `a.go` | 0.0% | 100.0% | +100.0 |"));
//! ```

use crate::aggregate::CoverageGroup;
use crate::changes::ConcernedFiles;
use crate::delta::{GroupChange, GroupChanges};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Hidden marker placed at the top of every report so a poster can find and
/// replace the comment it left on an earlier run.
pub const REPORT_MARKER: &str = "<!-- covdelta -->";

/// Default report heading.
pub const DEFAULT_TITLE: &str = "Code coverage report";

// ============================================================================
// Report
// ============================================================================

/// Rendered report plus the flags the caller branches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Markdown body; empty when there is nothing to say.
    pub text: String,

    /// Nothing changed that is worth a comment.
    pub is_empty: bool,

    /// The gate verdict, copied from the delta computation.
    pub is_coverage_low: bool,
}

impl Report {
    /// SHA-256 of the report text, hex-encoded.
    ///
    /// Posters compare digests to avoid re-publishing an identical report.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

// ============================================================================
// Formatter
// ============================================================================

/// Options controlling the report layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Heading shown above the table.
    pub title: String,

    /// Command reviewers can comment to re-run the job.
    pub rerun_command: Option<String>,

    /// Append a section listing newly uncovered lines.
    pub list_uncovered_lines: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            rerun_command: None,
            list_uncovered_lines: true,
        }
    }
}

/// Renders [`GroupChanges`] into a [`Report`].
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Render the report.
    ///
    /// Files outside `concerned` are only counted, never listed. Without a
    /// concerned set every changed file is listed. A low verdict always gets
    /// a report, even when no single file changed its percentage.
    #[must_use]
    pub fn format(&self, changes: &GroupChanges, concerned: Option<&ConcernedFiles>) -> Report {
        let is_coverage_low = changes.is_coverage_low();
        if changes.is_unchanged() && !is_coverage_low {
            return Report {
                text: String::new(),
                is_empty: true,
                is_coverage_low,
            };
        }

        let in_scope = |c: &GroupChange| concerned.is_none_or(|set| set.contains(&c.file));
        let (listed, outside): (Vec<&GroupChange>, Vec<&GroupChange>) = changes
            .changes()
            .iter()
            .filter(|c| c.is_notable())
            .partition(|c| in_scope(c));

        let threshold = changes.overall().threshold;
        let mut lines = vec![
            REPORT_MARKER.to_string(),
            format!("**{}**", self.options.title),
            String::new(),
        ];

        if let Some(command) = &self.options.rerun_command {
            lines.push(format!(
                "Say `{}` to re-run this coverage report",
                command
            ));
            lines.push(String::new());
        }

        if !listed.is_empty() {
            lines.push("| File | Old Coverage | New Coverage | Delta |".to_string());
            lines.push("|---|:-:|:-:|:-:|".to_string());
            for change in &listed {
                let old = match change.base_percentage() {
                    Some(p) => format!("{:.1}%", p),
                    None => "Does not exist".to_string(),
                };
                let new = match change.new_percentage() {
                    Some(p) if threshold.is_low(p) => format!("**{:.1}%**", p),
                    Some(p) => format!("{:.1}%", p),
                    None => "Removed".to_string(),
                };
                let delta = if change.is_removed_file {
                    "-".to_string()
                } else {
                    format!("{:+.1}", change.percentage_delta)
                };
                lines.push(format!("| `{}` | {} | {} | {} |", change.file, old, new, delta));
            }
            lines.push(String::new());
        }

        if !outside.is_empty() {
            lines.push(format!(
                "{} other file(s) outside this change also changed coverage.",
                outside.len()
            ));
            lines.push(String::new());
        }

        let overall = changes.overall();
        let before = overall
            .base_percentage
            .map_or_else(|| "n/a".to_string(), |p| format!("{:.1}%", p));
        lines.push(format!(
            "**Overall**: {} -> {:.1}% ({:+.1}), threshold {}",
            before, overall.new_percentage, overall.percentage_delta, threshold
        ));

        if is_coverage_low {
            lines.push(String::new());
            lines.push(format!(
                "Coverage decreased and is below the {} threshold.",
                threshold
            ));
        }

        if self.options.list_uncovered_lines {
            let uncovered: Vec<&GroupChange> = listed
                .iter()
                .copied()
                .filter(|c| !c.newly_uncovered_lines.is_empty())
                .collect();
            if !uncovered.is_empty() {
                lines.push(String::new());
                lines.push("Newly uncovered lines:".to_string());
                for change in uncovered {
                    lines.push(format!(
                        "- `{}`: {}",
                        change.file,
                        format_line_ranges(&change.newly_uncovered_lines)
                    ));
                }
            }
        }

        let mut text = lines.join("\n");
        text.push('\n');

        Report {
            text,
            is_empty: false,
            is_coverage_low,
        }
    }
}

/// Collapse sorted line numbers into ranges: `{1,2,3,7}` -> `1-3, 7`.
#[must_use]
pub fn format_line_ranges(lines: &BTreeSet<u32>) -> String {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for &line in lines {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == line => *end = line,
            _ => ranges.push((line, line)),
        }
    }
    ranges
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-file line coverage listing, one block per file:
///
/// ```text
/// pkg/a.go: 8 of 10 lines (80.0%)
///   covered: 1-8
///   uncovered: 9-10
/// ```
#[must_use]
pub fn format_line_coverage(group: &CoverageGroup) -> String {
    let mut out = String::new();
    for (path, coverage) in group.files() {
        out.push_str(&format!(
            "{}: {} of {} lines ({:.1}%)\n",
            path, coverage.covered_lines, coverage.total_lines, coverage.percentage
        ));
        if !coverage.covered_line_numbers.is_empty() {
            out.push_str(&format!(
                "  covered: {}\n",
                format_line_ranges(&coverage.covered_line_numbers)
            ));
        }
        if !coverage.uncovered_line_numbers.is_empty() {
            out.push_str(&format!(
                "  uncovered: {}\n",
                format_line_ranges(&coverage.uncovered_line_numbers)
            ));
        }
    }
    out
}
