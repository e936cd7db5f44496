//! Coverage profile parsing.
//!
//! A profile is the line-oriented text emitted by `go test -coverprofile`:
//!
//! ```text
//! mode: set
//! example.com/repo/pkg/a.go:10.2,12.16 2 1
//! example.com/repo/pkg/a.go:14.2,14.12 1 0
//! ```
//!
//! Each record names a block `startLine.startCol,endLine.endCol`, the number
//! of statements in the block and how often the block ran. Records are parsed
//! independently, so one malformed line never affects its neighbours.
//!
//! # Example
//!
//! ```
//! use covdelta::profile::parse_profile;
//!
//! let profile = parse_profile("mode: set\npkg/a.go:1.1,3.2 2 1\n").unwrap();
//! assert_eq!(profile.len(), 1);
//! assert_eq!(profile.records()[0].hit_count, 1);
//! ```

pub mod source;

pub use source::{FileProfileSource, ProfileSource, StaticProfileSource};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

// ============================================================================
// Parse Error
// ============================================================================

/// A profile line that could not be decoded.
///
/// Carries the 1-based line number and the raw line so the caller can name
/// the offending input in its message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_number}: {reason}: '{content}'")]
pub struct ParseError {
    /// 1-based line number within the profile text.
    pub line_number: usize,
    /// The raw line as it appeared in the profile.
    pub content: String,
    /// What was wrong with it.
    pub reason: String,
}

impl ParseError {
    /// Create a parse error for the given line.
    pub fn new(line_number: usize, content: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line_number,
            content: content.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Profile Mode
// ============================================================================

/// Counting mode declared in the profile header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    /// Hit counts are 0 or 1.
    Set,
    /// Hit counts are execution counts.
    Count,
    /// Like `Count`, collected with atomic increments.
    Atomic,
}

impl FromStr for ProfileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Self::Set),
            "count" => Ok(Self::Count),
            "atomic" => Ok(Self::Atomic),
            other => Err(format!("unknown profile mode '{}'", other)),
        }
    }
}

impl fmt::Display for ProfileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "set"),
            Self::Count => write!(f, "count"),
            Self::Atomic => write!(f, "atomic"),
        }
    }
}

// ============================================================================
// Statement Record
// ============================================================================

/// One block of statements and its hit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    /// Path of the source file, as written by the coverage tool.
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    /// Number of statements in the block.
    pub num_statements: u32,
    /// Number of times the block executed; 0 means uncovered.
    pub hit_count: u64,
}

impl StatementRecord {
    /// Block position, used to detect duplicate records for the same range.
    #[must_use]
    pub fn block(&self) -> (u32, u32, u32, u32) {
        (self.start_line, self.start_col, self.end_line, self.end_col)
    }

    /// Whether the block ran at least once.
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.hit_count > 0
    }
}

impl fmt::Display for StatementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}.{},{}.{} {} {}",
            self.file,
            self.start_line,
            self.start_col,
            self.end_line,
            self.end_col,
            self.num_statements,
            self.hit_count
        )
    }
}

// ============================================================================
// Coverage Profile
// ============================================================================

/// An ordered, immutable sequence of statement records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageProfile {
    mode: Option<ProfileMode>,
    records: Vec<StatementRecord>,
}

impl CoverageProfile {
    /// Build a profile from already-decoded records.
    #[must_use]
    pub fn new(mode: Option<ProfileMode>, records: Vec<StatementRecord>) -> Self {
        Self { mode, records }
    }

    /// The declared counting mode, if the profile had a header.
    #[must_use]
    pub fn mode(&self) -> Option<ProfileMode> {
        self.mode
    }

    /// Records in the order they appeared.
    #[must_use]
    pub fn records(&self) -> &[StatementRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the profile holds no coverage data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rewrite file paths that start with `prefix` to the remainder.
    ///
    /// Coverage tools report module import paths (`example.com/repo/pkg/a.go`)
    /// while review systems list repository-relative paths (`pkg/a.go`).
    /// Paths without the prefix are left untouched.
    #[must_use]
    pub fn strip_prefix(self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let records = self
            .records
            .into_iter()
            .map(|mut record| {
                if let Some(rest) = record.file.strip_prefix(prefix) {
                    // Only strip whole path components.
                    if prefix.ends_with('/') || rest.starts_with('/') {
                        record.file = rest.trim_start_matches('/').to_string();
                    }
                }
                record
            })
            .collect();
        Self {
            mode: self.mode,
            records,
        }
    }

    /// Append the records of `other` after this profile's records.
    ///
    /// Because aggregation lets a later record supersede an earlier one for
    /// the same block, `other` wins wherever both profiles cover a block.
    #[must_use]
    pub fn merge(mut self, other: CoverageProfile) -> Self {
        self.mode = self.mode.or(other.mode);
        self.records.extend(other.records);
        self
    }

    /// Keep only the records whose file satisfies `keep`.
    #[must_use]
    pub fn retain_files(mut self, keep: impl Fn(&str) -> bool) -> Self {
        self.records.retain(|record| keep(&record.file));
        self
    }
}

/// Renders the profile back in cover-profile text format.
impl fmt::Display for CoverageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(mode) = self.mode {
            writeln!(f, "mode: {}", mode)?;
        }
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        Ok(())
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Longest block, in lines, a record may claim. Aggregation tracks every
/// line a block touches, so a bogus end line would otherwise allocate without
/// bound.
pub const MAX_BLOCK_LINES: u32 = 100_000;

fn record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+):(\d+)\.(\d+),(\d+)\.(\d+) (\d+) (\d+)$")
            .expect("record pattern is a valid regex")
    })
}

/// Parse raw profile text into a [`CoverageProfile`].
///
/// Blank lines are ignored. An optional `mode:` header is accepted as the
/// first non-blank line.
///
/// # Errors
///
/// Returns a [`ParseError`] for the first line that has the wrong number of
/// fields, a non-numeric field, an unknown mode, a misplaced mode header, a
/// block that ends before it starts, or a block longer than
/// [`MAX_BLOCK_LINES`].
pub fn parse_profile(text: &str) -> Result<CoverageProfile, ParseError> {
    let mut mode = None;
    let mut records = Vec::new();
    let mut seen_content = false;

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if let Some(value) = line.strip_prefix("mode:") {
            if seen_content {
                return Err(ParseError::new(
                    line_number,
                    line,
                    "mode header must be the first line",
                ));
            }
            let parsed = value
                .trim()
                .parse::<ProfileMode>()
                .map_err(|reason| ParseError::new(line_number, line, reason))?;
            mode = Some(parsed);
            seen_content = true;
            continue;
        }

        seen_content = true;
        records.push(parse_record(line_number, line)?);
    }

    Ok(CoverageProfile { mode, records })
}

/// Parse a single `path:startLine.startCol,endLine.endCol stmts hits` line.
fn parse_record(line_number: usize, line: &str) -> Result<StatementRecord, ParseError> {
    let fields = line.split_whitespace().count();
    if fields != 3 {
        return Err(ParseError::new(
            line_number,
            line,
            format!("expected 3 space-separated fields, found {}", fields),
        ));
    }

    let caps = record_pattern()
        .captures(line)
        .ok_or_else(|| ParseError::new(line_number, line, "expected path:l.c,l.c n n"))?;

    let number = |i: usize| -> Result<u64, ParseError> {
        caps[i].parse::<u64>().map_err(|e| {
            ParseError::new(line_number, line, format!("invalid number '{}': {}", &caps[i], e))
        })
    };
    let narrow = |i: usize| -> Result<u32, ParseError> {
        u32::try_from(number(i)?).map_err(|_| {
            ParseError::new(line_number, line, format!("number '{}' out of range", &caps[i]))
        })
    };

    let record = StatementRecord {
        file: caps[1].to_string(),
        start_line: narrow(2)?,
        start_col: narrow(3)?,
        end_line: narrow(4)?,
        end_col: narrow(5)?,
        num_statements: narrow(6)?,
        hit_count: number(7)?,
    };

    if (record.end_line, record.end_col) < (record.start_line, record.start_col) {
        return Err(ParseError::new(
            line_number,
            line,
            "block ends before it starts",
        ));
    }

    let span = u64::from(record.end_line) - u64::from(record.start_line) + 1;
    if span > u64::from(MAX_BLOCK_LINES) {
        return Err(ParseError::new(
            line_number,
            line,
            format!("block spans {} lines, limit is {}", span, MAX_BLOCK_LINES),
        ));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_record() {
        let profile = parse_profile("pkg/a.go:10.2,12.16 2 1").unwrap();
        assert_eq!(profile.len(), 1);
        let record = &profile.records()[0];
        assert_eq!(record.file, "pkg/a.go");
        assert_eq!(record.block(), (10, 2, 12, 16));
        assert_eq!(record.num_statements, 2);
        assert_eq!(record.hit_count, 1);
        assert!(record.is_covered());
    }

    #[test]
    fn test_parse_mode_header() {
        let profile = parse_profile("mode: atomic\npkg/a.go:1.1,1.5 1 7\n").unwrap();
        assert_eq!(profile.mode(), Some(ProfileMode::Atomic));
        assert_eq!(profile.records()[0].hit_count, 7);
    }

    #[test]
    fn test_parse_empty_profile_is_valid() {
        let profile = parse_profile("").unwrap();
        assert!(profile.is_empty());
        assert_eq!(profile.mode(), None);

        let header_only = parse_profile("mode: set\n").unwrap();
        assert!(header_only.is_empty());
        assert_eq!(header_only.mode(), Some(ProfileMode::Set));
    }

    #[test]
    fn test_parse_skips_blank_lines_and_crlf() {
        let text = "mode: set\r\n\r\npkg/a.go:1.1,2.2 1 0\r\n\npkg/b.go:3.1,3.9 1 1\r\n";
        let profile = parse_profile(text).unwrap();
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.records()[1].file, "pkg/b.go");
    }

    #[test]
    fn test_parse_path_containing_colon() {
        let profile = parse_profile(r"C:\work\a.go:4.1,6.2 3 0").unwrap();
        assert_eq!(profile.records()[0].file, r"C:\work\a.go");
        assert_eq!(profile.records()[0].start_line, 4);
    }

    #[test]
    fn test_parse_wrong_field_count_reports_line() {
        let text = "mode: set\npkg/a.go:1.1,2.2 1 1\npkg/a.go:3.1,4.2 1\n";
        let err = parse_profile(text).unwrap_err();
        assert_eq!(err.line_number, 3);
        assert_eq!(err.content, "pkg/a.go:3.1,4.2 1");
        assert!(err.reason.contains("3 space-separated fields"));
    }

    #[test]
    fn test_parse_non_numeric_field() {
        let err = parse_profile("pkg/a.go:1.1,2.2 one 1").unwrap_err();
        assert_eq!(err.line_number, 1);

        let err = parse_profile("pkg/a.go:1.x,2.2 1 1").unwrap_err();
        assert_eq!(err.line_number, 1);
    }

    #[test]
    fn test_parse_negative_hit_count_rejected() {
        let err = parse_profile("pkg/a.go:1.1,2.2 1 -1").unwrap_err();
        assert_eq!(err.line_number, 1);
    }

    #[test]
    fn test_parse_unknown_mode() {
        let err = parse_profile("mode: sometimes\n").unwrap_err();
        assert_eq!(err.line_number, 1);
        assert!(err.reason.contains("sometimes"));
    }

    #[test]
    fn test_parse_misplaced_mode_header() {
        let err = parse_profile("pkg/a.go:1.1,2.2 1 1\nmode: set\n").unwrap_err();
        assert_eq!(err.line_number, 2);
    }

    #[test]
    fn test_parse_inverted_block() {
        let err = parse_profile("pkg/a.go:5.1,2.2 1 1").unwrap_err();
        assert!(err.reason.contains("ends before"));
    }

    #[test]
    fn test_parse_rejects_oversized_block() {
        let err = parse_profile("mode: set\npkg/a.go:1.1,4294967295.1 1 0\n").unwrap_err();
        assert_eq!(err.line_number, 2);
        assert!(err.reason.contains("block spans 4294967295 lines"));

        let widest = format!("pkg/a.go:1.1,{}.1 1 0", MAX_BLOCK_LINES);
        assert!(parse_profile(&widest).is_ok());
        let too_wide = format!("pkg/a.go:1.1,{}.1 1 0", MAX_BLOCK_LINES + 1);
        assert!(parse_profile(&too_wide).is_err());
    }

    #[test]
    fn test_record_display_matches_input_format() {
        let line = "pkg/a.go:10.2,12.16 2 1";
        let profile = parse_profile(line).unwrap();
        assert_eq!(profile.records()[0].to_string(), line);
    }

    #[test]
    fn test_strip_prefix() {
        let profile = parse_profile(
            "example.com/repo/pkg/a.go:1.1,2.2 1 1\nother.com/x.go:1.1,2.2 1 1",
        )
        .unwrap()
        .strip_prefix("example.com/repo");
        assert_eq!(profile.records()[0].file, "pkg/a.go");
        assert_eq!(profile.records()[1].file, "other.com/x.go");
    }

    #[test]
    fn test_strip_prefix_respects_path_components() {
        let profile = parse_profile("example.com/repository/a.go:1.1,2.2 1 1")
            .unwrap()
            .strip_prefix("example.com/repo");
        assert_eq!(profile.records()[0].file, "example.com/repository/a.go");
    }

    #[test]
    fn test_merge_appends_later_records() {
        let first = parse_profile("mode: set\npkg/a.go:1.1,2.2 1 0").unwrap();
        let second = parse_profile("pkg/a.go:1.1,2.2 1 1").unwrap();
        let merged = first.merge(second);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.mode(), Some(ProfileMode::Set));
        assert_eq!(merged.records()[1].hit_count, 1);
    }

    #[test]
    fn test_retain_files_renders_as_profile_text() {
        let text = "mode: count\npkg/a.go:1.1,2.2 1 3\npkg/b.go:4.1,5.2 2 0\npkg/a.go:7.1,7.9 1 0\n";
        let kept = parse_profile(text)
            .unwrap()
            .retain_files(|file| file == "pkg/a.go");
        assert_eq!(kept.len(), 2);
        assert_eq!(
            kept.to_string(),
            "mode: count\npkg/a.go:1.1,2.2 1 3\npkg/a.go:7.1,7.9 1 0\n"
        );
        assert_eq!(parse_profile(&kept.to_string()).unwrap(), kept);
    }
}
