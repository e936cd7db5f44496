//! Property tests for parsing, aggregation and the delta verdict.

use covdelta::{aggregate, parse_profile, ConcernedFiles, GroupChanges, ReportFormatter, Threshold};
use proptest::prelude::*;
use std::collections::BTreeSet;

const FILES: [&str; 4] = ["a.go", "pkg/b.go", "pkg/c.go", "cmd/main.go"];

/// One statement block: (file index, start line, extra lines, statements, hits).
fn block() -> impl Strategy<Value = (usize, u32, u32, u32, u64)> {
    (0..FILES.len(), 1u32..40, 0u32..3, 0u32..4, 0u64..3)
}

fn profile_text(blocks: &[(usize, u32, u32, u32, u64)]) -> String {
    let mut text = String::from("mode: count\n");
    for &(file, start, extra, stmts, hits) in blocks {
        text.push_str(&format!(
            "{}:{}.2,{}.10 {} {}\n",
            FILES[file],
            start,
            start + extra,
            stmts,
            hits
        ));
    }
    text
}

fn group_of(text: &str, threshold: Threshold) -> covdelta::CoverageGroup {
    let profile = parse_profile(text).unwrap();
    aggregate(&profile, None, threshold).into_group_or_empty(threshold)
}

proptest! {
    #[test]
    fn prop_aggregation_is_deterministic(blocks in prop::collection::vec(block(), 0..30)) {
        let text = profile_text(&blocks);
        let t = Threshold::new(50).unwrap();
        prop_assert_eq!(group_of(&text, t), group_of(&text, t));
    }

    #[test]
    fn prop_report_is_deterministic(
        base in prop::collection::vec(block(), 0..20),
        new in prop::collection::vec(block(), 0..20),
    ) {
        let t = Threshold::new(60).unwrap();
        let (b, n) = (group_of(&profile_text(&base), t), group_of(&profile_text(&new), t));
        let first = ReportFormatter::default().format(&GroupChanges::compute(&b, &n), None);
        let second = ReportFormatter::default().format(&GroupChanges::compute(&b, &n), None);
        prop_assert_eq!(first.text, second.text);
    }

    #[test]
    fn prop_percentages_in_range(blocks in prop::collection::vec(block(), 0..30)) {
        let group = group_of(&profile_text(&blocks), Threshold::new(50).unwrap());
        prop_assert!((0.0..=100.0).contains(&group.percentage()));
        for coverage in group.files().values() {
            prop_assert!((0.0..=100.0).contains(&coverage.percentage));
            prop_assert!(coverage.covered_lines <= coverage.total_lines);
            prop_assert_eq!(
                coverage.covered_line_numbers.len() + coverage.uncovered_line_numbers.len(),
                coverage.total_lines
            );
        }
    }

    #[test]
    fn prop_threshold_monotonic(blocks in prop::collection::vec(block(), 0..30), lo in 0u32..=100, hi in 0u32..=100) {
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        let text = profile_text(&blocks);
        let at_lo = group_of(&text, Threshold::new(lo).unwrap());
        let at_hi = group_of(&text, Threshold::new(hi).unwrap());
        if at_hi.threshold_pass() {
            prop_assert!(at_lo.threshold_pass());
        }
    }

    #[test]
    fn prop_filter_keeps_intersection(
        blocks in prop::collection::vec(block(), 0..30),
        picked in prop::collection::btree_set(0..FILES.len(), 0..=FILES.len()),
    ) {
        let profile = parse_profile(&profile_text(&blocks)).unwrap();
        let concerned = ConcernedFiles::from_paths(picked.iter().map(|&i| FILES[i]));
        let t = Threshold::new(50).unwrap();

        let in_profile: BTreeSet<&str> = blocks.iter().map(|b| FILES[b.0]).collect();
        let expected: BTreeSet<&str> = in_profile
            .into_iter()
            .filter(|f| concerned.contains(f))
            .collect();

        let result = aggregate(&profile, Some(&concerned), t);
        match result.group() {
            Some(group) => {
                let got: BTreeSet<&str> = group.files().keys().map(String::as_str).collect();
                prop_assert_eq!(got, expected);
            }
            None => prop_assert!(expected.is_empty()),
        }
    }

    #[test]
    fn prop_self_comparison_is_unchanged(blocks in prop::collection::vec(block(), 0..30)) {
        let t = Threshold::new(80).unwrap();
        let group = group_of(&profile_text(&blocks), t);
        let changes = GroupChanges::compute(&group, &group);
        prop_assert!(changes.is_unchanged());
        prop_assert!(!changes.is_coverage_low());
        prop_assert!(changes.newly_uncovered().is_empty());
    }
}
