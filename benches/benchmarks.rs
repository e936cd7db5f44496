//! Benchmarks for the coverage engine.
//!
//! Measures parsing, aggregation and delta computation on synthetic
//! profiles of increasing size.
//!
//! ```bash
//! cargo bench
//! cargo bench -- --save-baseline main
//! cargo bench -- --baseline main
//! ```

use covdelta::{aggregate, parse_profile, GroupChanges, ReportFormatter, Threshold};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// A profile of `files` files with 200 two-line blocks each. `seed` shifts
/// which blocks are unhit so base and candidate differ.
fn synthetic_profile(files: usize, seed: usize) -> String {
    let mut text = String::from("mode: count\n");
    for f in 0..files {
        for b in 0..200 {
            let start = b * 3 + 1;
            let hits = usize::from((b + f + seed) % 7 != 0);
            text.push_str(&format!(
                "example.com/repo/pkg{}/file{}.go:{}.2,{}.40 2 {}\n",
                f / 10,
                f,
                start,
                start + 1,
                hits
            ));
        }
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_profile");
    for files in [10, 100, 500] {
        let text = synthetic_profile(files, 0);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), &text, |b, text| {
            b.iter(|| parse_profile(black_box(text)).unwrap());
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let threshold = Threshold::new(50).unwrap();
    let mut group = c.benchmark_group("aggregate");
    for files in [10, 100, 500] {
        let profile = parse_profile(&synthetic_profile(files, 0)).unwrap();
        group.throughput(Throughput::Elements(profile.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), &profile, |b, profile| {
            b.iter(|| aggregate(black_box(profile), None, threshold));
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let threshold = Threshold::new(50).unwrap();
    let mut group = c.benchmark_group("parse_aggregate_delta");
    for files in [10, 100] {
        let base = synthetic_profile(files, 0);
        let candidate = synthetic_profile(files, 3);
        group.bench_with_input(
            BenchmarkId::from_parameter(files),
            &(base, candidate),
            |b, (base, candidate)| {
                b.iter(|| {
                    let old = aggregate(&parse_profile(base).unwrap(), None, threshold)
                        .into_group_or_empty(threshold);
                    let new = aggregate(&parse_profile(candidate).unwrap(), None, threshold)
                        .into_group_or_empty(threshold);
                    let changes = GroupChanges::compute(&old, &new);
                    black_box(ReportFormatter::default().format(&changes, None))
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_aggregate, bench_end_to_end);
criterion_main!(benches);
