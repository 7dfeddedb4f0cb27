use chart_pipeline::grouping::group_rows;
use chart_pipeline::{Record, TimeBucket};
use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, black_box};

fn gen_rows(n: usize, categories: &[String]) -> Vec<Record> {
    let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            categories.iter().enumerate().fold(Record::new(start + Duration::days(i as i64)), |r, (j, c)| {
                r.with(c.as_str(), ((i * 31 + j * 7) % 97) as f64)
            })
        })
        .collect()
}

fn bench_group_rows(c: &mut Criterion) {
    let categories: Vec<String> = (0..8).map(|i| format!("c{i}")).collect();
    let mut group = c.benchmark_group("group_rows");
    for &n in &[1_000usize, 10_000usize] {
        let data = gen_rows(n, &categories);
        for (name, bucket) in [("week", TimeBucket::WEEK), ("month", TimeBucket::MONTH)] {
            group.bench_with_input(BenchmarkId::from_parameter(format!("n{n}_{name}")), &bucket, |b, &bk| {
                b.iter_batched(
                    || data.clone(),
                    |d| { let _ = black_box(group_rows(bk, &d, &categories)); },
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_group_rows);
criterion_main!(benches);
