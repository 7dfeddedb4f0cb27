// File: crates/chart-pipeline/tests/moving_average.rs
// Purpose: Trailing moving average windowing, gap filling and insufficient-data cases.

use chart_pipeline::moving_average::default_period;
use chart_pipeline::stack::stack_layers;
use chart_pipeline::{layer_moving_average, moving_average, MeanPoint, Record, TimeBucket};
use chrono::{Duration, NaiveDate, NaiveDateTime};

fn at(d: u32, m: u32, y: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn points(values: &[(NaiveDateTime, f64)], bucket: TimeBucket, period: Option<usize>) -> Vec<MeanPoint> {
    moving_average(values, bucket, |p| p.0, |p| p.1, period)
}

#[test]
fn daily_window_with_zero_filled_gap() {
    let data = [(at(1, 1, 2010), 11.0), (at(3, 1, 2010), 13.0), (at(4, 1, 2010), 5.0)];
    let result = points(&data, TimeBucket::DAY, Some(3));
    assert_eq!(
        result,
        vec![MeanPoint { date: at(3, 1, 2010), mean: 8.0 }, MeanPoint { date: at(4, 1, 2010), mean: 6.0 }]
    );
}

#[test]
fn monthly_window_keys_by_bucket_start() {
    let data = [(at(15, 1, 2010), 10.0), (at(20, 3, 2010), 20.0), (at(2, 4, 2010), 30.0)];
    let result = points(&data, TimeBucket::MONTH, Some(2));
    assert_eq!(
        result,
        vec![
            MeanPoint { date: at(1, 2, 2010), mean: 5.0 },
            MeanPoint { date: at(1, 3, 2010), mean: 10.0 },
            MeanPoint { date: at(1, 4, 2010), mean: 25.0 },
        ]
    );
}

#[test]
fn insufficient_data_yields_nothing() {
    let one = [(at(1, 1, 2010), 1.0)];
    assert!(points(&one, TimeBucket::DAY, Some(2)).is_empty());

    let two = [(at(1, 1, 2010), 1.0), (at(2, 1, 2010), 2.0)];
    assert!(points(&two, TimeBucket::DAY, Some(1)).is_empty());
    assert!(points(&two, TimeBucket::DAY, Some(3)).is_empty());
    // default period of round(2 / 10) = 0 is below two
    assert!(points(&two, TimeBucket::DAY, None).is_empty());
    assert!(points(&[], TimeBucket::DAY, Some(2)).is_empty());
}

#[test]
fn default_period_is_a_tenth_of_the_series() {
    assert_eq!(default_period(3), 0);
    assert_eq!(default_period(15), 2);
    assert_eq!(default_period(40), 4);

    let data: Vec<(NaiveDateTime, f64)> = (0..40).map(|i| (at(1, 1, 2010) + Duration::days(i), 1.0)).collect();
    let result = points(&data, TimeBucket::DAY, None);
    assert_eq!(result.len(), 37);
    assert!(result.iter().all(|p| (p.mean - 1.0).abs() < 1e-12));
}

#[test]
fn incremental_mean_tracks_recomputed_mean() {
    let data: Vec<(NaiveDateTime, f64)> = (0..60)
        .filter(|i| i % 5 != 3)
        .map(|i| (at(1, 1, 2011) + Duration::days(i), ((i * 37) % 23) as f64))
        .collect();
    let period = 7;
    let result = points(&data, TimeBucket::DAY, Some(period));

    let value_on = |d: NaiveDateTime| data.iter().find(|p| p.0 == d).map_or(0.0, |p| p.1);
    assert_eq!(result.len(), 60 - period + 1);
    for p in &result {
        let window: f64 = (0..period as i64).map(|k| value_on(p.date - Duration::days(k))).sum();
        assert!((p.mean - window / period as f64).abs() < 1e-9);
    }
}

#[test]
fn moving_average_of_stacked_layer() {
    let rows: Vec<Record> = (0..4).map(|i| Record::new(at(1, 1, 2010) + Duration::days(i)).with("a", 2.0 * i as f64)).collect();
    let layers = stack_layers(&rows, &["a".to_string()]);
    let result = layer_moving_average(&layers[0], TimeBucket::DAY, Some(2));
    let means: Vec<f64> = result.iter().map(|p| p.mean).collect();
    assert_eq!(means, vec![1.0, 3.0, 5.0]);
}
