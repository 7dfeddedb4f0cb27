// File: crates/chart-pipeline/src/moving_average.rs
// Summary: Trailing moving average over a gap-filled, bucketed time series.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::bucket::TimeBucket;
use crate::stack::Layer;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanPoint {
    pub date: NaiveDateTime,
    pub mean: f64,
}

/// Period used when none is given: a tenth of the series, rounded.
pub fn default_period(len: usize) -> usize { (len as f64 / 10.0).round() as usize }

/// Moving average of `series` with one output point per bucket from the
/// `period`-th bucket on.
///
/// Buckets run from the bucket of the first item through the bucket of the
/// last one; buckets without items count as zero. The mean is updated
/// incrementally (`mean += (entering - leaving) / period`).
///
/// Returns an empty vec for fewer than two items, a period below two,
/// or fewer buckets than `period`.
pub fn moving_average<T>(
    series: &[T],
    bucket: TimeBucket,
    get_key: impl Fn(&T) -> NaiveDateTime,
    get_value: impl Fn(&T) -> f64,
    period: Option<usize>,
) -> Vec<MeanPoint> {
    if series.len() < 2 {
        return Vec::new();
    }
    let period = period.unwrap_or_else(|| default_period(series.len()));
    if period < 2 {
        return Vec::new();
    }
    let (Some(first), Some(last)) = (series.first(), series.last()) else { return Vec::new() };
    let dates = bucket.range(get_key(first), get_key(last));
    if dates.len() < period {
        return Vec::new();
    }

    let mut values: HashMap<NaiveDateTime, f64> = dates.iter().map(|d| (*d, 0.0)).collect();
    for item in series {
        values.insert(bucket.floor(get_key(item)), get_value(item));
    }
    let value_at = |d: &NaiveDateTime| values.get(d).copied().unwrap_or(0.0);

    let p = period as f64;
    let mut mean = dates[..period].iter().map(value_at).sum::<f64>() / p;
    let mut out = Vec::with_capacity(dates.len() - period + 1);
    out.push(MeanPoint { date: dates[period - 1], mean });
    for i in period..dates.len() {
        mean += (value_at(&dates[i]) - value_at(&dates[i - period])) / p;
        out.push(MeanPoint { date: dates[i], mean });
    }
    out
}

/// Moving average of one stacked layer's `y` values.
pub fn layer_moving_average(layer: &Layer, bucket: TimeBucket, period: Option<usize>) -> Vec<MeanPoint> {
    moving_average(&layer.points, bucket, |p| p.x, |p| p.y, period)
}
