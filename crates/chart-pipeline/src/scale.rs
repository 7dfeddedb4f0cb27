// File: crates/chart-pipeline/src/scale.rs
// Summary: Value and time domains fed from pipeline updates, and the per-bucket bar width.

use chrono::{Duration, NaiveDateTime};

use crate::error::{PipelineError, Result};
use crate::update::DataUpdate;

/// Value domain of one field, taken from the `[min, max]` an upstream min/max
/// stage computed for it.
#[derive(Clone, Debug)]
pub struct ValueScale {
    pub field: String,
    pub vmin: f64,
    pub vmax: f64,
}

impl ValueScale {
    pub fn new(field: impl Into<String>) -> Self { Self { field: field.into(), vmin: 0.0, vmax: 1.0 } }

    /// Take the domain from the update's min/max of `field`.
    /// Fails when no min/max stage computed it.
    pub fn update(&mut self, update: &DataUpdate) -> Result<()> {
        let (lo, hi) = update.range_of(&self.field)?;
        self.set_domain(lo, hi);
        Ok(())
    }

    /// A flat domain is widened to one unit.
    pub fn set_domain(&mut self, vmin: f64, vmax: f64) {
        self.vmin = vmin;
        self.vmax = if (vmax - vmin).abs() < 1e-12 { vmin + 1.0 } else { vmax };
    }
}

/// Time scale whose domain spans the data key range rounded up to the end of
/// the last bucket. Tracks the pixel width available to one bucket.
#[derive(Clone, Debug)]
pub struct TimeScale {
    pub width_px: f32,
    pub domain: (NaiveDateTime, NaiveDateTime),
    /// Pixel width of one bar, derived from the bucket count in the domain.
    pub value_size: f32,
    group_size: Duration,
}

impl TimeScale {
    pub fn new(width_px: f32) -> Self {
        Self {
            width_px,
            domain: (NaiveDateTime::default(), NaiveDateTime::default() + Duration::days(1)),
            value_size: 1.0,
            group_size: Duration::days(1),
        }
    }

    /// Domain `[key min, next_floor(key max)]` of the current grouping.
    /// Fails without key min/max or without a grouping stage.
    pub fn update(&mut self, update: &DataUpdate) -> Result<()> {
        let (lo, hi) = update
            .extent
            .as_ref()
            .and_then(|e| e.key)
            .ok_or_else(|| PipelineError::MissingExtent { field: update.key.clone() })?;
        let grouping = update.grouping()?;
        self.group_size = grouping.size();
        self.set_domain(lo, grouping.next_floor(hi));
        Ok(())
    }

    /// Zoom to `[from, to]`, keeping the current bucket size.
    pub fn set_domain(&mut self, from: NaiveDateTime, to: NaiveDateTime) {
        self.domain = (from, to);
        self.value_size = value_size(self.width_px, self.amount_of_groups());
    }

    fn amount_of_groups(&self) -> f64 {
        let span = (self.domain.1 - self.domain.0).num_milliseconds() as f64;
        let group = self.group_size.num_milliseconds().max(1) as f64;
        span / group
    }
}

/// Bar width for `amount` buckets across `width` pixels: one pixel of gap,
/// an extra one for wide bars, never below one pixel.
pub fn value_size(width: f32, amount: f64) -> f32 {
    let amount = if amount > 0.0 { amount } else { 0.000_000_1 };
    let mut result = (width as f64 / amount - 1.0).floor();
    if result > 20.0 {
        result -= 1.0;
    }
    result.max(1.0) as f32
}
