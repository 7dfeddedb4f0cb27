// File: crates/chart-pipeline/src/annotate.rs
// Summary: Stages that annotate updates with row totals and min/max envelopes.

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::channel::Channel;
use crate::error::Result;
use crate::record::Record;
use crate::stage::{pass_through_stage, relay, DataStage};
use crate::update::DataUpdate;

/// Extent field under which `WithMinMaxOfRow` stores the shared value range.
pub const ROW_VALUE_FIELD: &str = "value";

/// Sum of the numeric `categories` in `row`.
pub fn row_total(row: &Record, categories: &[String]) -> f64 {
    categories.iter().map(|c| row.number_or_zero(c)).sum()
}

/// Adds a field holding the sum of all category fields in each row.
pub struct WithRowTotal {
    total_key: String,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithRowTotal {
    pub fn new(total_key: impl Into<String>, upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { total_key: total_key.into(), upstream, channel: Channel::new() }
        })
    }

    pub fn total_key(&self) -> &str { &self.total_key }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let data = update
            .data
            .iter()
            .map(|row| {
                let mut row = row.clone();
                let total = row_total(&row, &update.categories);
                row.set(self.total_key.as_str(), total);
                row
            })
            .collect::<Vec<_>>();
        let next = DataUpdate {
            data: Rc::from(data),
            total_key: Some(self.total_key.clone()),
            ..update.clone()
        };
        self.channel.emit(&next)
    }
}

pass_through_stage!(WithRowTotal);

/// Records the earliest and latest key of the current data.
pub struct WithMinMaxKey {
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithMinMaxKey {
    pub fn new(upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let mut extent = update.extent_or_default();
        let keys = update.data.iter().map(|r| r.key);
        extent.key = keys.clone().min().zip(keys.max());
        self.channel.emit(&DataUpdate { extent: Some(extent), ..update.clone() })
    }
}

pass_through_stage!(WithMinMaxKey);

/// Min/max of one numeric field, with optional permanent clamps.
pub struct WithMinMax {
    field: String,
    clamp_min: Cell<Option<f64>>,
    clamp_max: Cell<Option<f64>>,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithMinMax {
    pub fn new(field: impl Into<String>, upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self {
                field: field.into(),
                clamp_min: Cell::new(None),
                clamp_max: Cell::new(None),
                upstream,
                channel: Channel::new(),
            }
        })
    }

    /// From now on report `value` as the minimum. Takes effect on the next update.
    pub fn clamp_min(&self, value: f64) -> &Self {
        self.clamp_min.set(Some(value));
        self
    }

    /// From now on report `value` as the maximum. Takes effect on the next update.
    pub fn clamp_max(&self, value: f64) -> &Self {
        self.clamp_max.set(Some(value));
        self
    }

    pub fn field(&self) -> &str { &self.field }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let (min, max) = numeric_extent(update.data.iter().filter_map(|r| r.number(&self.field)));
        let min = self.clamp_min.get().or(min);
        let max = self.clamp_max.get().or(max);
        trace!(field = %self.field, ?min, ?max, "min/max");
        let mut extent = update.extent_or_default();
        extent.set(&self.field, min, max);
        self.channel.emit(&DataUpdate { extent: Some(extent), ..update.clone() })
    }
}

pass_through_stage!(WithMinMax);

/// Clamp the minimum of `stage` to `value` and hand the stage back for chaining.
pub fn clamped_min(value: f64, stage: Rc<WithMinMax>) -> Rc<WithMinMax> {
    stage.clamp_min(value);
    stage
}

/// Min/max across every category field of every row, stored under [`ROW_VALUE_FIELD`].
pub struct WithMinMaxOfRow {
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithMinMaxOfRow {
    pub fn new(upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let values = update
            .data
            .iter()
            .flat_map(|row| update.categories.iter().filter_map(move |c| row.number(c)));
        let (min, max) = numeric_extent(values);
        let mut extent = update.extent_or_default();
        extent.set(ROW_VALUE_FIELD, min, max);
        self.channel.emit(&DataUpdate { extent: Some(extent), ..update.clone() })
    }
}

pass_through_stage!(WithMinMaxOfRow);

/// Min and max of `values`, ignoring NaN.
pub fn numeric_extent(values: impl Iterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    values.filter(|v| !v.is_nan()).fold((None, None), |(lo, hi), v| {
        (Some(lo.map_or(v, |m: f64| m.min(v))), Some(hi.map_or(v, |m: f64| m.max(v))))
    })
}
