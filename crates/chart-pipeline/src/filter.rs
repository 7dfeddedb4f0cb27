// File: crates/chart-pipeline/src/filter.rs
// Summary: Row and category filters: percentile outlier cut, first-N categories, category exclusion.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::channel::Channel;
use crate::error::Result;
use crate::record::Record;
use crate::stage::{pass_through_stage, relay, DataStage, Stage};
use crate::update::DataUpdate;

/// Drop every row whose `field` exceeds the value found at rank
/// `round((n - 1) * percentile)` of the rows sorted by `field`.
///
/// NaN values are ignored and their rows kept, like non-numeric ones.
/// Returns `None` when nothing is filtered (percentile >= 1, or no numeric values),
/// so callers can keep sharing the input slice.
pub fn filter_by_percentile(data: &[Record], field: &str, percentile: f64) -> Option<Vec<Record>> {
    if percentile >= 1.0 {
        return None;
    }
    let mut values: Vec<f64> = data.iter().filter_map(|r| r.number(field)).filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let rank = ((values.len() - 1) as f64 * percentile.max(0.0)).round() as usize;
    let threshold = values[rank.min(values.len() - 1)];
    Some(
        data.iter()
            .filter(|r| r.number(field).map_or(true, |v| v.is_nan() || v <= threshold))
            .cloned()
            .collect(),
    )
}

/// Hides outlier rows by percentile of one field. Starts unfiltered (1.0).
pub struct FilteredByPercentile {
    field: String,
    percentile: Cell<f64>,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl FilteredByPercentile {
    pub fn new(field: impl Into<String>, upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { field: field.into(), percentile: Cell::new(1.0), upstream, channel: Channel::new() }
        })
    }

    pub fn percentile(&self) -> f64 { self.percentile.get() }

    /// Set the percentile (clamped to `[0, 1]`) and re-broadcast.
    pub fn set_percentile(&self, value: f64) -> Result<()> {
        let value = if value.is_nan() { 1.0 } else { value.clamp(0.0, 1.0) };
        debug!(field = %self.field, percentile = value, "set percentile");
        self.percentile.set(value);
        self.send_update()
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let percentile = self.percentile.get();
        let data = match filter_by_percentile(&update.data, &self.field, percentile) {
            Some(rows) => Rc::from(rows),
            None => Rc::clone(&update.data),
        };
        self.channel.emit(&DataUpdate { data, percentile: Some(percentile), ..update.clone() })
    }
}

pass_through_stage!(FilteredByPercentile);

/// Keeps only the first `amount` categories.
pub struct WithFirstCategories {
    amount: usize,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithFirstCategories {
    pub fn new(amount: usize, upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { amount, upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let categories = update.categories.iter().take(self.amount).cloned().collect();
        self.channel.emit(&DataUpdate { categories, ..update.clone() })
    }
}

pass_through_stage!(WithFirstCategories);

/// Removes user-excluded categories. Exclusions accumulate until cleared.
pub struct WithCategoryExclusion {
    excluded: RefCell<Vec<String>>,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithCategoryExclusion {
    pub fn new(upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { excluded: RefCell::new(Vec::new()), upstream, channel: Channel::new() }
        })
    }

    pub fn excluded(&self) -> Vec<String> { self.excluded.borrow().clone() }

    pub fn exclude_category(&self, category: impl Into<String>) -> Result<()> {
        self.excluded.borrow_mut().push(category.into());
        self.send_update()
    }

    pub fn clear_category_exclusions(&self) -> Result<()> {
        self.excluded.borrow_mut().clear();
        self.send_update()
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let categories = {
            let excluded = self.excluded.borrow();
            update.categories.iter().filter(|c| !excluded.contains(c)).cloned().collect()
        };
        self.channel.emit(&DataUpdate { categories, ..update.clone() })
    }
}

pass_through_stage!(WithCategoryExclusion);
