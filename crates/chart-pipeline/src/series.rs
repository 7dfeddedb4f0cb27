// File: crates/chart-pipeline/src/series.rs
// Summary: Per-category line series derived from the current rows.

use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::channel::Channel;
use crate::error::Result;
use crate::record::Record;
use crate::stage::{pass_through_stage, relay, DataStage};
use crate::update::DataUpdate;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesPoint {
    pub key: NaiveDateTime,
    /// `None` for missing or non-numeric cells.
    pub value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategorySeries {
    pub category: String,
    pub values: Vec<SeriesPoint>,
}

impl CategorySeries {
    /// Numeric points only, as `(key, value)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.values.iter().filter_map(|p| p.value.map(|v| (p.key, v)))
    }
}

pub fn category_series(data: &[Record], categories: &[String]) -> Vec<CategorySeries> {
    categories
        .iter()
        .map(|category| CategorySeries {
            category: category.clone(),
            values: data.iter().map(|r| SeriesPoint { key: r.key, value: r.number(category) }).collect(),
        })
        .collect()
}

/// Adds `series_data`, one series per category.
pub struct WithSeriesData {
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithSeriesData {
    pub fn new(upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let series = category_series(&update.data, &update.categories);
        self.channel.emit(&DataUpdate { series_data: Some(Rc::from(series)), ..update.clone() })
    }
}

pass_through_stage!(WithSeriesData);
