// File: crates/chart-pipeline/src/stack.rs
// Summary: Stacked layout of category series (each layer sits on the sum of the ones before it).

use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::channel::Channel;
use crate::error::Result;
use crate::record::Record;
use crate::stage::{pass_through_stage, relay, DataStage};
use crate::update::DataUpdate;

#[derive(Clone, Debug, PartialEq)]
pub struct StackedPoint {
    pub x: NaiveDateTime,
    pub y: f64,
    /// Sum of `y` of all earlier layers at this position.
    pub y0: f64,
    pub category: String,
}

impl StackedPoint {
    /// Upper edge of the bar segment.
    pub fn top(&self) -> f64 { self.y0 + self.y }
}

/// One category's stacked series.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub category: String,
    pub points: Vec<StackedPoint>,
}

/// Stack `categories` of `data` in order. Missing or textual cells stack as zero.
/// Empty data yields no layers at all.
pub fn stack_layers(data: &[Record], categories: &[String]) -> Vec<Layer> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut baseline = vec![0.0; data.len()];
    categories
        .iter()
        .map(|category| {
            let points = data
                .iter()
                .zip(baseline.iter_mut())
                .map(|(row, y0)| {
                    let y = row.number_or_zero(category);
                    let point = StackedPoint { x: row.key, y, y0: *y0, category: category.clone() };
                    *y0 += y;
                    point
                })
                .collect();
            Layer { category: category.clone(), points }
        })
        .collect()
}

/// Adds `data_stacked` to every update.
pub struct WithStackedData {
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithStackedData {
    pub fn new(upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let layers = stack_layers(&update.data, &update.categories);
        self.channel.emit(&DataUpdate { data_stacked: Some(Rc::from(layers)), ..update.clone() })
    }
}

pass_through_stage!(WithStackedData);
