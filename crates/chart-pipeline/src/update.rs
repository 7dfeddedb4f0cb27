// File: crates/chart-pipeline/src/update.rs
// Summary: The snapshot every data stage broadcasts, plus the typed annotations stages attach to it.
// Notes:
// - Stages copy the incoming update and set only the fields they own, so a field
//   added upstream survives any reordering of the chain.
// - Optional fields are `None` when the contributing stage is not composed.

use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::bucket::TimeBucket;
use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::series::CategorySeries;
use crate::stack::Layer;

/// Min/max envelope of the current (possibly filtered) data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extent {
    /// Earliest and latest key; `None` until a key min/max stage sees data.
    pub key: Option<(NaiveDateTime, NaiveDateTime)>,
    pub min: BTreeMap<String, f64>,
    pub max: BTreeMap<String, f64>,
}

impl Extent {
    pub fn key_min(&self) -> Option<NaiveDateTime> { self.key.map(|(lo, _)| lo) }

    pub fn key_max(&self) -> Option<NaiveDateTime> { self.key.map(|(_, hi)| hi) }

    /// `[min, max]` of `field`, if both were computed.
    pub fn range_of(&self, field: &str) -> Option<(f64, f64)> {
        Some((*self.min.get(field)?, *self.max.get(field)?))
    }

    pub(crate) fn set(&mut self, field: &str, min: Option<f64>, max: Option<f64>) {
        match min {
            Some(v) => { self.min.insert(field.to_string(), v); }
            None => { self.min.remove(field); }
        }
        match max {
            Some(v) => { self.max.insert(field.to_string(), v); }
            None => { self.max.remove(field); }
        }
    }
}

/// Which bucket function the data is currently grouped by.
#[derive(Clone, Debug, PartialEq)]
pub struct Grouping {
    pub index: usize,
    pub functions: Rc<[TimeBucket]>,
}

impl Grouping {
    pub fn bucket(&self) -> TimeBucket { self.functions[self.index] }

    pub fn floor(&self, t: NaiveDateTime) -> NaiveDateTime { self.bucket().floor(t) }

    pub fn next_floor(&self, t: NaiveDateTime) -> NaiveDateTime { self.bucket().next_floor(t) }

    pub fn size(&self) -> chrono::Duration { self.bucket().size() }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataUpdate {
    pub data: Rc<[Record]>,
    /// Name of the key column (e.g. "date").
    pub key: String,
    /// Category fields in stacking/legend order.
    pub categories: Vec<String>,
    pub extent: Option<Extent>,
    pub grouping: Option<Grouping>,
    pub percentile: Option<f64>,
    pub total_key: Option<String>,
    pub data_stacked: Option<Rc<[Layer]>>,
    pub series_data: Option<Rc<[CategorySeries]>>,
    pub data_source_index: Option<usize>,
}

impl DataUpdate {
    pub fn new(data: Rc<[Record]>, key: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            data,
            key: key.into(),
            categories,
            extent: None,
            grouping: None,
            percentile: None,
            total_key: None,
            data_stacked: None,
            series_data: None,
            data_source_index: None,
        }
    }

    /// Copy of this update carrying `data` instead.
    pub fn with_data(&self, data: Vec<Record>) -> Self {
        Self { data: Rc::from(data), ..self.clone() }
    }

    /// The extent, or an empty one to be filled in by a min/max stage.
    pub(crate) fn extent_or_default(&self) -> Extent { self.extent.clone().unwrap_or_default() }

    pub fn stacked(&self) -> Result<&[Layer]> {
        self.data_stacked.as_deref().ok_or(PipelineError::MissingStackedData)
    }

    /// Stacked layer for `category`.
    pub fn layer(&self, category: &str) -> Result<&Layer> {
        self.stacked()?
            .iter()
            .find(|layer| layer.category == category)
            .ok_or_else(|| PipelineError::UnknownCategory(category.to_string()))
    }

    pub fn grouping(&self) -> Result<&Grouping> {
        self.grouping.as_ref().ok_or(PipelineError::MissingGrouping)
    }

    pub fn range_of(&self, field: &str) -> Result<(f64, f64)> {
        self.extent
            .as_ref()
            .and_then(|e| e.range_of(field))
            .ok_or_else(|| PipelineError::MissingExtent { field: field.to_string() })
    }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}
