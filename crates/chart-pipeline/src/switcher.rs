// File: crates/chart-pipeline/src/switcher.rs
// Summary: Switching between sibling pipelines, and treating pre-grouped siblings as group choices.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::bucket::TimeBucket;
use crate::channel::{Channel, Listener};
use crate::error::{PipelineError, Result};
use crate::stage::{pass_through_stage, relay, DataStage, GroupSelector, Groupable, Stage};
use crate::update::{DataUpdate, Grouping};

/// Relays exactly one of several sibling pipelines at a time.
///
/// Only the active child is pulled on `send_update`, so only its update
/// reaches listeners. Every relayed update is tagged with the active index.
pub struct DataSourceSwitcher {
    sources: Vec<DataStage>,
    index: Cell<usize>,
    channel: Channel<DataUpdate>,
}

impl DataSourceSwitcher {
    pub fn new(sources: Vec<DataStage>) -> Result<Rc<Self>> {
        if sources.is_empty() {
            return Err(PipelineError::Config("switcher requires at least one data source".into()));
        }
        Ok(Rc::new_cyclic(|this| {
            for source in &sources {
                relay(source.as_ref(), this, Self::on_child);
            }
            Self { sources, index: Cell::new(0), channel: Channel::new() }
        }))
    }

    pub fn data_source_index(&self) -> usize { self.index.get() }

    pub fn len(&self) -> usize { self.sources.len() }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    /// Activate source `index` and pull it.
    pub fn set_data_source_index(&self, index: usize) -> Result<()> {
        if index >= self.sources.len() {
            return Err(PipelineError::DataSourceIndexOutOfRange { index, len: self.sources.len() });
        }
        debug!(from = self.index.get(), to = index, "switch data source");
        self.index.set(index);
        self.send_update()
    }

    fn on_child(&self, update: &DataUpdate) -> Result<()> {
        self.channel.emit(&DataUpdate { data_source_index: Some(self.index.get()), ..update.clone() })
    }
}

impl Stage for DataSourceSwitcher {
    type Output = DataUpdate;

    fn on_update(&self, listeners: Vec<Listener<DataUpdate>>) { self.channel.subscribe(listeners); }

    fn send_update(&self) -> Result<()> { self.sources[self.index.get()].send_update() }
}

/// Treats the switcher's siblings as the same data pre-grouped by each of
/// `functions`, so grouping means switching the active source.
pub struct WithDataSourceIndexAsGroup {
    functions: Rc<[TimeBucket]>,
    switcher: Rc<DataSourceSwitcher>,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl WithDataSourceIndexAsGroup {
    /// `functions[i]` must describe how source `i` was grouped.
    pub fn new(functions: Vec<TimeBucket>, switcher: Rc<DataSourceSwitcher>) -> Result<Rc<Self>> {
        if functions.len() != switcher.len() {
            return Err(PipelineError::Config(format!(
                "{} group functions for {} data sources",
                functions.len(),
                switcher.len()
            )));
        }
        let upstream: DataStage = switcher.clone();
        Ok(Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { functions: Rc::from(functions), switcher, upstream, channel: Channel::new() }
        }))
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let index = update.data_source_index.unwrap_or_else(|| self.switcher.data_source_index());
        if index >= self.functions.len() {
            return Err(PipelineError::GroupIndexOutOfRange { index, len: self.functions.len() });
        }
        let grouping = Grouping { index, functions: Rc::clone(&self.functions) };
        self.channel.emit(&DataUpdate { grouping: Some(grouping), ..update.clone() })
    }
}

pass_through_stage!(WithDataSourceIndexAsGroup);

impl Groupable for WithDataSourceIndexAsGroup {
    fn group_by(&self, selector: GroupSelector) -> Result<bool> {
        let index = match selector {
            GroupSelector::Index(i) => i,
            GroupSelector::Bucket(b) => self
                .functions
                .iter()
                .position(|f| *f == b)
                .ok_or(PipelineError::UnknownBucket(b))?,
        };
        if index == self.switcher.data_source_index() {
            return Ok(false);
        }
        self.switcher.set_data_source_index(index)?;
        Ok(true)
    }

    fn group_functions(&self) -> Rc<[TimeBucket]> { Rc::clone(&self.functions) }
}
