// File: crates/chart-pipeline/src/grouping.rs
// Summary: Time-bucket aggregation of rows, the regrouping stage, and auto-grouping on first update.

use std::cell::Cell;
use std::rc::Rc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::bucket::TimeBucket;
use crate::channel::Channel;
use crate::error::{PipelineError, Result};
use crate::record::{Record, Value};
use crate::stage::{pass_through_stage, relay, DataStage, GroupSelector, Groupable, Stage};
use crate::update::{DataUpdate, Grouping};

/// Index of the finest bucket function; data at this index passes through unchanged.
pub const DEFAULT_GROUP_INDEX: usize = 0;

/// Sum `categories` of every row sharing a bucket.
/// Each output row is keyed by the bucket start; buckets keep first-seen order.
/// Per-category totals are preserved; textual cells count as zero.
pub fn group_rows(bucket: TimeBucket, data: &[Record], categories: &[String]) -> Vec<Record> {
    let mut groups: IndexMap<NaiveDateTime, Record> = IndexMap::new();
    for row in data {
        let start = bucket.floor(row.key);
        let group = groups.entry(start).or_insert_with(|| {
            let mut r = Record::new(start);
            for c in categories {
                r.set(c.as_str(), 0.0);
            }
            r
        });
        for c in categories {
            let sum = group.number_or_zero(c) + row.number_or_zero(c);
            group.set(c.as_str(), Value::Number(sum));
        }
    }
    groups.into_values().collect()
}

/// Regroups upstream data by one of several bucket functions.
pub struct GroupedBy {
    functions: Rc<[TimeBucket]>,
    index: Cell<usize>,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl GroupedBy {
    /// `functions` go from finest to coarsest; the first one is the pass-through default.
    pub fn new(functions: Vec<TimeBucket>, upstream: DataStage) -> Result<Rc<Self>> {
        if functions.is_empty() {
            return Err(PipelineError::Config("grouping requires at least one bucket function".into()));
        }
        Ok(Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self {
                functions: Rc::from(functions),
                index: Cell::new(DEFAULT_GROUP_INDEX),
                upstream,
                channel: Channel::new(),
            }
        }))
    }

    pub fn group_by_index(&self) -> usize { self.index.get() }

    fn resolve(&self, selector: GroupSelector) -> Result<usize> {
        match selector {
            GroupSelector::Index(i) if i < self.functions.len() => Ok(i),
            GroupSelector::Index(i) => {
                Err(PipelineError::GroupIndexOutOfRange { index: i, len: self.functions.len() })
            }
            GroupSelector::Bucket(b) => self
                .functions
                .iter()
                .position(|f| *f == b)
                .ok_or(PipelineError::UnknownBucket(b)),
        }
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        let index = self.index.get();
        let data = if index == DEFAULT_GROUP_INDEX {
            Rc::clone(&update.data)
        } else {
            Rc::from(group_rows(self.functions[index], &update.data, &update.categories))
        };
        trace!(index, rows_in = update.data.len(), rows_out = data.len(), "grouped update");
        let next = DataUpdate {
            data,
            grouping: Some(Grouping { index, functions: Rc::clone(&self.functions) }),
            ..update.clone()
        };
        self.channel.emit(&next)
    }
}

pass_through_stage!(GroupedBy);

impl Groupable for GroupedBy {
    fn group_by(&self, selector: GroupSelector) -> Result<bool> {
        let index = self.resolve(selector)?;
        if index == self.index.get() {
            return Ok(false);
        }
        debug!(from = self.index.get(), to = index, "group by");
        self.index.set(index);
        self.send_update()?;
        Ok(true)
    }

    fn group_functions(&self) -> Rc<[TimeBucket]> { Rc::clone(&self.functions) }
}

/// On the first update only, picks the finest bucket function that spans the
/// key range in fewer than `threshold` buckets and regroups by it.
///
/// Requires an upstream key min/max stage. `grouping` is the stage that owns
/// the bucket choice; it usually sits further up the same chain.
pub struct AutoGroupOnFirstUpdate {
    threshold: usize,
    ran_once: Cell<bool>,
    grouping: Rc<dyn Groupable>,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl AutoGroupOnFirstUpdate {
    pub fn new(threshold: usize, grouping: Rc<dyn Groupable>, upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { threshold, ran_once: Cell::new(false), grouping, upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        if self.ran_once.get() {
            return self.channel.emit(update);
        }

        let extent = update
            .extent
            .as_ref()
            .ok_or_else(|| PipelineError::MissingExtent { field: update.key.clone() })?;
        self.ran_once.set(true);
        let functions = match &update.grouping {
            Some(g) => Rc::clone(&g.functions),
            None => self.grouping.group_functions(),
        };
        let chosen = match extent.key {
            Some((min, max)) => first_bucket_below(self.threshold, &functions, min, max)
                .or_else(|| functions.last().copied()),
            None => functions.first().copied(),
        };

        let Some(bucket) = chosen else { return self.channel.emit(update) };
        debug!(threshold = self.threshold, ?bucket, "auto group");
        if self.grouping.group_by(bucket.into())? {
            // The regroup already re-broadcast through this stage.
            Ok(())
        } else {
            self.channel.emit(update)
        }
    }
}

pass_through_stage!(AutoGroupOnFirstUpdate);

/// First bucket function needing fewer than `threshold` steps to get from `min` past `max`.
pub fn first_bucket_below(
    threshold: usize,
    functions: &[TimeBucket],
    min: NaiveDateTime,
    max: NaiveDateTime,
) -> Option<TimeBucket> {
    functions.iter().copied().find(|b| {
        let mut count = 0;
        let mut value = min;
        while value < max && count < threshold {
            value = b.next_floor(value);
            count += 1;
        }
        count < threshold
    })
}
