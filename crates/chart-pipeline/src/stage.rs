// File: crates/chart-pipeline/src/stage.rs
// Summary: Stage trait shared by data and graph transforms, plus the wiring helper and a logging stage.

use std::rc::{Rc, Weak};

use tracing::info;

use crate::bucket::TimeBucket;
use crate::channel::{listener, Channel, Listener};
use crate::error::Result;
use crate::update::DataUpdate;

/// A node in a reactive chain.
///
/// `send_update` pulls through the upstream; the recomputed snapshot reaches
/// the listeners registered with `on_update` before `send_update` returns.
pub trait Stage {
    type Output: 'static;

    /// Replace this stage's listeners.
    fn on_update(&self, listeners: Vec<Listener<Self::Output>>);

    fn send_update(&self) -> Result<()>;
}

pub type DataStage = Rc<dyn Stage<Output = DataUpdate>>;

/// Selects a bucket function by position or by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupSelector {
    Index(usize),
    Bucket(TimeBucket),
}

impl From<usize> for GroupSelector {
    fn from(i: usize) -> Self { GroupSelector::Index(i) }
}

impl From<TimeBucket> for GroupSelector {
    fn from(b: TimeBucket) -> Self { GroupSelector::Bucket(b) }
}

/// A stage whose output can be regrouped by time bucket.
pub trait Groupable: Stage<Output = DataUpdate> {
    /// Returns `Ok(false)` when the selection is already active.
    fn group_by(&self, selector: GroupSelector) -> Result<bool>;

    fn group_functions(&self) -> Rc<[TimeBucket]>;
}

/// Register `handle` as the only listener of `upstream`, dispatching to the
/// stage behind `this` for as long as it is alive.
pub(crate) fn relay<U, S, T>(upstream: &U, this: &Weak<S>, handle: fn(&S, &T) -> Result<()>)
where
    U: Stage<Output = T> + ?Sized,
    S: 'static,
    T: 'static,
{
    let this = this.clone();
    upstream.on_update(vec![listener(move |update: &T| match this.upgrade() {
        Some(stage) => handle(&stage, update),
        None => Ok(()),
    })]);
}

/// Implement [`Stage`] for a stage holding `upstream` and `channel` fields,
/// forwarding `send_update` to the upstream. Output defaults to [`DataUpdate`].
macro_rules! pass_through_stage {
    ($ty:ty) => {
        $crate::stage::pass_through_stage!($ty, $crate::update::DataUpdate);
    };
    ($ty:ty, $out:ty) => {
        impl $crate::stage::Stage for $ty {
            type Output = $out;

            fn on_update(&self, listeners: Vec<$crate::channel::Listener<$out>>) {
                self.channel.subscribe(listeners);
            }

            fn send_update(&self) -> $crate::error::Result<()> {
                $crate::stage::Stage::send_update(self.upstream.as_ref())
            }
        }
    };
}
pub(crate) use pass_through_stage;

/// Pass-through stage that logs every pull and every update.
pub struct LoggedStage {
    name: String,
    upstream: DataStage,
    channel: Channel<DataUpdate>,
}

impl LoggedStage {
    pub fn new(name: impl Into<String>, upstream: DataStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { name: name.into(), upstream, channel: Channel::new() }
        })
    }

    fn on_upstream(&self, update: &DataUpdate) -> Result<()> {
        info!(
            stage = %self.name,
            rows = update.data.len(),
            categories = update.categories.len(),
            grouped_by = ?update.grouping.as_ref().map(|g| g.index),
            percentile = ?update.percentile,
            "onUpdate"
        );
        self.channel.emit(update)
    }
}

impl Stage for LoggedStage {
    type Output = DataUpdate;

    fn on_update(&self, listeners: Vec<Listener<DataUpdate>>) { self.channel.subscribe(listeners); }

    fn send_update(&self) -> Result<()> {
        info!(stage = %self.name, "sendUpdate");
        self.upstream.send_update()
    }
}
