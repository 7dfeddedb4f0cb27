// File: crates/chart-pipeline/src/graph_filter.rs
// Summary: Graph stages: node selection, node removal, cluster size and link strength filters.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::channel::{listener, Channel};
use crate::config::GraphConfig;
use crate::error::Result;
use crate::graph::{GraphData, GraphStage, NodeId};
use crate::stage::{pass_through_stage, relay, Stage};

pub const DEFAULT_MIN_NODE_CLUSTER_SIZE: usize = 2;
pub const DEFAULT_MIN_LINK_STRENGTH: f64 = -1.0;
pub const DEFAULT_ADJUST_START: f64 = 7.0;
pub const DEFAULT_ADJUST_STEP: f64 = 2.0;

/// How a selected node expands into the highlighted set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMode {
    /// The node and its direct neighbors.
    Neighbors,
    /// Every node in the node's cluster.
    Cluster,
}

/// Tracks one selected node and reports the related nodes with each update.
pub struct WithNodeSelection {
    mode: SelectionMode,
    selected: Cell<Option<NodeId>>,
    is_selection_update: Cell<bool>,
    upstream: GraphStage,
    channel: Channel<GraphData>,
}

impl WithNodeSelection {
    pub fn new(mode: SelectionMode, upstream: GraphStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self {
                mode,
                selected: Cell::new(None),
                is_selection_update: Cell::new(false),
                upstream,
                channel: Channel::new(),
            }
        })
    }

    pub fn neighbors(upstream: GraphStage) -> Rc<Self> { Self::new(SelectionMode::Neighbors, upstream) }

    pub fn cluster(upstream: GraphStage) -> Rc<Self> { Self::new(SelectionMode::Cluster, upstream) }

    pub fn selected_node(&self) -> Option<NodeId> { self.selected.get() }

    pub fn select_related_nodes(&self, node: Option<NodeId>) -> Result<()> {
        self.selected.set(node);
        self.is_selection_update.set(true);
        self.send_update()
    }

    pub fn clear_node_selection(&self) -> Result<()> { self.select_related_nodes(None) }

    fn on_upstream(&self, graph: &GraphData) -> Result<()> {
        let selected_nodes = match self.selected.get() {
            Some(id) if graph.contains(id) => match self.mode {
                SelectionMode::Neighbors => graph.neighbors_of(id),
                SelectionMode::Cluster => graph.find_nodes_in_cluster_with(id),
            },
            _ => Vec::new(),
        };
        let next = GraphData {
            selected_nodes,
            is_selection_update: self.is_selection_update.replace(false),
            ..graph.clone()
        };
        self.channel.emit(&next)
    }
}

pass_through_stage!(WithNodeSelection, GraphData);

/// Hides user-removed nodes (and their links) until the removal is undone.
pub struct WithRemovedNodes {
    removed: RefCell<Vec<NodeId>>,
    remove_cluster_with: Cell<Option<NodeId>>,
    upstream: GraphStage,
    channel: Channel<GraphData>,
}

impl WithRemovedNodes {
    pub fn new(upstream: GraphStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self {
                removed: RefCell::new(Vec::new()),
                remove_cluster_with: Cell::new(None),
                upstream,
                channel: Channel::new(),
            }
        })
    }

    pub fn removed_nodes(&self) -> Vec<NodeId> { self.removed.borrow().clone() }

    pub fn remove_node(&self, node: NodeId) -> Result<()> {
        self.removed.borrow_mut().push(node);
        self.send_update()
    }

    /// Remove `node` together with everything in its cluster.
    pub fn remove_nodes_in_cluster_with(&self, node: NodeId) -> Result<()> {
        self.remove_cluster_with.set(Some(node));
        self.send_update()
    }

    /// Restore every removed node. Does nothing if none were removed.
    pub fn undo_node_removal(&self) -> Result<()> {
        if self.removed.borrow().is_empty() {
            return Ok(());
        }
        self.removed.borrow_mut().clear();
        self.send_update()
    }

    fn on_upstream(&self, graph: &GraphData) -> Result<()> {
        let mut graph = graph.clone();
        remove_nodes(&mut graph, &self.removed.borrow());
        if let Some(node) = self.remove_cluster_with.take() {
            let cluster = graph.find_nodes_in_cluster_with(node);
            remove_nodes(&mut graph, &cluster);
            self.removed.borrow_mut().extend(cluster);
        }
        self.channel.emit(&graph)
    }
}

pass_through_stage!(WithRemovedNodes, GraphData);

fn remove_nodes(graph: &mut GraphData, removed: &[NodeId]) {
    if removed.is_empty() {
        return;
    }
    graph.nodes.retain(|n| !removed.contains(&n.id));
    graph.retain_links_between_nodes();
}

/// Nodes whose cluster has at least `min_cluster_size` members, grouped by cluster.
pub fn nodes_in_clusters_of_at_least(min_cluster_size: usize, graph: &GraphData) -> Vec<NodeId> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    for node in &graph.nodes {
        if visited.contains(&node.id) {
            continue;
        }
        let cluster = graph.find_nodes_in_cluster_with(node.id);
        if cluster.len() >= min_cluster_size {
            out.extend(cluster.iter().copied());
        }
        visited.extend(cluster);
    }
    out
}

/// Keeps only nodes in clusters of at least the configured size.
pub struct WithNodeClusterSizeFilter {
    min_cluster_size: Cell<usize>,
    upstream: GraphStage,
    channel: Channel<GraphData>,
}

impl WithNodeClusterSizeFilter {
    pub fn new(upstream: GraphStage) -> Rc<Self> { Self::with_min_size(DEFAULT_MIN_NODE_CLUSTER_SIZE, upstream) }

    pub fn from_config(config: &GraphConfig, upstream: GraphStage) -> Rc<Self> {
        Self::with_min_size(config.min_node_cluster_size, upstream)
    }

    pub fn with_min_size(min_cluster_size: usize, upstream: GraphStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { min_cluster_size: Cell::new(min_cluster_size), upstream, channel: Channel::new() }
        })
    }

    pub fn min_node_cluster_size(&self) -> usize { self.min_cluster_size.get() }

    pub fn set_min_node_cluster_size(&self, value: usize) -> Result<()> {
        self.min_cluster_size.set(value);
        self.send_update()
    }

    fn on_upstream(&self, graph: &GraphData) -> Result<()> {
        let min = self.min_cluster_size.get();
        let kept: HashSet<NodeId> = nodes_in_clusters_of_at_least(min, graph).into_iter().collect();
        let mut graph = GraphData { min_node_cluster_size: Some(min), ..graph.clone() };
        graph.nodes.retain(|n| kept.contains(&n.id));
        graph.retain_links_between_nodes();
        self.channel.emit(&graph)
    }
}

pass_through_stage!(WithNodeClusterSizeFilter, GraphData);

/// Keeps only links with a value of at least the configured strength.
pub struct WithLinkStrengthFilter {
    min_link_strength: Cell<f64>,
    upstream: GraphStage,
    channel: Channel<GraphData>,
}

impl WithLinkStrengthFilter {
    pub fn new(upstream: GraphStage) -> Rc<Self> { Self::with_min_strength(DEFAULT_MIN_LINK_STRENGTH, upstream) }

    pub fn from_config(config: &GraphConfig, upstream: GraphStage) -> Rc<Self> {
        Self::with_min_strength(config.min_link_strength, upstream)
    }

    pub fn with_min_strength(min_link_strength: f64, upstream: GraphStage) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            relay(upstream.as_ref(), this, Self::on_upstream);
            Self { min_link_strength: Cell::new(min_link_strength), upstream, channel: Channel::new() }
        })
    }

    pub fn min_link_strength(&self) -> f64 { self.min_link_strength.get() }

    pub fn set_min_link_strength(&self, value: f64) -> Result<()> {
        self.min_link_strength.set(value);
        self.send_update()
    }

    fn on_upstream(&self, graph: &GraphData) -> Result<()> {
        let min = self.min_link_strength.get();
        let mut graph = GraphData { min_link_strength: Some(min), ..graph.clone() };
        graph.links.retain(|l| l.value >= min);
        graph.update_index();
        self.channel.emit(&graph)
    }
}

pass_through_stage!(WithLinkStrengthFilter, GraphData);

/// Raise the filter's minimum link strength from `config.adjust_start` by
/// `config.adjust_step` until `observed` (the filter itself or a stage
/// downstream of it) reports at most `target` nodes. Once the count fits, a
/// start value above the weakest link is applied a single time. Returns the
/// final minimum strength.
///
/// Replaces the listeners of `observed` while searching and clears them
/// afterwards, so subscribe consumers once this returns.
pub fn adjust_filtering_till_node_amount_is_less_than(
    target: usize,
    filter: &WithLinkStrengthFilter,
    observed: &dyn Stage<Output = GraphData>,
    config: &GraphConfig,
) -> Result<f64> {
    let (start, step) = (config.adjust_start, config.adjust_step);
    let latest: Rc<Cell<Option<(usize, Option<(f64, f64)>)>>> = Rc::new(Cell::new(None));
    let probe = Rc::clone(&latest);
    observed.on_update(vec![listener(move |graph: &GraphData| {
        probe.set(Some((graph.nodes.len(), graph.link_strength_extent)));
        Ok(())
    })]);

    let mut min_strength = start;
    let mut enforced = false;
    observed.send_update()?;
    while let Some((nodes, extent)) = latest.take() {
        if nodes <= target {
            let above_weakest = extent.is_some_and(|(lo, _)| min_strength > lo);
            if above_weakest && !enforced {
                enforced = true;
                filter.set_min_link_strength(min_strength)?;
                continue;
            }
            break;
        }
        if extent.map_or(true, |(_, hi)| min_strength > hi + step) {
            warn!(target, nodes, min_strength, "cannot reduce node amount by link strength");
            break;
        }
        min_strength += step;
        filter.set_min_link_strength(min_strength)?;
    }
    observed.on_update(Vec::new());
    debug!(target, min_strength, "adjusted link strength filter");
    Ok(min_strength)
}
