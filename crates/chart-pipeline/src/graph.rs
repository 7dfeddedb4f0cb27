// File: crates/chart-pipeline/src/graph.rs
// Summary: Weighted graph snapshots, their connectivity search index, and the graph source stage.
// Notes:
// - Links refer to nodes by stable `NodeId`; the search index maps ids to
//   positions in the current node list and must be rebuilt after any edit.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use tracing::debug;

use crate::channel::{Channel, Listener};
use crate::error::{PipelineError, Result};
use crate::stage::Stage;
use crate::union_find::QuickFind;

pub type NodeId = usize;

pub type GraphStage = Rc<dyn Stage<Output = GraphData>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub value: f64,
}

/// Connectivity over the current nodes and links.
#[derive(Clone, Debug)]
pub struct SearchIndex {
    positions: HashMap<NodeId, usize>,
    connectivity: QuickFind,
}

impl SearchIndex {
    /// Links with an endpoint outside `nodes` are ignored.
    pub fn build(nodes: &[Node], links: &[Link]) -> Self {
        let positions: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let mut connectivity = QuickFind::new(nodes.len());
        for link in links {
            if let (Some(&a), Some(&b)) = (positions.get(&link.source), positions.get(&link.target)) {
                connectivity.connect(a, b);
            }
        }
        Self { positions, connectivity }
    }

    pub fn position(&self, id: NodeId) -> Option<usize> { self.positions.get(&id).copied() }

    /// False when either node is absent.
    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(a), Some(b)) => self.connectivity.are_connected(a, b),
            _ => false,
        }
    }
}

/// A graph snapshot plus the annotations graph stages attach to it.
#[derive(Clone, Debug)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    /// `(min, max)` link value of the unfiltered graph; `None` without links.
    pub link_strength_extent: Option<(f64, f64)>,
    pub min_node_cluster_size: Option<usize>,
    pub min_link_strength: Option<f64>,
    pub selected_nodes: Vec<NodeId>,
    pub is_selection_update: bool,
    pub(crate) search_index: SearchIndex,
}

impl GraphData {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        let search_index = SearchIndex::build(&nodes, &links);
        Self {
            nodes,
            links,
            link_strength_extent: None,
            min_node_cluster_size: None,
            min_link_strength: None,
            selected_nodes: Vec::new(),
            is_selection_update: false,
            search_index,
        }
    }

    /// Parse `{"nodes": [{"name": ..}], "links": [{"source": i, "target": j, "value": v}]}`
    /// where link endpoints are node positions. Node ids are those positions.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: RawGraph = json5::from_str(raw).map_err(|e| PipelineError::Config(e.to_string()))?;
        let nodes: Vec<Node> = parsed
            .nodes
            .into_iter()
            .enumerate()
            .map(|(id, n)| Node { id, name: n.name })
            .collect();
        for link in &parsed.links {
            if link.source >= nodes.len() || link.target >= nodes.len() {
                return Err(PipelineError::Config(format!(
                    "link {}->{} refers to a missing node (nodes: {})",
                    link.source,
                    link.target,
                    nodes.len()
                )));
            }
        }
        let links = parsed
            .links
            .into_iter()
            .map(|l| Link { source: l.source, target: l.target, value: l.value })
            .collect();
        Ok(Self::new(nodes, links))
    }

    pub fn search_index(&self) -> &SearchIndex { &self.search_index }

    /// Rebuild the search index from the current nodes and links.
    pub fn update_index(&mut self) {
        self.search_index = SearchIndex::build(&self.nodes, &self.links);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.search_index.position(id).and_then(|i| self.nodes.get(i))
    }

    pub fn contains(&self, id: NodeId) -> bool { self.search_index.position(id).is_some() }

    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool { self.search_index.are_connected(a, b) }

    /// All nodes in the same cluster as `id` (itself included), in node order.
    pub fn find_nodes_in_cluster_with(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).filter(|&other| self.are_connected(other, id)).collect()
    }

    /// `id` followed by every node directly linked to it.
    pub fn neighbors_of(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        for link in &self.links {
            if link.source == id {
                out.push(link.target);
            } else if link.target == id {
                out.push(link.source);
            }
        }
        out
    }

    /// Drop links with an endpoint that is no longer a node, then reindex.
    pub(crate) fn retain_links_between_nodes(&mut self) {
        self.update_index();
        let index = &self.search_index;
        self.links.retain(|l| index.position(l.source).is_some() && index.position(l.target).is_some());
        self.update_index();
    }
}

/// `(min, max)` of link values.
pub fn link_strength_extent(links: &[Link]) -> Option<(f64, f64)> {
    links.iter().map(|l| l.value).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[derive(Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<RawLink>,
}

#[derive(Deserialize)]
struct RawNode {
    name: String,
}

#[derive(Deserialize)]
struct RawLink {
    source: usize,
    target: usize,
    value: f64,
}

/// Root graph stage: every update starts again from the original graph.
pub struct GraphSource {
    original: GraphData,
    channel: Channel<GraphData>,
}

impl GraphSource {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Rc<Self> { Self::from_graph(GraphData::new(nodes, links)) }

    pub fn from_graph(mut graph: GraphData) -> Rc<Self> {
        graph.link_strength_extent = link_strength_extent(&graph.links);
        Rc::new(Self { original: graph, channel: Channel::new() })
    }

    pub fn from_json(raw: &str) -> Result<Rc<Self>> { Ok(Self::from_graph(GraphData::from_json(raw)?)) }

    pub fn original(&self) -> &GraphData { &self.original }
}

impl Stage for GraphSource {
    type Output = GraphData;

    fn on_update(&self, listeners: Vec<Listener<GraphData>>) { self.channel.subscribe(listeners); }

    fn send_update(&self) -> Result<()> {
        let mut graph = self.original.clone();
        graph.link_strength_extent = link_strength_extent(&graph.links);
        graph.update_index();
        debug!(nodes = graph.nodes.len(), links = graph.links.len(), "graph update");
        self.channel.emit(&graph)
    }
}
