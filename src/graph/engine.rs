//! The graph accumulator.
//!
//! Uses petgraph to store nodes and links, with an id index for first-wins
//! node identity and a seen-pair set for link dedup. Node and edge indices
//! are never removed, so petgraph's insertion order doubles as the
//! first-seen order of the snapshot.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::layout::Layout;
use super::types::*;

/// The live graph: every node and link discovered so far.
#[derive(Debug, Clone)]
pub struct GraphState {
    graph: DiGraph<Node, ()>,
    /// Index: node id -> node index.
    node_index: HashMap<String, NodeIndex>,
    /// Every (source, target) pair already recorded.
    seen_links: HashSet<(NodeIndex, NodeIndex)>,
    layout: Layout,
}

/// What a single merge added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub nodes_added: usize,
    pub links_added: usize,
}

impl MergeOutcome {
    pub fn absorb(&mut self, other: MergeOutcome) {
        self.nodes_added += other.nodes_added;
        self.links_added += other.links_added;
    }
}

impl GraphState {
    /// Create a new empty graph.
    pub fn new(layout: Layout) -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            seen_links: HashSet::new(),
            layout,
        }
    }

    /// Rebuild state from a saved snapshot. Coordinates are kept as saved;
    /// the usual first-wins and dedup rules apply to the snapshot's contents.
    pub fn from_snapshot(snapshot: GraphSnapshot, layout: Layout) -> Self {
        let mut state = Self::new(layout);
        for node in snapshot.nodes {
            if !state.contains_node(&node.id) {
                state.insert_node(node);
            }
        }
        for link in &snapshot.links {
            state.add_link(&link.source, &link.target);
        }
        state
    }

    // ─── Node Operations ────────────────────────────────────────

    /// Add a node unless its id is already present. A new node gets its
    /// layout position now; an existing node is left untouched. Returns the
    /// node index and whether it was inserted.
    pub fn add_node(&mut self, id: String, kind: NodeKind) -> (NodeIndex, bool) {
        if let Some(&idx) = self.node_index.get(&id) {
            return (idx, false);
        }
        let (x, y, z) = self.layout.place();
        let idx = self.insert_node(Node { id, kind, x, y, z });
        (idx, true)
    }

    fn insert_node(&mut self, node: Node) -> NodeIndex {
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        idx
    }

    // ─── Link Operations ────────────────────────────────────────

    /// Record a link between two existing nodes. Returns false for a
    /// duplicate pair or an unknown endpoint.
    pub fn add_link(&mut self, source: &str, target: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.node_index.get(source), self.node_index.get(target))
        else {
            warn!(source, target, "dropping link with unknown endpoint");
            return false;
        };
        if !self.seen_links.insert((from, to)) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    // ─── Merging ────────────────────────────────────────────────

    /// Fold one file's partial result into the graph: nodes first (so link
    /// endpoints introduced by this scan exist), then links.
    pub fn merge_scan(&mut self, scan: FileScan) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for node in scan.nodes {
            if self.add_node(node.id, node.kind).1 {
                outcome.nodes_added += 1;
            }
        }
        for link in &scan.links {
            if self.add_link(&link.source, &link.target) {
                outcome.links_added += 1;
            }
        }
        outcome
    }

    // ─── Query Operations ───────────────────────────────────────

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_link(&self, source: &str, target: &str) -> bool {
        match (self.node_index.get(source), self.node_index.get(target)) {
            (Some(&from), Some(&to)) => self.seen_links.contains(&(from, to)),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Ids of the nodes `id` links to, in first-seen order.
    pub fn targets_of(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges(idx).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| self.graph[e.target()].id.as_str())
            .collect()
    }

    /// The full graph in its externally visible shape.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self.graph.node_weights().cloned().collect();
        let links = self
            .graph
            .raw_edges()
            .iter()
            .map(|e| Link::new(&self.graph[e.source()].id, &self.graph[e.target()].id))
            .collect();
        debug!(
            nodes = self.graph.node_count(),
            links = self.graph.edge_count(),
            "snapshot taken"
        );
        GraphSnapshot { nodes, links }
    }

    // ─── Stats ──────────────────────────────────────────────────

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.graph.node_count(),
            total_links: self.graph.edge_count(),
            ..GraphStats::default()
        };
        for node in self.graph.node_weights() {
            match node.kind {
                NodeKind::File => stats.file_count += 1,
                NodeKind::Class(_) => stats.class_count += 1,
                NodeKind::Function(_) => stats.function_count += 1,
                NodeKind::External(_) => stats.external_count += 1,
            }
        }
        stats
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}

/// Statistics about the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_links: usize,
    pub file_count: usize,
    pub class_count: usize,
    pub function_count: usize,
    pub external_count: usize,
}
