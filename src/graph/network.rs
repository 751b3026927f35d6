//! Request-scoped undirected weighted graph keyed by string node ids.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use serde::Serialize;
use serde_json::Map;

use crate::{RelgraphError, Result};

/// Node payload. `name` echoes the id for the exchange format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub id: String,
    pub name: String,
    /// Placeholder consumed by the visualization front end; never computed here.
    pub cliques: Vec<Vec<String>>,
}

impl NodeData {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            cliques: Vec::new(),
        }
    }
}

/// Edge payload: transformed weight plus the source's static attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub weight: f64,
    pub attrs: Map<String, serde_json::Value>,
}

/// Undirected graph with at most one edge per node pair.
#[derive(Debug, Clone, Default)]
pub struct RelGraph {
    inner: StableUnGraph<NodeData, EdgeData>,
    index: HashMap<String, NodeIndex>,
}

impl RelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if absent and return its index.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&ix) = self.index.get(id) {
            return ix;
        }
        let ix = self.inner.add_node(NodeData::new(id));
        self.index.insert(id.to_string(), ix);
        ix
    }

    fn add_node_data(&mut self, data: NodeData) -> NodeIndex {
        if let Some(&ix) = self.index.get(&data.id) {
            return ix;
        }
        let id = data.id.clone();
        let ix = self.inner.add_node(data);
        self.index.insert(id, ix);
        ix
    }

    /// Add or replace the edge between `a` and `b`. Later writes win.
    pub fn add_edge(&mut self, a: &str, b: &str, data: EdgeData) -> EdgeIndex {
        let ia = self.add_node(a);
        let ib = self.add_node(b);
        self.inner.update_edge(ia, ib, data)
    }

    /// Remove a node and its incident edges. Returns false if it was absent.
    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(ix) => {
                self.inner.remove_node(ix);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.index.get(id).and_then(|&ix| self.inner.node_weight(ix))
    }

    /// Edge between `a` and `b` in either orientation.
    pub fn edge(&self, a: &str, b: &str) -> Option<&EdgeData> {
        let ia = *self.index.get(a)?;
        let ib = *self.index.get(b)?;
        self.edge_between(ia, ib)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> + '_ {
        self.inner
            .node_indices()
            .filter_map(move |ix| self.inner.node_weight(ix))
    }

    /// Apply `f` to every node payload.
    pub fn for_each_node_mut(&mut self, mut f: impl FnMut(&mut NodeData)) {
        let indices: Vec<NodeIndex> = self.inner.node_indices().collect();
        for ix in indices {
            if let Some(node) = self.inner.node_weight_mut(ix) {
                f(node);
            }
        }
    }

    /// Every edge as `(endpoint, endpoint, data)` in storage orientation.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> + '_ {
        self.inner.edge_indices().filter_map(move |e| {
            let (a, b) = self.inner.edge_endpoints(e)?;
            let data = self.inner.edge_weight(e)?;
            Some((self.id_of(a)?, self.id_of(b)?, data))
        })
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn id_of(&self, ix: NodeIndex) -> Option<&str> {
        self.inner.node_weight(ix).map(|n| n.id.as_str())
    }

    pub(crate) fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&EdgeData> {
        self.inner
            .find_edge(a, b)
            .and_then(|e| self.inner.edge_weight(e))
    }

    /// Distinct neighbors of `ix`, in index order.
    pub(crate) fn neighbors_of(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.inner.neighbors(ix).collect();
        out.sort();
        out.dedup();
        out
    }

    pub(crate) fn inner(&self) -> &StableUnGraph<NodeData, EdgeData> {
        &self.inner
    }

    /// Hop distances from `start`, stopping at `limit` hops when given.
    pub(crate) fn hop_distances(&self, start: NodeIndex, limit: Option<usize>) -> HashMap<NodeIndex, usize> {
        let mut dist = HashMap::new();
        let mut queue = VecDeque::new();
        dist.insert(start, 0);
        queue.push_back(start);

        while let Some(ix) = queue.pop_front() {
            let depth = dist[&ix];
            if limit.is_some_and(|l| depth >= l) {
                continue;
            }
            for next in self.neighbors_of(ix) {
                if !dist.contains_key(&next) {
                    dist.insert(next, depth + 1);
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    /// Subgraph induced by `keep`: those nodes plus every edge among them.
    pub(crate) fn induced_subgraph(&self, keep: &HashSet<NodeIndex>) -> RelGraph {
        let mut sub = RelGraph::new();
        for ix in self.inner.node_indices().filter(|ix| keep.contains(ix)) {
            if let Some(node) = self.inner.node_weight(ix) {
                sub.add_node_data(node.clone());
            }
        }
        for e in self.inner.edge_indices() {
            let Some((a, b)) = self.inner.edge_endpoints(e) else { continue };
            if !(keep.contains(&a) && keep.contains(&b)) {
                continue;
            }
            if let (Some(ia), Some(ib), Some(data)) = (self.id_of(a), self.id_of(b), self.inner.edge_weight(e)) {
                sub.add_edge(ia, ib, data.clone());
            }
        }
        sub
    }

    /// Copy the node at `ix` in `other`, payload included, into this graph.
    pub(crate) fn copy_node_from(&mut self, other: &RelGraph, ix: NodeIndex) -> Option<NodeIndex> {
        let data = other.inner.node_weight(ix)?.clone();
        Some(self.add_node_data(data))
    }

    /// Ego graph of `center`: every node within `radius` hops and the edges among them.
    pub fn ego_graph(&self, center: &str, radius: usize) -> Result<RelGraph> {
        let start = self
            .index_of(center)
            .ok_or_else(|| RelgraphError::NodeNotInGraph(center.to_string()))?;
        let keep: HashSet<NodeIndex> = self.hop_distances(start, Some(radius)).into_keys().collect();
        Ok(self.induced_subgraph(&keep))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn edge(weight: f64) -> EdgeData {
        EdgeData { weight, attrs: Map::new() }
    }

    /// Build a graph from `(a, b, weight)` triples.
    pub(crate) fn graph_of(edges: &[(&str, &str, f64)]) -> RelGraph {
        let mut g = RelGraph::new();
        for (a, b, w) in edges {
            g.add_edge(a, b, edge(*w));
        }
        g
    }

    pub(crate) fn node_ids(g: &RelGraph) -> Vec<String> {
        let mut ids: Vec<String> = g.nodes().map(|n| n.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut g = RelGraph::new();
        let a = g.add_node("a");
        assert_eq!(g.add_node("a"), a);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node("a").unwrap().name, "a");
    }

    #[test]
    fn test_duplicate_edge_last_write_wins() {
        let mut g = RelGraph::new();
        g.add_edge("a", "b", edge(1.0));
        let mut attrs = Map::new();
        attrs.insert("type".into(), serde_json::json!("work"));
        g.add_edge("b", "a", EdgeData { weight: 2.0, attrs });
        assert_eq!(g.edge_count(), 1);
        let e = g.edge("a", "b").unwrap();
        assert_eq!(e.weight, 2.0);
        assert_eq!(e.attrs["type"], "work");
    }

    #[test]
    fn test_self_loop_is_kept() {
        let g = graph_of(&[("a", "a", 1.0)]);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 1);
        assert!(g.edge("a", "a").is_some());
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut g = graph_of(&[("a", "b", 1.0), ("b", "c", 1.0)]);
        assert!(g.remove_node("b"));
        assert!(!g.remove_node("zzz"));
        assert_eq!(node_ids(&g), vec!["a", "c"]);
        assert_eq!(g.edge_count(), 0);
        // Indices stay valid after removal.
        g.add_edge("a", "c", edge(4.0));
        assert_eq!(g.edge("c", "a").unwrap().weight, 4.0);
    }

    #[test]
    fn test_ego_graph_radius() {
        let g = graph_of(&[("A", "B", 1.0), ("B", "C", 1.0), ("C", "D", 1.0)]);

        let one = g.ego_graph("A", 1).unwrap();
        assert_eq!(node_ids(&one), vec!["A", "B"]);
        assert_eq!(one.edge_count(), 1);
        assert!(one.edge("A", "B").is_some());

        let two = g.ego_graph("A", 2).unwrap();
        assert_eq!(node_ids(&two), vec!["A", "B", "C"]);
        assert_eq!(two.edge_count(), 2);

        let zero = g.ego_graph("A", 0).unwrap();
        assert_eq!(node_ids(&zero), vec!["A"]);
    }

    #[test]
    fn test_ego_graph_includes_induced_edges() {
        let g = graph_of(&[("A", "B", 1.0), ("A", "C", 1.0), ("B", "C", 5.0), ("C", "D", 1.0)]);
        let ego = g.ego_graph("A", 1).unwrap();
        assert_eq!(node_ids(&ego), vec!["A", "B", "C"]);
        assert_eq!(ego.edge("B", "C").unwrap().weight, 5.0);
    }

    #[test]
    fn test_ego_graph_missing_center() {
        let g = graph_of(&[("A", "B", 1.0)]);
        assert!(matches!(g.ego_graph("Z", 2), Err(RelgraphError::NodeNotInGraph(id)) if id == "Z"));
    }
}
