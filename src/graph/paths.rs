//! Path queries between two nodes and the path-induced subgraph.
//!
//! Simple-path enumeration is exponential in the worst case, so the hop cutoff
//! is always clamped to [`MAX_CUTOFF`] regardless of what the caller asks for.

use std::collections::{HashMap, HashSet};

use petgraph::algo::dijkstra;
use petgraph::stable_graph::NodeIndex;

use crate::graph::network::RelGraph;

/// Hard upper bound on the simple-path hop cutoff.
pub const MAX_CUTOFF: usize = 7;

/// Cutoff used when a request does not supply one.
pub const DEFAULT_CUTOFF: usize = 4;

/// Which paths between `src` and `target` make up the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Every simple path of at most `cutoff` hops.
    AllSimple { cutoff: usize },
    /// Every shortest path, by edge weight when `weighted`, else by hop count.
    Shortest { weighted: bool },
}

/// Clamp a requested cutoff to `limit`, which itself never exceeds [`MAX_CUTOFF`].
pub fn clamp_cutoff(requested: usize, limit: usize) -> usize {
    requested.min(limit.min(MAX_CUTOFF))
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Depth-first enumeration of simple paths of at most `cutoff` hops.
fn simple_paths(graph: &RelGraph, from: NodeIndex, to: NodeIndex, cutoff: usize) -> Vec<Vec<NodeIndex>> {
    let mut found = Vec::new();
    if cutoff == 0 {
        return found;
    }

    let mut path = vec![from];
    let mut on_path: HashSet<NodeIndex> = HashSet::from([from]);
    let mut stack = vec![graph.neighbors_of(from).into_iter()];

    while let Some(children) = stack.last_mut() {
        match children.next() {
            Some(child) if child == to => {
                // `path.len()` hops once `to` is appended.
                if path.len() <= cutoff {
                    let mut p = path.clone();
                    p.push(to);
                    found.push(p);
                }
            }
            Some(child) => {
                if path.len() < cutoff && !on_path.contains(&child) {
                    path.push(child);
                    on_path.insert(child);
                    stack.push(graph.neighbors_of(child).into_iter());
                }
            }
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }
    found
}

/// Every shortest path from `from` to `to`.
///
/// Distances come from Dijkstra (weighted) or BFS (hop count); paths are then
/// rebuilt by walking tight predecessor edges back from `to`.
fn shortest_paths(graph: &RelGraph, from: NodeIndex, to: NodeIndex, weighted: bool) -> Vec<Vec<NodeIndex>> {
    let dist: HashMap<NodeIndex, f64> = if weighted {
        dijkstra(graph.inner(), from, None, |e| e.weight().weight)
    } else {
        graph
            .hop_distances(from, None)
            .into_iter()
            .map(|(ix, d)| (ix, d as f64))
            .collect()
    };
    if !dist.contains_key(&to) {
        return Vec::new();
    }

    let cost = |a: NodeIndex, b: NodeIndex| -> Option<f64> {
        if weighted {
            graph.edge_between(a, b).map(|e| e.weight)
        } else {
            Some(1.0)
        }
    };

    let mut found = Vec::new();
    // Reversed partial path from `to`; each frame holds the predecessors still to try.
    let mut path = vec![to];
    let mut on_path: HashSet<NodeIndex> = HashSet::from([to]);
    let tight_preds = |v: NodeIndex| -> Vec<NodeIndex> {
        let dv = dist[&v];
        graph
            .neighbors_of(v)
            .into_iter()
            .filter(|u| *u != v)
            .filter(|u| {
                matches!((dist.get(u), cost(*u, v)), (Some(du), Some(c)) if approx_eq(du + c, dv))
            })
            .collect()
    };
    let mut stack = vec![tight_preds(to).into_iter()];

    while let Some(preds) = stack.last_mut() {
        match preds.next() {
            Some(u) if u == from => {
                let mut p = path.clone();
                p.push(from);
                p.reverse();
                found.push(p);
            }
            Some(u) => {
                if !on_path.contains(&u) {
                    path.push(u);
                    on_path.insert(u);
                    stack.push(tight_preds(u).into_iter());
                }
            }
            None => {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }
    found
}

fn find_index_paths(graph: &RelGraph, src: &str, target: &str, mode: PathMode) -> Vec<Vec<NodeIndex>> {
    let (Some(from), Some(to)) = (graph.index_of(src), graph.index_of(target)) else {
        return Vec::new();
    };
    if from == to {
        return vec![vec![from]];
    }
    match mode {
        PathMode::AllSimple { cutoff } => simple_paths(graph, from, to, clamp_cutoff(cutoff, MAX_CUTOFF)),
        PathMode::Shortest { weighted } => shortest_paths(graph, from, to, weighted),
    }
}

/// Paths from `src` to `target` as node id lists, sorted.
///
/// A missing endpoint or an unreachable target yields no paths. `src == target`
/// yields the single one-node path.
pub fn find_paths(graph: &RelGraph, src: &str, target: &str, mode: PathMode) -> Vec<Vec<String>> {
    let mut paths: Vec<Vec<String>> = find_index_paths(graph, src, target, mode)
        .into_iter()
        .map(|p| {
            p.into_iter()
                .filter_map(|ix| graph.id_of(ix).map(str::to_string))
                .collect()
        })
        .collect();
    paths.sort();
    paths
}

/// Union of all qualifying paths as a new graph.
///
/// Node and edge payloads are copied from `graph`, so an edge walked in either
/// direction, or by several paths, keeps its original weight and attributes.
pub fn path_subgraph(graph: &RelGraph, src: &str, target: &str, mode: PathMode) -> RelGraph {
    let paths = find_index_paths(graph, src, target, mode);
    log::debug!("Path query {} -> {} ({:?}): {} paths", src, target, mode, paths.len());

    let mut sub = RelGraph::new();
    for path in &paths {
        for &ix in path {
            sub.copy_node_from(graph, ix);
        }
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if let (Some(ia), Some(ib), Some(data)) = (graph.id_of(a), graph.id_of(b), graph.edge_between(a, b)) {
                sub.add_edge(ia, ib, data.clone());
            }
        }
    }
    sub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::network::tests::{graph_of, node_ids};

    fn path(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn diamond() -> RelGraph {
        graph_of(&[("A", "B", 1.0), ("B", "D", 1.0), ("A", "C", 1.0), ("C", "D", 1.0)])
    }

    #[test]
    fn test_clamp_cutoff() {
        assert_eq!(clamp_cutoff(100, MAX_CUTOFF), 7);
        assert_eq!(clamp_cutoff(3, MAX_CUTOFF), 3);
        assert_eq!(clamp_cutoff(6, 5), 5);
        assert_eq!(clamp_cutoff(100, 50), 7);
    }

    #[test]
    fn test_cutoff_shorter_than_route_finds_nothing() {
        let g = graph_of(&[("A", "B", 1.0), ("B", "C", 1.0), ("C", "D", 1.0)]);
        assert!(find_paths(&g, "A", "D", PathMode::AllSimple { cutoff: 2 }).is_empty());
        assert_eq!(
            find_paths(&g, "A", "D", PathMode::AllSimple { cutoff: 3 }),
            vec![path(&["A", "B", "C", "D"])]
        );
    }

    #[test]
    fn test_large_cutoff_is_clamped() {
        // A chain of 10 hops plus a 2-hop shortcut: only the shortcut fits in 7 hops.
        let names: Vec<String> = (0..=10).map(|i| format!("n{}", i)).collect();
        let mut edges: Vec<(&str, &str, f64)> = names
            .windows(2)
            .map(|w| (w[0].as_str(), w[1].as_str(), 1.0))
            .collect();
        edges.push(("n0", "x", 1.0));
        edges.push(("x", "n10", 1.0));
        let g = graph_of(&edges);

        let paths = find_paths(&g, "n0", "n10", PathMode::AllSimple { cutoff: 100 });
        assert_eq!(paths, vec![path(&["n0", "x", "n10"])]);
        assert!(paths.iter().all(|p| p.len() - 1 <= MAX_CUTOFF));
    }

    #[test]
    fn test_diamond_shortest_vs_simple() {
        let g = diamond();
        let shortest = find_paths(&g, "A", "D", PathMode::Shortest { weighted: false });
        assert_eq!(shortest, vec![path(&["A", "B", "D"]), path(&["A", "C", "D"])]);

        let mut with_bc = diamond();
        with_bc.add_edge("B", "C", crate::graph::network::tests::edge(1.0));
        let simple = find_paths(&with_bc, "A", "D", PathMode::AllSimple { cutoff: 4 });
        assert_eq!(
            simple,
            vec![
                path(&["A", "B", "C", "D"]),
                path(&["A", "B", "D"]),
                path(&["A", "C", "B", "D"]),
                path(&["A", "C", "D"]),
            ]
        );
        let shortest = find_paths(&with_bc, "A", "D", PathMode::Shortest { weighted: false });
        assert_eq!(shortest.len(), 2);
    }

    #[test]
    fn test_weighted_shortest_uses_edge_weight() {
        // A-B-D is two hops but heavy; A-C-E-D is three light hops.
        let g = graph_of(&[
            ("A", "B", 5.0),
            ("B", "D", 5.0),
            ("A", "C", 1.0),
            ("C", "E", 1.0),
            ("E", "D", 1.0),
        ]);
        assert_eq!(
            find_paths(&g, "A", "D", PathMode::Shortest { weighted: false }),
            vec![path(&["A", "B", "D"])]
        );
        assert_eq!(
            find_paths(&g, "A", "D", PathMode::Shortest { weighted: true }),
            vec![path(&["A", "C", "E", "D"])]
        );
    }

    #[test]
    fn test_no_route_and_missing_nodes_are_empty() {
        let g = graph_of(&[("A", "B", 1.0), ("C", "D", 1.0)]);
        for mode in [
            PathMode::AllSimple { cutoff: 4 },
            PathMode::Shortest { weighted: false },
            PathMode::Shortest { weighted: true },
        ] {
            assert!(find_paths(&g, "A", "D", mode).is_empty());
            assert!(find_paths(&g, "A", "nope", mode).is_empty());
            let sub = path_subgraph(&g, "nope", "D", mode);
            assert!(sub.is_empty());
            assert_eq!(sub.edge_count(), 0);
        }
    }

    #[test]
    fn test_cycles_terminate() {
        let g = graph_of(&[("A", "B", 1.0), ("B", "C", 1.0), ("C", "A", 1.0), ("C", "D", 1.0), ("D", "D", 1.0)]);
        let paths = find_paths(&g, "A", "D", PathMode::AllSimple { cutoff: 7 });
        assert_eq!(paths, vec![path(&["A", "B", "C", "D"]), path(&["A", "C", "D"])]);
    }

    #[test]
    fn test_same_endpoint_is_single_node_path() {
        let g = diamond();
        assert_eq!(find_paths(&g, "A", "A", PathMode::AllSimple { cutoff: 4 }), vec![path(&["A"])]);
        let sub = path_subgraph(&g, "A", "A", PathMode::Shortest { weighted: true });
        assert_eq!(node_ids(&sub), vec!["A"]);
        assert_eq!(sub.edge_count(), 0);
    }

    #[test]
    fn test_subgraph_copies_weights_in_either_direction() {
        let mut g = RelGraph::new();
        let mut attrs = serde_json::Map::new();
        attrs.insert("type".into(), serde_json::json!("family"));
        g.add_edge("B", "A", crate::graph::network::EdgeData { weight: 0.5, attrs });
        g.add_edge("D", "B", crate::graph::network::tests::edge(2.0));
        g.add_edge("A", "C", crate::graph::network::tests::edge(7.0));
        g.add_edge("C", "D", crate::graph::network::tests::edge(9.0));

        let sub = path_subgraph(&g, "A", "D", PathMode::AllSimple { cutoff: 4 });
        assert_eq!(node_ids(&sub), vec!["A", "B", "C", "D"]);
        assert_eq!(sub.edge_count(), 4);
        let ab = sub.edge("A", "B").unwrap();
        assert_eq!(ab.weight, 0.5);
        assert_eq!(ab.attrs["type"], "family");
        assert_eq!(sub.edge("B", "D").unwrap().weight, 2.0);
        assert_eq!(sub.edge("D", "C").unwrap().weight, 9.0);
    }
}
