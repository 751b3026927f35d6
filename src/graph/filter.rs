//! Post-build filtering: view selection, node exclusion, clique placeholder.

use crate::graph::network::RelGraph;
use crate::graph::paths::{path_subgraph, PathMode};
use crate::{RelgraphError, Result};

/// Structural view applied to the merged graph. Ego and path views are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSelection {
    Full,
    Ego { src: String, radius: usize },
    Paths { src: String, target: String, mode: PathMode },
}

/// Everything the pipeline needs from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub view: ViewSelection,
    /// Node ids removed after the view is applied.
    pub ignore: Vec<String>,
}

fn select_view(graph: RelGraph, view: &ViewSelection) -> Result<RelGraph> {
    match view {
        ViewSelection::Full => Ok(graph),
        ViewSelection::Ego { src, radius } => {
            log::debug!("Ego view around '{}' with radius {}", src, radius);
            match graph.ego_graph(src, *radius) {
                Ok(ego) => Ok(ego),
                Err(RelgraphError::NodeNotInGraph(missing)) => {
                    log::info!("Ego center '{}' is not in the graph; returning empty result", missing);
                    Ok(RelGraph::new())
                }
                Err(e) => Err(e),
            }
        }
        ViewSelection::Paths { src, target, mode } => Ok(path_subgraph(&graph, src, target, *mode)),
    }
}

/// Run the pipeline: view selection, then `ignore` removal, then reset `cliques`.
pub fn apply_filters(graph: RelGraph, options: &FilterOptions) -> Result<RelGraph> {
    let mut graph = select_view(graph, &options.view)?;

    for id in &options.ignore {
        if !graph.remove_node(id) {
            log::trace!("Ignored node '{}' not present", id);
        }
    }

    graph.for_each_node_mut(|node| node.cliques.clear());
    Ok(graph)
}
