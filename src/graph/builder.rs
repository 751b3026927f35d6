//! Folds raw rows from every loaded source into one weighted graph.

use rusqlite::types::Value;

use crate::graph::loader::{RawRow, SourceRows};
use crate::graph::network::{EdgeData, RelGraph};
use crate::graph::source::EdgeSourceConfig;
use crate::{RelgraphError, Result};

/// Weight factor applied when a request does not supply one.
pub const DEFAULT_WEIGHT_FACTOR: f64 = 3.0;

/// Counters reported alongside the built graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub rows_seen: usize,
    pub edges_written: usize,
    /// Rows whose raw weight was zero, negative, NULL or not numeric, or whose
    /// transformed weight was not strictly positive.
    pub rejected_weight: usize,
    /// Rows where a node id column was NULL.
    pub rejected_node_id: usize,
}

impl BuildStats {
    pub fn rejected(&self) -> usize {
        self.rejected_weight + self.rejected_node_id
    }
}

/// Interpret a raw closeness cell. Only finite, strictly positive numbers are usable
/// as a divisor.
pub fn raw_weight(value: &Value) -> Option<f64> {
    let w = match value {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
        Value::Null | Value::Blob(_) => return None,
    };
    (w.is_finite() && w > 0.0).then_some(w)
}

/// Accumulates edges from sources in order; see [`GraphBuilder::finish`].
#[derive(Debug)]
pub struct GraphBuilder {
    graph: RelGraph,
    weight_factor: f64,
    stats: BuildStats,
}

impl GraphBuilder {
    pub fn new(weight_factor: f64) -> Self {
        Self {
            graph: RelGraph::new(),
            weight_factor,
            stats: BuildStats::default(),
        }
    }

    /// Add every usable row of `source`.
    ///
    /// Rows with an unusable weight (raw or after the factor is applied) or a
    /// NULL id part are skipped and counted; a strategy column missing from the
    /// projection is a configuration error.
    pub fn add_rows(&mut self, source: &EdgeSourceConfig, rows: &[RawRow]) -> Result<()> {
        for row in rows {
            self.stats.rows_seen += 1;

            let cell = row.get(&source.weight_column).ok_or_else(|| {
                RelgraphError::Config(format!(
                    "source '{}': weight column '{}' missing from row",
                    source.table, source.weight_column
                ))
            })?;
            let weight = raw_weight(cell)
                .map(|raw| self.weight_factor / raw)
                .filter(|w| w.is_finite() && *w > 0.0);
            let Some(weight) = weight else {
                log::warn!(
                    "Skipping row from '{}': unusable weight {:?} in '{}'",
                    source.table,
                    cell,
                    source.weight_column
                );
                self.stats.rejected_weight += 1;
                continue;
            };

            let (Some(n1), Some(n2)) = (source.node_id_1.node_id(row)?, source.node_id_2.node_id(row)?)
            else {
                log::warn!("Skipping row from '{}': NULL node id column", source.table);
                self.stats.rejected_node_id += 1;
                continue;
            };

            self.graph.add_edge(
                &n1,
                &n2,
                EdgeData {
                    weight,
                    attrs: source.attrs.clone(),
                },
            );
            self.stats.edges_written += 1;
        }
        Ok(())
    }

    /// Add all loaded sources in order.
    pub fn add_sources(&mut self, loaded: &[SourceRows<'_>]) -> Result<()> {
        for source_rows in loaded {
            self.add_rows(source_rows.source, &source_rows.rows)?;
        }
        Ok(())
    }

    /// Finish the build: every node's `name` is set to its id.
    pub fn finish(mut self) -> (RelGraph, BuildStats) {
        self.graph.for_each_node_mut(|node| node.name = node.id.clone());
        log::debug!(
            "Built graph: {} nodes, {} edges ({} rows, {} rejected)",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.stats.rows_seen,
            self.stats.rejected()
        );
        (self.graph, self.stats)
    }
}
