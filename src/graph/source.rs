//! Declarative edge source definitions.
//!
//! Each source describes one relational join that yields weighted edges between
//! two rows of an entity table. Sources are plain data loaded from config.toml;
//! node identifiers come from a closed set of strategies instead of code.

use std::sync::OnceLock;

use regex::Regex;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::graph::loader::RawRow;
use crate::{RelgraphError, Result};

/// Edge attribute keys produced by the serializer itself; sources may not override them.
const RESERVED_EDGE_ATTRS: &[&str] = &["source", "target", "weight"];

/// Junction table used to filter edges by tag membership of their endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagJunction {
    /// Junction table name.
    pub name: String,
    /// Column holding the entity id (matched against `id1`/`id2`).
    pub c1: String,
    /// Column holding the tag id.
    pub c2: String,
}

/// How a result row is turned into a canonical node id.
///
/// Two sources that reference the same entity must resolve it to the same id,
/// otherwise the graphs will not merge at that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum NodeIdStrategy {
    /// The value of one projected column.
    Column { column: String },
    /// A fixed prefix followed by the value of one projected column, e.g. `person:12`.
    Prefixed { prefix: String, column: String },
    /// Values of several projected columns joined by a separator.
    Concat {
        columns: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    " ".to_string()
}

impl NodeIdStrategy {
    /// Columns this strategy reads from a row.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            NodeIdStrategy::Column { column } | NodeIdStrategy::Prefixed { column, .. } => {
                vec![column.as_str()]
            }
            NodeIdStrategy::Concat { columns, .. } => columns.iter().map(|c| c.as_str()).collect(),
        }
    }

    /// Compute the node id for `row`.
    ///
    /// Returns `Ok(None)` when a referenced value is NULL and an error when the
    /// column was not projected at all.
    pub fn node_id(&self, row: &RawRow) -> Result<Option<String>> {
        match self {
            NodeIdStrategy::Column { column } => cell_text(row, column),
            NodeIdStrategy::Prefixed { prefix, column } => {
                Ok(cell_text(row, column)?.map(|v| format!("{}{}", prefix, v)))
            }
            NodeIdStrategy::Concat { columns, separator } => {
                let mut parts = Vec::with_capacity(columns.len());
                for column in columns {
                    match cell_text(row, column)? {
                        Some(part) => parts.push(part),
                        None => return Ok(None),
                    }
                }
                Ok(Some(parts.join(separator)))
            }
        }
    }
}

fn cell_text(row: &RawRow, column: &str) -> Result<Option<String>> {
    let value = row.get(column).ok_or_else(|| {
        RelgraphError::Config(format!("column '{}' is not in the source projection", column))
    })?;
    Ok(match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        // Keep the fractional part so REAL 1.0 never collides with INTEGER 1.
        Value::Real(f) => Some(format!("{:?}", f)),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    })
}

/// One relationship type merged into the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSourceConfig {
    /// Relation/weight table.
    pub table: String,
    /// Entity table joined twice as `t1` and `t2`.
    pub foreign_table: String,
    /// Key column of `foreign_table` referenced by `id1`/`id2`.
    #[serde(default = "default_foreign_key")]
    pub foreign_key: String,
    pub id1: String,
    pub id2: String,
    /// Raw closeness value; the graph stores `weight_factor / raw`.
    pub weight_column: String,
    /// Projection list. Must contain the weight column and every strategy column.
    pub columns: Vec<String>,
    pub node_id_1: NodeIdStrategy,
    pub node_id_2: NodeIdStrategy,
    /// Static attributes copied onto every edge from this source.
    #[serde(default)]
    pub attrs: Map<String, serde_json::Value>,
    #[serde(default)]
    pub tags_jct_table: Option<TagJunction>,
    /// Extra predicate fragments ANDed into the query. Operator-supplied only.
    #[serde(default)]
    pub sqlextras: Vec<String>,
}

fn default_foreign_key() -> String {
    "id".to_string()
}

impl EdgeSourceConfig {
    /// Check identifiers and projection consistency.
    pub fn validate(&self) -> Result<()> {
        let ctx = |msg: String| RelgraphError::Config(format!("source '{}': {}", self.table, msg));

        for (field, name) in [
            ("table", &self.table),
            ("foreign_table", &self.foreign_table),
            ("foreign_key", &self.foreign_key),
        ] {
            if !is_plain_identifier(name) {
                return Err(ctx(format!("{} '{}' is not a plain identifier", field, name)));
            }
        }

        for (field, expr) in [
            ("id1", &self.id1),
            ("id2", &self.id2),
            ("weight_column", &self.weight_column),
        ] {
            if !is_safe_identifier(expr) {
                return Err(ctx(format!("{} '{}' is not a safe column reference", field, expr)));
            }
        }

        if self.columns.is_empty() {
            return Err(ctx("columns must not be empty".to_string()));
        }
        if let Some(bad) = self.columns.iter().find(|c| !is_safe_identifier(c)) {
            return Err(ctx(format!("column '{}' is not a safe column reference", bad)));
        }
        if !self.columns.contains(&self.weight_column) {
            return Err(ctx(format!(
                "weight_column '{}' must be listed in columns",
                self.weight_column
            )));
        }

        for strategy in [&self.node_id_1, &self.node_id_2] {
            let cols = strategy.columns();
            if cols.is_empty() {
                return Err(ctx("node id strategy reads no columns".to_string()));
            }
            if let Some(missing) = cols.iter().find(|c| !self.columns.iter().any(|p| p == *c)) {
                return Err(ctx(format!(
                    "node id column '{}' must be listed in columns",
                    missing
                )));
            }
        }

        if let Some(jct) = &self.tags_jct_table {
            for name in [&jct.name, &jct.c1, &jct.c2] {
                if !is_plain_identifier(name) {
                    return Err(ctx(format!("tags_jct_table field '{}' is not a plain identifier", name)));
                }
            }
        }

        if let Some(key) = RESERVED_EDGE_ATTRS.iter().find(|k| self.attrs.contains_key(**k)) {
            return Err(ctx(format!("attrs may not define reserved key '{}'", key)));
        }

        Ok(())
    }

    /// Resolve a column expression to the physical `(table, column)` it reads.
    ///
    /// Bare names and `<table>.col` belong to the weight table; `t1.col`/`t2.col`
    /// belong to the foreign table. Unknown qualifiers resolve to `None`.
    pub fn resolve_column<'a>(&'a self, expr: &'a str) -> Option<(&'a str, &'a str)> {
        match expr.split_once('.') {
            None => Some((self.table.as_str(), expr)),
            Some(("t1", col)) | Some(("t2", col)) => Some((self.foreign_table.as_str(), col)),
            Some((qualifier, col)) if qualifier == self.table => Some((self.table.as_str(), col)),
            Some(_) => None,
        }
    }

    /// Every `(table, column)` pair this source reads, for schema verification.
    pub fn column_refs(&self) -> Vec<(String, String)> {
        let mut refs: Vec<(String, String)> = Vec::new();
        let mut push = |table: &str, column: &str| {
            let pair = (table.to_string(), column.to_string());
            if !refs.contains(&pair) {
                refs.push(pair);
            }
        };

        for expr in [&self.id1, &self.id2, &self.weight_column]
            .into_iter()
            .chain(self.columns.iter())
        {
            if let Some((table, column)) = self.resolve_column(expr) {
                push(table, column);
            }
        }
        push(&self.foreign_table, &self.foreign_key);
        if let Some(jct) = &self.tags_jct_table {
            push(&jct.name, &jct.c1);
            push(&jct.name, &jct.c2);
        }
        refs
    }

    /// Fully qualified, quoted SQL for a column expression of this source.
    pub(crate) fn column_sql(&self, expr: &str) -> String {
        if expr.contains('.') {
            quote_identifier(expr)
        } else {
            format!("{}.{}", quote_identifier(&self.table), quote_identifier(expr))
        }
    }
}

fn plain_identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

fn qualified_identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("valid identifier regex")
    })
}

/// A bare SQL identifier (letters, digits, underscore; not starting with a digit).
pub fn is_plain_identifier(name: &str) -> bool {
    plain_identifier_re().is_match(name)
}

/// A bare identifier or `qualifier.identifier`.
pub fn is_safe_identifier(expr: &str) -> bool {
    qualified_identifier_re().is_match(expr)
}

/// Double-quote each dotted part of an identifier that already passed validation.
pub fn quote_identifier(expr: &str) -> String {
    expr.split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join(".")
}
