//! Relation loading: one parameterized join query per edge source.

use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::Connection;

use crate::graph::source::{quote_identifier, EdgeSourceConfig};
use crate::{RelgraphError, Result};

/// One result row, keyed by the column expressions of the source projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    values: HashMap<String, Value>,
}

impl RawRow {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

/// Query-level filters shared by every source of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadFilters {
    /// Rows with a raw weight below this are not loaded.
    pub min_weight: f64,
    /// Entity ids excluded as either endpoint.
    pub superignore: Vec<String>,
    /// Keep an edge if either endpoint carries one of these tags.
    pub only_one: Vec<String>,
    /// Keep an edge only if both endpoints carry one of these tags.
    pub only_both: Vec<String>,
}

/// SQL text plus positional parameters, in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Rows loaded for one source.
#[derive(Debug, Clone)]
pub struct SourceRows<'a> {
    pub source: &'a EdgeSourceConfig,
    pub rows: Vec<RawRow>,
}

/// Bind ids as integers when they look like integers so they compare against
/// INTEGER key columns, as text otherwise.
fn bind_value(raw: &str) -> Value {
    match raw.trim().parse::<i64>() {
        Ok(i) => Value::Integer(i),
        Err(_) => Value::Text(raw.trim().to_string()),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Build the join query for `source` under `filters`.
///
/// Identifiers come only from validated configuration; every request-supplied
/// value is bound as a parameter.
pub fn build_edge_query(source: &EdgeSourceConfig, filters: &LoadFilters) -> Result<EdgeQuery> {
    let table = quote_identifier(&source.table);
    let foreign = quote_identifier(&source.foreign_table);
    let key = quote_identifier(&source.foreign_key);
    let id1 = source.column_sql(&source.id1);
    let id2 = source.column_sql(&source.id2);

    let projection = source
        .columns
        .iter()
        .map(|c| source.column_sql(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {projection} FROM {table} \
         INNER JOIN {foreign} AS t1 ON {id1} = t1.{key} \
         INNER JOIN {foreign} AS t2 ON {id2} = t2.{key} \
         WHERE {weight} >= ?",
        weight = source.column_sql(&source.weight_column),
    );
    let mut params = vec![Value::Real(filters.min_weight)];

    if !filters.superignore.is_empty() {
        let marks = placeholders(filters.superignore.len());
        sql.push_str(&format!(" AND {id1} NOT IN ({marks}) AND {id2} NOT IN ({marks})"));
        for _ in 0..2 {
            params.extend(filters.superignore.iter().map(|s| bind_value(s)));
        }
    }

    if !filters.only_one.is_empty() || !filters.only_both.is_empty() {
        let jct = source.tags_jct_table.as_ref().ok_or_else(|| {
            RelgraphError::Config(format!(
                "source '{}' has no tags_jct_table but a tag filter was requested",
                source.table
            ))
        })?;
        let jct_table = quote_identifier(&jct.name);
        let c1 = quote_identifier(&jct.c1);
        let c2 = quote_identifier(&jct.c2);

        if !filters.only_one.is_empty() {
            let marks = placeholders(filters.only_one.len());
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM {jct_table} AS j \
                 WHERE (j.{c1} = {id1} OR j.{c1} = {id2}) AND j.{c2} IN ({marks}))"
            ));
            params.extend(filters.only_one.iter().map(|s| bind_value(s)));
        }

        if !filters.only_both.is_empty() {
            let marks = placeholders(filters.only_both.len());
            for endpoint in [&id1, &id2] {
                sql.push_str(&format!(
                    " AND EXISTS (SELECT 1 FROM {jct_table} AS j \
                     WHERE j.{c1} = {endpoint} AND j.{c2} IN ({marks}))"
                ));
                params.extend(filters.only_both.iter().map(|s| bind_value(s)));
            }
        }
    }

    for extra in &source.sqlextras {
        sql.push_str(&format!(" AND ({})", extra));
    }

    Ok(EdgeQuery { sql, params })
}

/// Execute the join query for one source.
pub fn load_source_rows(
    conn: &Connection,
    source: &EdgeSourceConfig,
    filters: &LoadFilters,
) -> Result<Vec<RawRow>> {
    let query = build_edge_query(source, filters)?;
    log::debug!("Loading edge source '{}': {}", source.table, query.sql);

    let mut stmt = conn.prepare(&query.sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(query.params.iter()), |row| {
        let mut values = HashMap::with_capacity(source.columns.len());
        for (i, column) in source.columns.iter().enumerate() {
            values.insert(column.clone(), row.get::<_, Value>(i)?);
        }
        Ok(RawRow::new(values))
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    log::debug!("Edge source '{}' returned {} rows", source.table, out.len());
    Ok(out)
}

/// Load every source whose table is not listed in `ignore_ttype`, in configured order.
///
/// Any query failure aborts the whole load.
pub fn load_all<'a>(
    conn: &Connection,
    sources: &'a [EdgeSourceConfig],
    filters: &LoadFilters,
    ignore_ttype: &[String],
) -> Result<Vec<SourceRows<'a>>> {
    let mut loaded = Vec::with_capacity(sources.len());
    for source in sources {
        if ignore_ttype.iter().any(|t| t == &source.table) {
            log::debug!("Skipping edge source '{}' (ignore_ttype)", source.table);
            continue;
        }
        let rows = load_source_rows(conn, source, filters)?;
        loaded.push(SourceRows { source, rows });
    }
    Ok(loaded)
}
