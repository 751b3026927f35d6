//! Schema introspection used to check configured sources against the database.

use rusqlite::Connection;

use crate::error::{Result, RelgraphError};
use crate::graph::EdgeSourceConfig;

/// One column as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub is_primary_key: bool,
}

/// User tables in the database, sorted by name
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') \
         AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

/// Columns of `table`. Empty when the table does not exist.
pub fn describe_table(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                not_null: row.get::<_, i64>(2)? != 0,
                is_primary_key: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(columns)
}

/// Primary key columns of `table`, in key order
pub fn primary_keys(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
    )?;
    let keys = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(keys)
}

/// Check that every table and column each source reads exists.
///
/// All problems are collected into a single configuration error.
pub fn verify_sources(conn: &Connection, sources: &[EdgeSourceConfig]) -> Result<()> {
    let mut problems = Vec::new();

    for source in sources {
        for (table, column) in source.column_refs() {
            let columns = describe_table(conn, &table)?;
            if columns.is_empty() {
                problems.push(format!("source '{}': table '{}' not found", source.table, table));
            } else if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(&column)) {
                problems.push(format!(
                    "source '{}': column '{}.{}' not found",
                    source.table, table, column
                ));
            } else {
                log::debug!("✓ {}.{}", table, column);
            }
        }
    }

    problems.dedup();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(RelgraphError::Config(problems.join("; ")))
    }
}
