use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tokio::task;
use crate::error::{Result, RelgraphError};

/// Database connection wrapper
///
/// The graph engine only reads: every connection is opened read-only with
/// `query_only` set, so a stray `sqlextras` fragment cannot modify data.
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open a read-only connection with the read pragmas applied
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(RelgraphError::Database)?;

        // temp_store = MEMORY for the join/sort temporaries
        // cache_size = -65536 (64MB cache) for large edge tables
        conn.execute_batch(
            "PRAGMA query_only = ON; \
             PRAGMA temp_store = MEMORY; \
             PRAGMA cache_size = -65536;"
        )?;

        Ok(conn)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Db::new(&self.path);
        task::spawn_blocking(move || {
            let mut conn = db.open_connection()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            RelgraphError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("database task failed: {}", e),
            ))
        })?
    }
}

pub mod schema;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded(temp_dir: &TempDir) -> std::path::PathBuf {
        let db_path = temp_dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute("CREATE TABLE test (id INTEGER PRIMARY KEY)", []).unwrap();
        conn.execute("INSERT INTO test (id) VALUES (1), (2)", []).unwrap();
        db_path
    }

    #[tokio::test]
    async fn test_db_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(seeded(&temp_dir));

        let count: i64 = db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM test", [], |row| row.get(0))
                .map_err(RelgraphError::Database)
        }).await.unwrap();

        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_connection_is_read_only() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(seeded(&temp_dir));

        let result = db.with_connection(|conn| {
            conn.execute("DELETE FROM test", []).map_err(RelgraphError::Database)
        }).await;

        assert!(matches!(result, Err(RelgraphError::Database(_))));
    }

    #[tokio::test]
    async fn test_missing_database_fails() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("absent.db"));
        let result = db.with_connection(|_conn| Ok(())).await;
        assert!(result.is_err());
    }
}
