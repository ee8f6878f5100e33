/// Bundled SQLite driver
///
/// Implements the connector capability traits over rusqlite. Queries
/// execute eagerly into a buffered cursor: rusqlite statements borrow their
/// connection, so rows are collected up front and handed out through an
/// owned handle. Interruption goes through rusqlite's `InterruptHandle`,
/// which is safe to invoke from another thread while a statement is
/// stepping.
use crate::config::{Properties, URL_KEY};
use crate::core::db::{ClientSession, Connector, QueryHandle};
use crate::core::{Result, RunqlError};
use rusqlite::{types::ValueRef, Connection};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Connector for SQLite databases. The connection URL property is the
/// database file path, or `:memory:`.
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, properties: &Properties) -> Result<Arc<dyn ClientSession>> {
        let path = properties.get(URL_KEY);
        let conn = Connection::open(path).map_err(|e| {
            RunqlError::Connectivity(format!("failed to open database '{}': {}", path, e))
        })?;
        debug!("opened sqlite session at '{}'", path);

        let interrupt = conn.get_interrupt_handle();
        Ok(Arc::new(SqliteSession {
            conn: Mutex::new(Some(conn)),
            interrupt,
        }))
    }
}

/// A live SQLite session. The connection slot empties on close; the
/// interrupt handle outlives it harmlessly (interrupting a closed
/// connection is a no-op in rusqlite).
pub struct SqliteSession {
    conn: Mutex<Option<Connection>>,
    interrupt: rusqlite::InterruptHandle,
}

impl ClientSession for SqliteSession {
    fn execute(&self, sql: &str) -> Result<Box<dyn QueryHandle>> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| RunqlError::App("Failed to acquire session lock".to_string()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| RunqlError::Connectivity("session is closed".to_string()))?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| RunqlError::Query(format!("Failed to prepare statement: {}", e)))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(value_to_text(row.get_ref(i)?));
                }
                Ok(values)
            })
            .map_err(|e| RunqlError::Query(format!("Query execution failed: {}", e)))?
            .collect::<std::result::Result<VecDeque<_>, _>>()
            .map_err(|e| RunqlError::Query(format!("Result processing failed: {}", e)))?;

        Ok(Box::new(SqliteQuery {
            columns,
            rows,
            closed: false,
        }))
    }

    fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    fn close(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| RunqlError::App("Failed to acquire session lock".to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| RunqlError::Database(e))?;
            debug!("closed sqlite session");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_none()).unwrap_or(true)
    }
}

/// Buffered statement/cursor pair produced by one execute call. The
/// statement itself is released as soon as the rows are collected; the
/// handle keeps the cursor contract over the buffer.
struct SqliteQuery {
    columns: Vec<String>,
    rows: VecDeque<Vec<Option<String>>>,
    closed: bool,
}

impl QueryHandle for SqliteQuery {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>> {
        if self.closed {
            return Err(RunqlError::Query("result cursor is closed".to_string()));
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Renders a SQLite value as a nullable display string. SQL NULL maps to
/// `None` so the formatter decides how empty cells look.
fn value_to_text(value: ValueRef) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Some(format!("<BLOB: {} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn memory_session() -> Arc<dyn ClientSession> {
        let mut values = HashMap::new();
        values.insert(URL_KEY.to_string(), ":memory:".to_string());
        let properties = Properties::from_map(values);
        SqliteConnector.connect(&properties).unwrap()
    }

    fn seed(session: &Arc<dyn ClientSession>) {
        for sql in [
            "CREATE TABLE t (id INTEGER, name TEXT, score REAL)",
            "INSERT INTO t VALUES (1, 'Alice', 12.5)",
            "INSERT INTO t VALUES (2, NULL, NULL)",
        ] {
            session.execute(sql).unwrap().close().unwrap();
        }
    }

    #[test]
    fn test_execute_collects_columns_and_rows() {
        let session = memory_session();
        seed(&session);

        let mut query = session.execute("SELECT * FROM t ORDER BY id").unwrap();
        assert_eq!(query.columns(), vec!["id", "name", "score"]);

        let first = query.next_row().unwrap().unwrap();
        assert_eq!(
            first,
            vec![
                Some("1".to_string()),
                Some("Alice".to_string()),
                Some("12.5".to_string())
            ]
        );

        // SQL NULL comes through as None, not as a "NULL" string
        let second = query.next_row().unwrap().unwrap();
        assert_eq!(second, vec![Some("2".to_string()), None, None]);

        assert_eq!(query.next_row().unwrap(), None);
    }

    #[test]
    fn test_blob_values_are_summarized() {
        let session = memory_session();
        session
            .execute("CREATE TABLE blobs (data BLOB)")
            .unwrap()
            .close()
            .unwrap();
        session
            .execute("INSERT INTO blobs VALUES (X'48656C6C6F')")
            .unwrap()
            .close()
            .unwrap();

        let mut query = session.execute("SELECT data FROM blobs").unwrap();
        let row = query.next_row().unwrap().unwrap();
        assert_eq!(row, vec![Some("<BLOB: 5 bytes>".to_string())]);
    }

    #[test]
    fn test_rejected_statement_is_query_error() {
        let session = memory_session();
        let result = session.execute("SELECT * FROM nonexistent_table");
        match result {
            Err(RunqlError::Query(msg)) => assert!(msg.contains("no such table")),
            _ => panic!("Expected Query error"),
        }
    }

    #[test]
    fn test_closed_cursor_rejects_iteration() {
        let session = memory_session();
        seed(&session);

        let mut query = session.execute("SELECT * FROM t").unwrap();
        query.close().unwrap();
        assert!(query.is_closed());

        match query.next_row() {
            Err(RunqlError::Query(msg)) => assert!(msg.contains("closed")),
            _ => panic!("Expected Query error"),
        }

        // Closing again is a no-op
        query.close().unwrap();
    }

    #[test]
    fn test_session_close_is_idempotent() {
        let session = memory_session();
        assert!(!session.is_closed());

        session.close().unwrap();
        assert!(session.is_closed());
        session.close().unwrap();

        match session.execute("SELECT 1") {
            Err(RunqlError::Connectivity(msg)) => assert!(msg.contains("closed")),
            _ => panic!("Expected Connectivity error"),
        }
    }

    #[test]
    fn test_interrupt_after_close_is_harmless() {
        let session = memory_session();
        session.close().unwrap();
        session.interrupt();
    }

    #[test]
    fn test_connect_failure_leaves_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut values = HashMap::new();
        // A directory is not a database file
        values.insert(
            URL_KEY.to_string(),
            dir.path().to_string_lossy().to_string(),
        );
        let properties = Properties::from_map(values);

        match SqliteConnector.connect(&properties) {
            Err(RunqlError::Connectivity(msg)) => assert!(msg.contains("failed to open")),
            _ => panic!("Expected Connectivity error"),
        }
    }

    #[test]
    fn test_file_backed_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver_test.db");
        let mut values = HashMap::new();
        values.insert(URL_KEY.to_string(), path.to_string_lossy().to_string());
        let properties = Properties::from_map(values);

        let session = SqliteConnector.connect(&properties).unwrap();
        seed(&session);
        let mut query = session.execute("SELECT COUNT(*) FROM t").unwrap();
        let row = query.next_row().unwrap().unwrap();
        assert_eq!(row, vec![Some("2".to_string())]);
    }
}
