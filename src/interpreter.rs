use crate::completer;
use crate::config::{Properties, DRIVER_KEY};
use crate::core::db::{connector_for, ClientSession, Connector, SharedQuery};
use crate::core::{Result, RunqlError};
use crate::format;
use crate::result::InterpreterResult;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};
use uuid::Uuid;

/// SQL Interpreter
///
/// Owns at most one live database session and adapts the generic
/// "run a query, format the result" interface to it. The lifecycle
/// contract:
///
/// - `open()` is idempotent: an already-held session is fully released
///   before a new one is acquired, so N calls acquire N sessions and
///   release the N−1 intermediate ones.
/// - `close()` releases every statement/cursor still open, then the
///   session itself. Closing an already-closed interpreter is a no-op.
/// - `cancel()` interrupts the in-flight query and releases its
///   statement/cursor, but leaves the session open for the next query.
///
/// Lifecycle transitions serialize behind the session mutex; in-flight
/// query handles are tracked separately so a concurrent `cancel`/`close`
/// can release them between row fetches.

/// Identifies one interpret/cancel exchange, standing in for the caller's
/// paragraph or cell context. Used for log correlation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    id: Uuid,
}

impl ExecutionContext {
    pub fn new() -> Self {
        ExecutionContext { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SqlInterpreter {
    properties: Properties,
    connector: Box<dyn Connector>,
    session: Mutex<Option<Arc<dyn ClientSession>>>,
    inflight: Mutex<Vec<SharedQuery>>,
}

impl SqlInterpreter {
    /// Creates an interpreter using the connector named by the `driver`
    /// property. Unknown driver names are a configuration error.
    pub fn new(properties: Properties) -> Result<Self> {
        let driver = properties.get(DRIVER_KEY);
        let connector = connector_for(driver)
            .ok_or_else(|| RunqlError::Config(format!("unknown driver '{}'", driver)))?;
        Ok(Self::with_connector(properties, connector))
    }

    /// Creates an interpreter over an externally supplied connector. This
    /// is the seam test doubles and embedder-provided drivers plug into.
    pub fn with_connector(properties: Properties, connector: Box<dyn Connector>) -> Self {
        SqlInterpreter {
            properties,
            connector,
            session: Mutex::new(None),
            inflight: Mutex::new(Vec::new()),
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Acquires a session, releasing any previously held one first. Safe
    /// to call repeatedly; the interpreter never holds two sessions at
    /// once. An acquisition failure leaves no session behind.
    pub fn open(&self) -> Result<()> {
        let mut session = self.lock_session()?;
        if let Some(old) = session.take() {
            old.interrupt();
            self.release_inflight()?;
            old.close()?;
            debug!("released previously held session before reopening");
        }
        *session = Some(self.connector.connect(&self.properties)?);
        info!("session opened");
        Ok(())
    }

    /// Releases every statement/cursor still open and then the session.
    /// Closing an already-closed interpreter is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut session = self.lock_session()?;
        if let Some(conn) = session.as_ref() {
            conn.interrupt();
        }
        self.release_inflight()?;
        if let Some(conn) = session.take() {
            conn.close()?;
            info!("session closed");
        }
        Ok(())
    }

    /// Interrupts the in-flight query and releases its statement/cursor.
    /// The session is left open and usable for subsequent queries.
    pub fn cancel(&self, ctx: &ExecutionContext) -> Result<()> {
        debug!("cancel requested for context {}", ctx.id());
        {
            let session = self.lock_session()?;
            if let Some(conn) = session.as_ref() {
                conn.interrupt();
            }
        }
        self.release_inflight()
    }

    /// Executes a query against the held session and renders the result.
    /// Every failure is reported through the envelope; the statement and
    /// cursor are released on every path before this returns.
    pub fn interpret(&self, query: &str, ctx: &ExecutionContext) -> InterpreterResult {
        debug!("interpreting query for context {}", ctx.id());
        match self.run_query(query) {
            Ok(result) => result,
            Err(e) => {
                error!("query failed: {}", e);
                InterpreterResult::error(e.to_string())
            }
        }
    }

    /// Keyword completion for the buffer prefix at the given cursor
    /// offset.
    pub fn completion(&self, buf: &str, cursor: usize) -> BTreeSet<String> {
        completer::complete(buf, cursor)
    }

    /// Reports whether a session is currently held.
    pub fn is_open(&self) -> bool {
        self.session
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn run_query(&self, query: &str) -> Result<InterpreterResult> {
        if query.trim().is_empty() {
            return Err(RunqlError::Query(
                "cannot execute an empty query".to_string(),
            ));
        }

        let session = {
            let guard = self.lock_session()?;
            guard.as_ref().cloned()
        }
        .ok_or_else(|| {
            RunqlError::Connectivity("no open session; call open() first".to_string())
        })?;

        let handle = session.execute(query)?;
        let shared: SharedQuery = Arc::new(Mutex::new(handle));
        self.lock_inflight()?.push(Arc::clone(&shared));

        let max_rows = self.properties.max_result_rows();
        let rendered = format::render(query, &shared, max_rows);
        let released = self.release_handle(&shared);

        match (rendered, released) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(result), Ok(())) => Ok(result),
        }
    }

    /// Closes one handle and drops it from the in-flight list,
    /// unconditionally on success or failure of either step.
    fn release_handle(&self, handle: &SharedQuery) -> Result<()> {
        let closed = handle
            .lock()
            .map_err(|_| RunqlError::App("Failed to acquire query handle lock".to_string()))
            .and_then(|mut guard| guard.close());
        if let Ok(mut inflight) = self.inflight.lock() {
            inflight.retain(|tracked| !Arc::ptr_eq(tracked, handle));
        }
        closed
    }

    /// Closes every tracked handle, keeping going past individual
    /// failures so nothing is left open, and reports the first error.
    fn release_inflight(&self) -> Result<()> {
        let handles: Vec<SharedQuery> = self.lock_inflight()?.drain(..).collect();
        let mut first_err = None;
        for handle in handles {
            match handle.lock() {
                Ok(mut guard) => {
                    if let Err(e) = guard.close() {
                        first_err.get_or_insert(e);
                    }
                }
                Err(_) => {
                    first_err.get_or_insert(RunqlError::App(
                        "Failed to acquire query handle lock".to_string(),
                    ));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Option<Arc<dyn ClientSession>>>> {
        self.session
            .lock()
            .map_err(|_| RunqlError::App("Failed to acquire session lock".to_string()))
    }

    fn lock_inflight(&self) -> Result<MutexGuard<'_, Vec<SharedQuery>>> {
        self.inflight
            .lock()
            .map_err(|_| RunqlError::App("Failed to acquire query tracking lock".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ResultCode, ResultKind};
    use crate::testing::MockConnector;

    fn interpreter_with(connector: &MockConnector) -> SqlInterpreter {
        SqlInterpreter::with_connector(Properties::new(), Box::new(connector.clone()))
    }

    #[test]
    fn test_unknown_driver_is_config_error() {
        // The default driver name has no bundled connector
        match SqlInterpreter::new(Properties::new()) {
            Err(RunqlError::Config(msg)) => assert!(msg.contains("unknown driver")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_interpret_without_open_reports_connectivity() {
        let connector = MockConnector::new();
        let interpreter = interpreter_with(&connector);

        let result = interpreter.interpret("select 1", &ExecutionContext::new());
        assert_eq!(result.code(), ResultCode::Error);
        assert!(result.message().contains("no open session"));
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let connector = MockConnector::with_result(&["col1"], vec![vec![Some("val11")]]);
        let interpreter = interpreter_with(&connector);
        interpreter.open().unwrap();

        let result = interpreter.interpret("   ", &ExecutionContext::new());
        assert_eq!(result.code(), ResultCode::Error);
        assert!(result.message().contains("empty query"));
    }

    #[test]
    fn test_happy_path_renders_table() {
        let connector = MockConnector::with_result(&["col1"], vec![vec![Some("val11")]]);
        let interpreter = interpreter_with(&connector);
        interpreter.open().unwrap();
        assert!(interpreter.is_open());

        let result = interpreter.interpret("select * from t", &ExecutionContext::new());
        assert_eq!(result.code(), ResultCode::Success);
        assert_eq!(result.kind(), ResultKind::Table);
        assert_eq!(result.message(), "col1\nval11\n");

        let session = connector.last_session().unwrap();
        assert_eq!(session.executed_sql(), vec!["select * from t"]);

        interpreter.close().unwrap();
        assert!(!interpreter.is_open());
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let connector = MockConnector::new();
        let interpreter = interpreter_with(&connector);
        interpreter.close().unwrap();
        interpreter.close().unwrap();
        assert_eq!(connector.connect_count(), 0);
    }

    #[test]
    fn test_failed_acquire_leaves_no_session() {
        let connector = MockConnector::new();
        connector.fail_next_connect();
        let interpreter = interpreter_with(&connector);

        match interpreter.open() {
            Err(RunqlError::Connectivity(_)) => {}
            _ => panic!("Expected Connectivity error"),
        }
        assert!(!interpreter.is_open());

        // The next attempt succeeds and holds exactly one session
        interpreter.open().unwrap();
        assert!(interpreter.is_open());
    }
}
