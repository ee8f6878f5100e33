/// Database Module
///
/// This module provides the connector capability layer the interpreter runs
/// on, organized into focused submodules:
///
/// - **Capability traits** (this file): `Connector`, `ClientSession` and
///   `QueryHandle` describe everything the interpreter needs from a wire
///   driver, so a test double can stand in for a real database session.
/// - **SQLite driver** (`sqlite.rs`): the bundled rusqlite-backed
///   implementation of the capability traits.
///
/// All database operations use the standardized `RunqlError` type for
/// consistent error propagation.
use crate::config::Properties;
use crate::core::Result;
use std::sync::{Arc, Mutex};

pub mod sqlite;

/// A statement together with its result cursor, shared between the
/// executing thread and concurrent `cancel`/`close` calls.
pub type SharedQuery = Arc<Mutex<Box<dyn QueryHandle>>>;

/// Capability to acquire database sessions.
///
/// The interpreter never opens a connection directly; it asks its
/// `Connector` for one. Tests inject a fake implementation, production code
/// resolves one from the configured driver name via [`connector_for`].
pub trait Connector: Send + Sync {
    /// Acquires a new live session. Failures are connectivity errors and
    /// must leave no half-open state behind.
    fn connect(&self, properties: &Properties) -> Result<Arc<dyn ClientSession>>;
}

/// A live database session.
///
/// Implementations use interior mutability: the interpreter shares one
/// session between the executing thread and lifecycle calls.
pub trait ClientSession: Send + Sync {
    /// Submits a query and returns the statement/cursor pair for it.
    fn execute(&self, sql: &str) -> Result<Box<dyn QueryHandle>>;

    /// Best-effort interruption of whatever the session is currently
    /// executing. Thread-safe, never closes the session itself.
    fn interrupt(&self);

    /// Releases the session. Closing an already-closed session is a no-op.
    fn close(&self) -> Result<()>;

    /// Reports whether the session has been closed.
    fn is_closed(&self) -> bool;
}

/// A submitted statement and its forward-only result cursor.
pub trait QueryHandle: Send {
    /// Column names of the result, known up front.
    fn columns(&self) -> Vec<String>;

    /// Fetches the next row, `None` when the cursor is exhausted. Rows are
    /// ordered sequences of nullable column values. Calling this on a
    /// closed handle is an iteration error.
    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>>;

    /// Releases the statement and its cursor. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Reports whether the statement and cursor have been released.
    fn is_closed(&self) -> bool;
}

/// Resolves a driver name from the configuration to a bundled connector.
///
/// Currently only `sqlite` ships with the crate; other drivers are supplied
/// by the embedding application through
/// [`SqlInterpreter::with_connector`](crate::interpreter::SqlInterpreter::with_connector).
pub fn connector_for(driver: &str) -> Option<Box<dyn Connector>> {
    match driver {
        "sqlite" => Some(Box::new(sqlite::SqliteConnector)),
        _ => None,
    }
}
