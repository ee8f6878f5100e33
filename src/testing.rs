/// # Testing Module
///
/// Connector test doubles for exercising the interpreter without a real
/// database. The mock session records every executed statement and exposes
/// per-statement resource probes, so tests can verify that statements and
/// cursors are released on every path — the dominant correctness property
/// of the lifecycle manager.
///
/// This module provides:
/// - `MockConnector`: an injectable `Connector` with scripted results and
///   failure modes (refused connect, rejected statement, mid-cursor fault,
///   a cursor that blocks until interrupted)
/// - `MockSession` / `ResourceProbe`: closed/interrupted introspection
/// - `fixture_query`: a standalone cursor for formatter tests
use crate::config::Properties;
use crate::core::db::{ClientSession, Connector, QueryHandle, SharedQuery};
use crate::core::{Result, RunqlError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Scripted behavior applied to every session the connector hands out.
#[derive(Debug, Clone, Default)]
struct Fixture {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    fail_execute: Option<String>,
    fail_after_rows: Option<usize>,
    hold_open: bool,
}

/// Closed-state flags for one statement/cursor pair. Shared between the
/// query handle, its session, and the test making assertions.
#[derive(Debug, Default)]
pub struct ResourceProbe {
    statement_closed: AtomicBool,
    cursor_closed: AtomicBool,
}

impl ResourceProbe {
    pub fn statement_closed(&self) -> bool {
        self.statement_closed.load(Ordering::SeqCst)
    }

    pub fn cursor_closed(&self) -> bool {
        self.cursor_closed.load(Ordering::SeqCst)
    }

    fn close_all(&self) {
        self.statement_closed.store(true, Ordering::SeqCst);
        self.cursor_closed.store(true, Ordering::SeqCst);
    }
}

/// Injectable connector that manufactures mock sessions and remembers
/// every one of them for later inspection. Clones share all state.
#[derive(Clone, Default)]
pub struct MockConnector {
    fixture: Arc<Mutex<Fixture>>,
    sessions: Arc<Mutex<Vec<Arc<MockSession>>>>,
    fail_connect: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose sessions answer every query with the given result.
    pub fn with_result(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        let connector = Self::new();
        connector.set_result(columns, rows);
        connector
    }

    pub fn set_result(&self, columns: &[&str], rows: Vec<Vec<Option<&str>>>) {
        let mut fixture = self.fixture.lock().unwrap();
        fixture.columns = columns.iter().map(|c| c.to_string()).collect();
        fixture.rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.map(String::from)).collect())
            .collect();
    }

    /// The next `connect` call fails with a connectivity error.
    pub fn fail_next_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Every subsequent execute is rejected with the given message.
    pub fn fail_execute(&self, message: &str) {
        self.fixture.lock().unwrap().fail_execute = Some(message.to_string());
    }

    /// Cursors fault after serving this many rows.
    pub fn fail_after_rows(&self, rows: usize) {
        self.fixture.lock().unwrap().fail_after_rows = Some(rows);
    }

    /// Exhausted cursors block instead of ending, until the session is
    /// interrupted or the resources are closed. Simulates a long-running
    /// query for cancellation tests.
    pub fn hold_open(&self) {
        self.fixture.lock().unwrap().hold_open = true;
    }

    /// Number of acquire calls served so far.
    pub fn connect_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Every session handed out, in acquisition order.
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

impl Connector for MockConnector {
    fn connect(&self, _properties: &Properties) -> Result<Arc<dyn ClientSession>> {
        if self.fail_connect.swap(false, Ordering::SeqCst) {
            return Err(RunqlError::Connectivity(
                "simulated connection failure".to_string(),
            ));
        }
        let session = Arc::new(MockSession::new(self.fixture.lock().unwrap().clone()));
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(session)
    }
}

/// Fake database session backed by scripted results.
pub struct MockSession {
    fixture: Fixture,
    closed: AtomicBool,
    interrupted: Arc<AtomicBool>,
    probes: Mutex<Vec<Arc<ResourceProbe>>>,
    executed: Mutex<Vec<String>>,
}

impl MockSession {
    fn new(fixture: Fixture) -> Self {
        MockSession {
            fixture,
            closed: AtomicBool::new(false),
            interrupted: Arc::new(AtomicBool::new(false)),
            probes: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Statements submitted to this session, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// One probe per statement this session ever produced.
    pub fn probes(&self) -> Vec<Arc<ResourceProbe>> {
        self.probes.lock().unwrap().clone()
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

impl ClientSession for MockSession {
    fn execute(&self, sql: &str) -> Result<Box<dyn QueryHandle>> {
        if self.is_closed() {
            return Err(RunqlError::Connectivity("session is closed".to_string()));
        }
        self.executed.lock().unwrap().push(sql.to_string());
        // A fresh statement starts un-interrupted, like a real driver
        self.interrupted.store(false, Ordering::SeqCst);

        if let Some(message) = &self.fixture.fail_execute {
            return Err(RunqlError::Query(message.clone()));
        }

        let probe = Arc::new(ResourceProbe::default());
        self.probes.lock().unwrap().push(Arc::clone(&probe));

        Ok(Box::new(MockQuery {
            columns: self.fixture.columns.clone(),
            rows: self.fixture.rows.clone().into(),
            fail_after_rows: self.fixture.fail_after_rows,
            hold_open: self.fixture.hold_open,
            served: 0,
            probe,
            interrupted: Arc::clone(&self.interrupted),
        }))
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        // Closing a session releases every child resource, like a real
        // driver connection would
        for probe in self.probes.lock().unwrap().iter() {
            probe.close_all();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Scripted statement/cursor pair.
struct MockQuery {
    columns: Vec<String>,
    rows: VecDeque<Vec<Option<String>>>,
    fail_after_rows: Option<usize>,
    hold_open: bool,
    served: usize,
    probe: Arc<ResourceProbe>,
    interrupted: Arc<AtomicBool>,
}

impl QueryHandle for MockQuery {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>> {
        loop {
            if self.probe.cursor_closed() {
                return Err(RunqlError::Query("result cursor is closed".to_string()));
            }
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(RunqlError::Query("query interrupted".to_string()));
            }
            if let Some(limit) = self.fail_after_rows {
                if self.served == limit {
                    return Err(RunqlError::Query("simulated cursor fault".to_string()));
                }
            }
            match self.rows.pop_front() {
                Some(row) => {
                    self.served += 1;
                    return Ok(Some(row));
                }
                None if self.hold_open => thread::sleep(Duration::from_millis(1)),
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.probe.close_all();
        self.rows.clear();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.probe.statement_closed() && self.probe.cursor_closed()
    }
}

/// A standalone cursor over a scripted result, for formatter tests that
/// need no session or lifecycle around it.
pub fn fixture_query(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> SharedQuery {
    let connector = MockConnector::with_result(columns, rows);
    let session = connector.connect(&Properties::new()).unwrap();
    let handle = session.execute("select * from fixture").unwrap();
    Arc::new(Mutex::new(handle))
}
