use crate::core::db::SharedQuery;
use crate::core::{Result, RunqlError};
use crate::result::{InterpreterResult, ResultKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Result Formatter
///
/// Consumes a row cursor and produces a bounded, sanitized text
/// representation. Regular queries render as a TABLE: a header line of
/// column names followed by one line per data row, fields separated by a
/// tab, every row terminated by a newline. Plan/explain queries render as
/// TEXT: the first column's values, one per line, no header.
///
/// At most `max_rows` data rows are emitted; the cursor is never consumed
/// past the cap, so callers can release the remainder cheaply.

/// Separator between fields of a table row.
pub const FIELD_SEPARATOR: &str = "\t";
/// Terminator after every emitted row, including the last.
pub const ROW_SEPARATOR: char = '\n';

static PLAN_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*explain\b").unwrap());

/// Recognizes queries that describe execution strategy rather than return
/// data rows.
pub fn is_plan_query(sql: &str) -> bool {
    PLAN_QUERY.is_match(sql)
}

/// Replaces every tab and newline inside a field with a single space, so a
/// field can never break the tab-separated, newline-terminated framing.
pub fn sanitize_field(value: &str) -> String {
    value.replace('\t', " ").replace('\n', " ")
}

/// Renders the result cursor of `sql` into an envelope, emitting at most
/// `max_rows` data rows.
///
/// The caller keeps ownership of the handle and is responsible for closing
/// it on every path; this function only reads from it.
pub fn render(sql: &str, query: &SharedQuery, max_rows: usize) -> Result<InterpreterResult> {
    if is_plan_query(sql) {
        render_text(query, max_rows)
    } else {
        render_table(query, max_rows)
    }
}

fn render_table(query: &SharedQuery, max_rows: usize) -> Result<InterpreterResult> {
    let columns = lock(query)?.columns();

    let mut message = String::new();
    let header: Vec<String> = columns.iter().map(|name| sanitize_field(name)).collect();
    message.push_str(&header.join(FIELD_SEPARATOR));
    message.push(ROW_SEPARATOR);

    let mut emitted = 0;
    while emitted < max_rows {
        let row = match lock(query)?.next_row()? {
            Some(row) => row,
            None => break,
        };
        let cells: Vec<String> = row
            .iter()
            .map(|value| sanitize_field(value.as_deref().unwrap_or("")))
            .collect();
        message.push_str(&cells.join(FIELD_SEPARATOR));
        message.push(ROW_SEPARATOR);
        emitted += 1;
    }

    Ok(InterpreterResult::success(ResultKind::Table, message))
}

/// Plan output is emitted verbatim: its own tabs and newlines carry the
/// plan's layout, and the single-column TEXT framing has no structure for
/// them to corrupt.
fn render_text(query: &SharedQuery, max_rows: usize) -> Result<InterpreterResult> {
    let mut message = String::new();

    let mut emitted = 0;
    while emitted < max_rows {
        let row = match lock(query)?.next_row()? {
            Some(row) => row,
            None => break,
        };
        message.push_str(row.first().and_then(|value| value.as_deref()).unwrap_or(""));
        message.push(ROW_SEPARATOR);
        emitted += 1;
    }

    Ok(InterpreterResult::success(ResultKind::Text, message))
}

fn lock(
    query: &SharedQuery,
) -> Result<std::sync::MutexGuard<'_, Box<dyn crate::core::db::QueryHandle>>> {
    query
        .lock()
        .map_err(|_| RunqlError::App("Failed to acquire query handle lock".to_string()))
}
