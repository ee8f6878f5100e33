use crate::core::Result;
use serde::Serialize;

/// Result envelope returned for every interpreted query.
///
/// The envelope carries a status code, a type tag describing how the
/// message body is framed, and the body itself. It is the only thing a
/// caller ever sees: failures are reported through it, never thrown past
/// it.

/// Outcome of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    Success,
    Error,
}

/// Framing of the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultKind {
    /// Header line of column names followed by one line per row,
    /// tab-separated.
    Table,
    /// Plain lines of text (plan output, error messages).
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpreterResult {
    code: ResultCode,
    #[serde(rename = "type")]
    kind: ResultKind,
    message: String,
}

impl InterpreterResult {
    /// Builds a successful envelope with the given framing and body.
    pub fn success(kind: ResultKind, message: String) -> Self {
        InterpreterResult {
            code: ResultCode::Success,
            kind,
            message,
        }
    }

    /// Builds an error envelope. Error bodies are always plain text.
    pub fn error(message: String) -> Self {
        InterpreterResult {
            code: ResultCode::Error,
            kind: ResultKind::Text,
            message,
        }
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Serializes the envelope for transport, e.g. to a notebook frontend.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
