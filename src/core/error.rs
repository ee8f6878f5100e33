/// Error Module
///
/// This module defines the error types used across the interpreter.
/// It provides structured error handling with proper error propagation and
/// user-friendly error messages.
use thiserror::Error;

/// Error type covering every failure scenario in the interpreter:
/// - Connectivity (a session could not be acquired or is gone)
/// - Database driver errors from the bundled SQLite backend
/// - Query execution and cursor iteration
/// - Configuration loading and validation
/// - I/O and JSON serialization
#[derive(Error, Debug)]
pub enum RunqlError {
    /// Connection acquisition failures and use of a closed session
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Driver-level errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// SQL execution errors (rejected statement, fault mid-iteration)
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic application errors for unexpected conditions
    #[error("Application error: {0}")]
    App(String),
}

/// Type alias for Result to use RunqlError as the error type.
///
/// This provides a consistent error type across the entire crate
/// instead of using `Result<T, String>` or mixed error types.
pub type Result<T> = std::result::Result<T, RunqlError>;
