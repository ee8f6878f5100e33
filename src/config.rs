use crate::core::{Result, RunqlError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Interpreter configuration: a flat, string-keyed property map.
///
/// Properties are read once at construction and immutable thereafter. Every
/// key has a documented default, so an empty map is a valid configuration.
/// The row cap is the one value re-read on every query.

/// Selects the wire driver. The bundled driver is `sqlite`; any other name
/// must be satisfied by an injected connector.
pub const DRIVER_KEY: &str = "driver";
/// Target host/database. The bundled SQLite driver treats this as a file
/// path (or `:memory:`).
pub const URL_KEY: &str = "url";
/// Authentication principal.
pub const USER_KEY: &str = "user";
/// Authentication credential.
pub const PASSWORD_KEY: &str = "password";
/// Maximum number of data rows the formatter will emit per query.
pub const MAX_RESULT_KEY: &str = "max_result_rows";

pub const DEFAULT_DRIVER: &str = "mysql";
pub const DEFAULT_URL: &str = "jdbc:mysql://localhost:3306/";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "";
pub const DEFAULT_MAX_RESULT_ROWS: usize = 1000;

/// Immutable defaults table consulted for any key missing from the map.
const DEFAULTS: &[(&str, &str)] = &[
    (DRIVER_KEY, DEFAULT_DRIVER),
    (URL_KEY, DEFAULT_URL),
    (USER_KEY, DEFAULT_USER),
    (PASSWORD_KEY, DEFAULT_PASSWORD),
    (MAX_RESULT_KEY, "1000"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    /// Creates an empty property set; every lookup falls through to the
    /// defaults table.
    pub fn new() -> Self {
        Properties {
            values: HashMap::new(),
        }
    }

    /// Builds properties from an existing string map.
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Properties { values }
    }

    /// Parses properties from a flat TOML document of string values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RunqlError::Config(format!("invalid properties file: {}", e)))
    }

    /// Loads properties from a TOML file at the given path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use runql::config::Properties;
    /// let props = Properties::load("runql.toml").expect("Failed to load properties");
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Consuming builder: returns the properties with one value replaced.
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Looks up a property value, falling back to the defaults table.
    /// Unknown keys with no default resolve to the empty string.
    pub fn get(&self, key: &str) -> &str {
        if let Some(value) = self.values.get(key) {
            return value;
        }
        DEFAULTS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| *value)
            .unwrap_or("")
    }

    /// The formatter row cap for the next query. Unparseable values fall
    /// back to the default cap.
    pub fn max_result_rows(&self) -> usize {
        self.get(MAX_RESULT_KEY)
            .parse()
            .unwrap_or(DEFAULT_MAX_RESULT_ROWS)
    }
}
