//! Configuration module for Ferrous KV
//!
//! Provides the store and backend configuration, loadable from a
//! Redis-style configuration file or built in code.

mod parser;

pub use parser::{parse_config_file, parse_config_str, ConfigParseError};

use std::path::PathBuf;

/// Table used when none is configured
pub const DEFAULT_TABLE: &str = "kv";

/// Main configuration structure for Ferrous KV
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Namespace configuration
    pub store: StoreConfig,

    /// SQLite backend configuration
    pub sqlite: SqliteConfig,
}

/// Namespace configuration for a [`KvStore`](crate::KvStore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Table holding this namespace's keys
    pub table: String,

    /// Create the table when the store is constructed instead of on first use
    pub initialize: bool,
}

/// SQLite backend configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,

    /// How long a statement waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            table: DEFAULT_TABLE.to_string(),
            initialize: false,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        SqliteConfig {
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    /// Configuration for the given table with lazy initialization
    pub fn new(table: impl Into<String>) -> Self {
        StoreConfig {
            table: table.into(),
            initialize: false,
        }
    }

    /// Request eager table creation
    pub fn initialize(mut self, initialize: bool) -> Self {
        self.initialize = initialize;
        self
    }

    /// Check that the table name is usable as an SQL identifier
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_table_name(&self.table)
    }
}

impl SqliteConfig {
    /// Configuration for an on-disk database
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SqliteConfig {
            path: Some(path.into()),
            ..SqliteConfig::default()
        }
    }

    /// Set the busy timeout
    pub fn busy_timeout_ms(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = millis;
        self
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = parse_config_file(&path)?;
        config.store.validate()?;
        Ok(config)
    }
}

/// Table names are interpolated into statement text, so only plain
/// identifiers are accepted.
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTable(name.to_string()))
    }
}

/// Errors that can occur during configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file parse error
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ConfigParseError),

    /// Table name is not a plain identifier
    #[error("Invalid table name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTable(String),
}
