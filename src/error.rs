//! Error types for Ferrous KV
//!
//! This module defines the error types surfaced by the key-value layer.
//! Backend failures are passed through untouched; a missing key is never
//! an error.

use std::fmt;
use std::error::Error as StdError;

use crate::config::ConfigError;

/// Main error type for Ferrous KV operations
#[derive(Debug)]
pub enum KvError {
    /// Creating the namespace table failed
    Init {
        /// Table that was being created
        table: String,
        /// Underlying backend failure
        source: BackendError,
    },

    /// A statement or batch was rejected by the backend
    Backend(BackendError),

    /// Stored text could not be parsed, or a value could not be serialized
    Codec(serde_json::Error),

    /// Command-level errors
    Command(CommandError),

    /// Invalid store configuration
    Config(ConfigError),
}

/// Command-specific errors that map to Redis error responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Operation against a key holding the wrong kind of value
    WrongType,

    /// Value is not an integer or out of range
    NotInteger,

    /// Increment or decrement would leave the `i64` range
    Overflow,

    /// Invalid argument for command
    InvalidArgument(String),
}

/// Errors raised by a [`Backend`](crate::storage::Backend) implementation
#[derive(Debug)]
pub enum BackendError {
    /// SQLite rejected the statement
    Sqlite(rusqlite::Error),

    /// The blocking task running the statement panicked or was cancelled
    Task(String),

    /// Any other backend failure
    Other(Box<dyn StdError + Send + Sync>),
}

/// Type alias for Results throughout Ferrous KV
pub type Result<T> = std::result::Result<T, KvError>;

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::Init { table, source } => {
                write!(f, "failed to initialize table '{}': {}", table, source)
            }
            KvError::Backend(err) => write!(f, "Backend error: {}", err),
            KvError::Codec(err) => write!(f, "Codec error: {}", err),
            KvError::Command(err) => write!(f, "{}", err),
            KvError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::WrongType => {
                write!(f, "WRONGTYPE Operation against a key holding the wrong kind of value")
            }
            CommandError::NotInteger => {
                write!(f, "ERR value is not an integer or out of range")
            }
            CommandError::Overflow => {
                write!(f, "ERR increment or decrement would overflow")
            }
            CommandError::InvalidArgument(msg) => {
                write!(f, "ERR invalid argument: {}", msg)
            }
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Sqlite(err) => write!(f, "{}", err),
            BackendError::Task(msg) => write!(f, "blocking task failed: {}", msg),
            BackendError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for KvError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            KvError::Init { source, .. } => Some(source),
            KvError::Backend(err) => Some(err),
            KvError::Codec(err) => Some(err),
            KvError::Command(err) => Some(err),
            KvError::Config(err) => Some(err),
        }
    }
}

impl StdError for CommandError {}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BackendError::Sqlite(err) => Some(err),
            BackendError::Task(_) => None,
            BackendError::Other(err) => Some(&**err),
        }
    }
}

// Conversion implementations
impl From<BackendError> for KvError {
    fn from(err: BackendError) -> Self {
        KvError::Backend(err)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        BackendError::Sqlite(err)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(err: rusqlite::Error) -> Self {
        KvError::Backend(BackendError::Sqlite(err))
    }
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Codec(err)
    }
}

impl From<ConfigError> for KvError {
    fn from(err: ConfigError) -> Self {
        KvError::Config(err)
    }
}

impl From<CommandError> for KvError {
    fn from(err: CommandError) -> Self {
        KvError::Command(err)
    }
}
