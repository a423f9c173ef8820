//! Ferrous KV library
//!
//! Redis-like strings, counters, lists, hashes and expiring keys stored in
//! a relational database. All durability and isolation come from the
//! backend; this crate maps each command onto parameterized statements.

pub mod error;
pub mod storage;
pub mod config;

// Re-export commonly used types
pub use error::{BackendError, CommandError, KvError, Result};
pub use storage::{Backend, KvStore, SetOptions, SqliteBackend};
pub use config::{Config, SqliteConfig, StoreConfig};
