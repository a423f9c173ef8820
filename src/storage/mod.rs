//! Storage layer for Ferrous KV
//!
//! Maps Redis-like commands onto parameterized statements against a
//! relational backend, and encodes values for its single value column.

pub mod backend;
pub mod commands;
pub mod engine;
pub mod pattern;
pub mod sqlite;
pub mod value;

pub use backend::{Backend, Row, SqlValue, Statement};
pub use commands::{Namespace, SetOptions};
pub use engine::KvStore;
pub use pattern::{to_match_pattern, MatchPattern};
pub use sqlite::SqliteBackend;
