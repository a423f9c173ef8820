//! Command to statement mapping
//!
//! Each command is expressed as one or more parameterized statements
//! against a single namespace table. Builders are grouped by data type and
//! never touch the backend; [`KvStore`](crate::KvStore) runs what they
//! produce.
//!
//! Every builder takes the current time in epoch seconds so that expired
//! rows can be filtered out (lazy expiry) and stale rows replaced on write.

pub mod strings;
pub mod keys;
pub mod lists;
pub mod hashes;

pub use strings::SetOptions;

/// `json_type` of a list document
pub const LIST_TYPE: &str = "array";

/// `json_type` of a hash document
pub const HASH_TYPE: &str = "object";

/// Statement builders bound to one namespace table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    table: String,
    ident: String,
}

impl Namespace {
    /// Bind builders to `table`, which must already be a validated identifier
    pub(crate) fn new(table: &str) -> Self {
        Namespace {
            table: table.to_string(),
            ident: format!("\"{}\"", table),
        }
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Schema definition: the table plus an index on `expire_at`.
    ///
    /// `value` is declared without a type so SQLite keeps REAL and TEXT
    /// storage classes exactly as bound.
    pub fn schema(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                key TEXT PRIMARY KEY NOT NULL,
                value NOT NULL,
                expire_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS \"{table}_expire_at\" ON {t} (expire_at);",
            t = self.ident,
            table = self.table,
        )
    }

    /// Row is visible at the time bound to `?{now}`
    fn live(&self, now: usize) -> String {
        format!(
            "({t}.expire_at IS NULL OR {t}.expire_at > ?{now})",
            t = self.ident,
            now = now,
        )
    }

    /// Existing row expired at the time bound to `?{now}`
    fn stale(&self, now: usize) -> String {
        format!(
            "({t}.expire_at IS NOT NULL AND {t}.expire_at <= ?{now})",
            t = self.ident,
            now = now,
        )
    }

    /// Current document is a list
    fn is_list(&self) -> String {
        format!("json_type({t}.value) = '{ty}'", t = self.ident, ty = LIST_TYPE)
    }

    /// Current document is a hash
    fn is_hash(&self) -> String {
        format!("json_type({t}.value) = '{ty}'", t = self.ident, ty = HASH_TYPE)
    }

    /// `?{first}, ?{first + 1}, ...` for `count` parameters
    fn placeholders(first: usize, count: usize) -> String {
        (first..first + count)
            .map(|n| format!("?{}", n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
