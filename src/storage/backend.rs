//! Backend abstraction
//!
//! The key-value layer never talks to a database driver directly. It builds
//! [`Statement`]s and hands them to a [`Backend`], which owns connections,
//! transactions and durability.

use async_trait::async_trait;

use crate::error::BackendError;

/// A single bound parameter or result cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit float
    Real(f64),

    /// UTF-8 text
    Text(String),
}

/// One result row
pub type Row = Vec<SqlValue>;

/// A parameterized statement template plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text using `?N` placeholders
    pub sql: String,

    /// Values bound to the placeholders, in order
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Create a statement with no parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl SqlValue {
    /// Integer content, if this cell holds one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Text content, if this cell holds text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this cell is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<f64> for SqlValue {
    fn from(n: f64) -> Self {
        SqlValue::Real(n)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Statement execution primitives required by [`KvStore`](crate::KvStore).
///
/// Implementations must be safe to share between tasks. Every method
/// reports backend failures as [`BackendError`]; the caller passes them on
/// unchanged.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run a statement and return its first row, if any
    async fn first(&self, stmt: Statement) -> Result<Option<Row>, BackendError>;

    /// Run a statement and return every row
    async fn all(&self, stmt: Statement) -> Result<Vec<Row>, BackendError>;

    /// Run a statement and return the number of rows it changed
    async fn run(&self, stmt: Statement) -> Result<u64, BackendError>;

    /// Run statements in order as one unit and return each statement's rows.
    ///
    /// Later statements must observe the effects of earlier ones, and no
    /// statement from another caller may execute between them. List pops
    /// read an element and then remove it within one batch; a backend that
    /// cannot keep other callers out of a batch makes concurrent pops of
    /// the same key race.
    async fn batch(&self, stmts: Vec<Statement>) -> Result<Vec<Vec<Row>>, BackendError>;

    /// Execute schema definition text, which may hold several statements
    async fn exec(&self, sql: &str) -> Result<(), BackendError>;
}
