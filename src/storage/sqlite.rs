//! SQLite backend
//!
//! Runs statements on a single SQLite connection behind a mutex. Calls are
//! moved onto tokio's blocking pool so async callers never block a worker
//! thread on disk I/O. Each batch runs in one `IMMEDIATE` transaction while
//! the connection is held, so no other caller's statement can land between
//! the statements of a batch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql, TransactionBehavior};

use super::backend::{Backend, Row, SqlValue, Statement};
use crate::config::SqliteConfig;
use crate::error::BackendError;

/// [`Backend`] implementation on top of `rusqlite`
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open the database described by `config`
    pub fn open(config: &SqliteConfig) -> Result<Self, BackendError> {
        let conn = match &config.path {
            Some(path) => {
                let conn = Connection::open(path)?;
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;",
                )?;
                conn
            }
            None => Connection::open_in_memory()?,
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        // Key globs are case-sensitive; LIKE is not by default.
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;

        tracing::debug!(path = ?config.path, "opened sqlite backend");

        Ok(SqliteBackend {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::open(&SqliteConfig::default())
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut *guard)
        })
        .await
        .map_err(|e| BackendError::Task(e.to_string()))?;

        result.map_err(BackendError::from)
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn first(&self, stmt: Statement) -> Result<Option<Row>, BackendError> {
        self.with_conn(move |conn| {
            let mut rows = query_rows(conn, &stmt, Some(1))?;
            Ok(rows.pop())
        })
        .await
    }

    async fn all(&self, stmt: Statement) -> Result<Vec<Row>, BackendError> {
        self.with_conn(move |conn| query_rows(conn, &stmt, None)).await
    }

    async fn run(&self, stmt: Statement) -> Result<u64, BackendError> {
        self.with_conn(move |conn| {
            tracing::trace!(sql = %stmt.sql, "executing statement");
            let mut prepared = conn.prepare_cached(&stmt.sql)?;
            let changed = prepared.execute(params_from_iter(stmt.params.iter()))?;
            Ok(changed as u64)
        })
        .await
    }

    async fn batch(&self, stmts: Vec<Statement>) -> Result<Vec<Vec<Row>>, BackendError> {
        self.with_conn(move |conn| {
            tracing::debug!(statements = stmts.len(), "running batch");
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut results = Vec::with_capacity(stmts.len());
            for stmt in &stmts {
                results.push(query_rows(&tx, stmt, None)?);
            }
            tx.commit()?;
            Ok(results)
        })
        .await
    }

    async fn exec(&self, sql: &str) -> Result<(), BackendError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute_batch(&sql)).await
    }
}

/// Step a statement, collecting up to `limit` rows
fn query_rows(
    conn: &Connection,
    stmt: &Statement,
    limit: Option<usize>,
) -> rusqlite::Result<Vec<Row>> {
    tracing::trace!(sql = %stmt.sql, "querying statement");
    let mut prepared = conn.prepare_cached(&stmt.sql)?;
    let columns = prepared.column_count();
    let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns);
        for idx in 0..columns {
            cells.push(read_cell(row.get_ref(idx)?));
        }
        out.push(cells);

        if limit.map_or(false, |limit| out.len() >= limit) {
            break;
        }
    }

    Ok(out)
}

fn read_cell(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Integer(n),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Integer(n) => ToSqlOutput::Owned(SqliteValue::Integer(*n)),
            SqlValue::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}
