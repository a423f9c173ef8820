//! Key-value store façade
//!
//! [`KvStore`] binds one backend handle to one namespace table. Every
//! command makes sure the table exists, encodes its arguments, runs the
//! statements built by the command mapper and decodes the result. The
//! store keeps no lock of its own; atomicity comes from the backend's
//! upserts and batches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use super::backend::{Backend, Row, SqlValue};
use super::commands::lists::End;
use super::commands::{Namespace, SetOptions, HASH_TYPE, LIST_TYPE};
use super::sqlite::SqliteBackend;
use super::value::{
    decode, decode_deserialize, decode_hash, decode_list, encode, encode_serialize,
};
use crate::config::{Config, StoreConfig};
use crate::error::{CommandError, KvError, Result};

/// Redis-like commands over one namespace table
pub struct KvStore<B> {
    backend: Arc<B>,
    ns: Namespace,
    ready: OnceCell<()>,
}

impl<B: Backend> KvStore<B> {
    /// Create a store over `backend`.
    ///
    /// The table is created on first use, or right away when
    /// `config.initialize` is set.
    pub async fn new(backend: Arc<B>, config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let store = KvStore {
            backend,
            ns: Namespace::new(&config.table),
            ready: OnceCell::new(),
        };

        if config.initialize {
            store.ensure_ready().await?;
        }

        Ok(store)
    }

    /// Namespace table name
    pub fn table(&self) -> &str {
        self.ns.table()
    }

    /// Backend handle shared by this store
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Create the namespace table if needed.
    ///
    /// Only one initialization runs at a time and a success is shared by
    /// every caller. A failure is returned to the caller whose attempt
    /// failed and is not memoized; the next waiting caller makes its own
    /// attempt.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async move {
                tracing::debug!(table = self.ns.table(), "creating namespace table");
                self.backend.exec(&self.ns.schema()).await.map_err(|source| {
                    tracing::warn!(
                        table = self.ns.table(),
                        error = %source,
                        "namespace initialization failed"
                    );
                    KvError::Init {
                        table: self.ns.table().to_string(),
                        source,
                    }
                })
            })
            .await?;
        Ok(())
    }

    /// Whether the namespace table has been created by this store
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    // ----- strings and counters -----

    /// Store `value` at `key`.
    ///
    /// Returns whether the write happened; only `nx`/`xx` can hold it back.
    pub async fn set(&self, key: &str, value: &Value, opts: SetOptions) -> Result<bool> {
        self.set_encoded(key, encode(Some(value))?, opts).await
    }

    /// Store any serializable value at `key`
    pub async fn set_serialized<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        opts: SetOptions,
    ) -> Result<bool> {
        self.set_encoded(key, encode_serialize(value)?, opts).await
    }

    async fn set_encoded(&self, key: &str, value: SqlValue, opts: SetOptions) -> Result<bool> {
        if opts.nx && opts.xx {
            let msg = "NX and XX are mutually exclusive".to_string();
            return Err(CommandError::InvalidArgument(msg).into());
        }

        self.ensure_ready().await?;
        let changed = self.backend.run(self.ns.set(key, value, opts, now())).await?;
        Ok(changed > 0)
    }

    /// Value at `key`, or `None` when absent or expired
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.get_raw(key).await? {
            Some(stored) => Ok(Some(decode(stored)?)),
            None => Ok(None),
        }
    }

    /// Value at `key` deserialized into `T`
    pub async fn get_deserialized<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(stored) => Ok(Some(decode_deserialize(stored)?)),
            None => Ok(None),
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<SqlValue>> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.get(key, now())).await?;
        Ok(row.and_then(first_cell))
    }

    /// Store every pair in one statement. Clears existing expiries.
    pub async fn mset(&self, pairs: &[(&str, Value)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }

        let encoded = pairs
            .iter()
            .map(|(key, value)| Ok((key.to_string(), encode(Some(value))?)))
            .collect::<Result<Vec<_>>>()?;

        self.ensure_ready().await?;
        self.backend.run(self.ns.mset(encoded)).await?;
        Ok(())
    }

    /// Values of the live keys among `keys`; others are left out
    pub async fn mget(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        self.ensure_ready().await?;
        let rows = self.backend.all(self.ns.mget(keys, now())).await?;

        let mut values = HashMap::with_capacity(rows.len());
        for row in rows {
            let mut cells = row.into_iter();
            if let (Some(SqlValue::Text(key)), Some(stored)) = (cells.next(), cells.next()) {
                values.insert(key, decode(stored)?);
            }
        }
        Ok(values)
    }

    /// Add one to the integer at `key`, starting from zero
    pub async fn incr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, 1).await
    }

    /// Subtract one from the integer at `key`, starting from zero
    pub async fn decr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, -1).await
    }

    /// Subtract `delta` from the integer at `key`
    pub async fn decr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let delta = delta.checked_neg().ok_or(CommandError::Overflow)?;
        self.incr_by(key, delta).await
    }

    /// Add `delta` to the integer at `key` in a single upsert.
    ///
    /// The stored value is left unchanged when it is not an integer or the
    /// sum would overflow.
    pub async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.incr_by(key, delta, now())).await?;

        if let Some(SqlValue::Integer(n)) = row.and_then(first_cell) {
            return Ok(n);
        }

        // Skipped update: tell an out-of-range sum from a non-integer value
        match self.get_raw(key).await? {
            Some(SqlValue::Integer(_)) => Err(CommandError::Overflow.into()),
            _ => Err(CommandError::NotInteger.into()),
        }
    }

    // ----- keyspace -----

    /// Delete `keys`; returns how many rows were removed, expired ones included
    pub async fn del(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.ensure_ready().await?;
        Ok(self.backend.run(self.ns.del(keys)).await?)
    }

    /// Number of distinct live keys among `keys`
    pub async fn exists(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.exists(keys, now())).await?;
        Ok(count_cell(row))
    }

    /// Live keys matching a `*` / `?` glob
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.ensure_ready().await?;
        let rows = self.backend.all(self.ns.keys(pattern, now())).await?;

        Ok(rows
            .into_iter()
            .filter_map(first_cell)
            .filter_map(|cell| match cell {
                SqlValue::Text(key) => Some(key),
                _ => None,
            })
            .collect())
    }

    /// Expire `key` after `seconds`; returns false when the key is absent
    pub async fn expire(&self, key: &str, seconds: i64) -> Result<bool> {
        self.ensure_ready().await?;
        let changed = self.backend.run(self.ns.expire(key, seconds, now())).await?;
        Ok(changed > 0)
    }

    /// Remaining seconds to live: -2 when absent, -1 without expiry
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        self.ensure_ready().await?;
        let now = now();
        let row = self.backend.first(self.ns.ttl(key, now)).await?;

        Ok(match row.and_then(first_cell) {
            None => -2,
            Some(SqlValue::Integer(expire_at)) => (expire_at - now).max(0),
            Some(_) => -1,
        })
    }

    /// Drop the expiry of `key`; returns whether one was removed
    pub async fn persist(&self, key: &str) -> Result<bool> {
        self.ensure_ready().await?;
        let changed = self.backend.run(self.ns.persist(key, now())).await?;
        Ok(changed > 0)
    }

    // ----- lists -----

    /// Prepend `value`; returns the new length.
    ///
    /// Fails with [`CommandError::WrongType`] when `key` holds something
    /// other than a list, as do the other list commands.
    pub async fn lpush(&self, key: &str, value: &Value) -> Result<u64> {
        self.push(End::Left, key, value).await
    }

    /// Append `value`; returns the new length
    pub async fn rpush(&self, key: &str, value: &Value) -> Result<u64> {
        self.push(End::Right, key, value).await
    }

    async fn push(&self, end: End, key: &str, value: &Value) -> Result<u64> {
        let element = encode(Some(value))?;
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.push(end, key, element, now())).await?;

        // No row: the conflict update was skipped for a non-list document
        match row {
            Some(row) => Ok(count_of(first_cell(row))),
            None => Err(CommandError::WrongType.into()),
        }
    }

    /// Remove and return the head element
    pub async fn lpop(&self, key: &str) -> Result<Option<Value>> {
        self.pop(End::Left, key).await
    }

    /// Remove and return the tail element
    pub async fn rpop(&self, key: &str) -> Result<Option<Value>> {
        self.pop(End::Right, key).await
    }

    async fn pop(&self, end: End, key: &str) -> Result<Option<Value>> {
        self.ensure_ready().await?;
        let results = self.backend.batch(self.ns.pop(end, key, now())).await?;
        let read = results.into_iter().next().unwrap_or_default();
        element_from(typed_cell(read.into_iter().next(), LIST_TYPE)?)
    }

    /// Elements from `start` to `stop` inclusive; negative indexes count
    /// from the tail and `-1` is the last element
    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Value>> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.lrange(key, start, stop, now())).await?;

        match typed_cell(row, LIST_TYPE)? {
            Some(SqlValue::Null) | None => Ok(Vec::new()),
            Some(elements) => decode_list(elements),
        }
    }

    /// Number of elements, 0 when missing
    pub async fn llen(&self, key: &str) -> Result<u64> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.llen(key, now())).await?;
        Ok(count_of(typed_cell(row, LIST_TYPE)?))
    }

    /// Element at `index`; negative indexes count from the tail
    pub async fn lindex(&self, key: &str, index: i64) -> Result<Option<Value>> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.lindex(key, index, now())).await?;
        element_from(typed_cell(row, LIST_TYPE)?)
    }

    /// Remove occurrences of `element`: all when `count == 0`, the first
    /// `count` from the head when positive, the last `|count|` from the
    /// tail when negative. Returns how many were removed.
    pub async fn lrem(&self, key: &str, count: i64, element: &Value) -> Result<u64> {
        let element = encode(Some(element))?;
        self.ensure_ready().await?;
        let results = self.backend.batch(self.ns.lrem(key, count, element, now())).await?;

        let mut results = results.into_iter().map(|rows| rows.into_iter().next());
        let before = count_of(typed_cell(results.next().flatten(), LIST_TYPE)?);
        let after = count_cell(results.next().flatten());
        Ok(before.saturating_sub(after))
    }

    // ----- hashes -----

    /// Set `field` in the hash at `key`; returns whether the field is new.
    ///
    /// Fails with [`CommandError::WrongType`] when `key` holds something
    /// other than a hash, as do the other hash commands.
    pub async fn hset(&self, key: &str, field: &str, value: &Value) -> Result<bool> {
        let value = encode(Some(value))?;
        self.ensure_ready().await?;
        let results = self.backend.batch(self.ns.hset(key, field, value, now())).await?;
        Ok(!field_existed(results)?)
    }

    /// Value of `field`, or `None` when the key or field is missing
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<Value>> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.hget(key, field, now())).await?;
        element_from(typed_cell(row, HASH_TYPE)?)
    }

    /// Every field of the hash, or `None` when the key is missing
    pub async fn hgetall(&self, key: &str) -> Result<Option<Map<String, Value>>> {
        match self.get_raw(key).await? {
            Some(stored) => Ok(Some(decode_hash(stored)?)),
            None => Ok(None),
        }
    }

    /// Remove `field`; returns whether it existed
    pub async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.ensure_ready().await?;
        let results = self.backend.batch(self.ns.hdel(key, field, now())).await?;
        field_existed(results)
    }

    /// Number of fields, 0 when missing
    pub async fn hlen(&self, key: &str) -> Result<u64> {
        self.ensure_ready().await?;
        let row = self.backend.first(self.ns.hlen(key, now())).await?;
        Ok(count_of(typed_cell(row, HASH_TYPE)?))
    }
}

impl KvStore<SqliteBackend> {
    /// Open the SQLite database from `config` and bind a store to it
    pub async fn open(config: &Config) -> Result<Self> {
        let backend = SqliteBackend::open(&config.sqlite)?;
        KvStore::new(Arc::new(backend), config.store.clone()).await
    }
}

/// Current time in epoch seconds
fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn first_cell(row: Row) -> Option<SqlValue> {
    row.into_iter().next()
}

/// Non-negative count from a single-cell row, 0 when missing
fn count_cell(row: Option<Row>) -> u64 {
    count_of(row.and_then(first_cell))
}

fn count_of(cell: Option<SqlValue>) -> u64 {
    cell.and_then(|cell| cell.as_i64())
        .map(|n| n.max(0) as u64)
        .unwrap_or(0)
}

/// Payload of a `(json_type, payload)` row whose document must be of
/// `expected` type. `None` when the key is missing.
fn typed_cell(row: Option<Row>, expected: &str) -> Result<Option<SqlValue>> {
    let mut cells = match row {
        Some(row) => row.into_iter(),
        None => return Ok(None),
    };

    match cells.next() {
        Some(SqlValue::Text(ty)) if ty == expected => {
            Ok(Some(cells.next().unwrap_or(SqlValue::Null)))
        }
        _ => Err(CommandError::WrongType.into()),
    }
}

/// Decoded list or hash element; SQL NULL means there was none
fn element_from(cell: Option<SqlValue>) -> Result<Option<Value>> {
    match cell {
        None | Some(SqlValue::Null) => Ok(None),
        Some(stored) => Ok(Some(decode(stored)?)),
    }
}

/// Whether the hash existence check leading a batch found the field
fn field_existed(results: Vec<Vec<Row>>) -> Result<bool> {
    let check = results.into_iter().next().and_then(|rows| rows.into_iter().next());
    Ok(count_of(typed_cell(check, HASH_TYPE)?) != 0)
}
