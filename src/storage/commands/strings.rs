//! String and counter statements
//!
//! SET, GET, MSET, MGET and the INCR family.

use super::Namespace;
use crate::storage::backend::{SqlValue, Statement};

/// Options for [`KvStore::set`](crate::KvStore::set)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Only write when the key is absent (an expired key counts as absent)
    pub nx: bool,

    /// Only write when the key is present
    pub xx: bool,

    /// Expire the key this many seconds from now
    pub ex: Option<i64>,
}

impl SetOptions {
    /// Conditional insert
    pub fn nx() -> Self {
        SetOptions { nx: true, ..SetOptions::default() }
    }

    /// Conditional update
    pub fn xx() -> Self {
        SetOptions { xx: true, ..SetOptions::default() }
    }

    /// Relative expiry in seconds
    pub fn ex(seconds: i64) -> Self {
        SetOptions { ex: Some(seconds), ..SetOptions::default() }
    }

    /// Add a relative expiry to these options
    pub fn with_ex(mut self, seconds: i64) -> Self {
        self.ex = Some(seconds);
        self
    }
}

impl Namespace {
    /// SET. Changes one row when the write happened, none when a condition
    /// in `opts` held it back. `nx` and `xx` must not both be set.
    pub fn set(&self, key: &str, value: SqlValue, opts: SetOptions, now: i64) -> Statement {
        let expire_at = opts.ex.map(|secs| now.saturating_add(secs));

        let sql = if opts.xx {
            format!(
                "UPDATE {t} SET value = ?2, expire_at = ?3 WHERE key = ?1 AND {live}",
                t = self.ident,
                live = self.live(4),
            )
        } else if opts.nx {
            format!(
                "INSERT INTO {t} (key, value, expire_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     expire_at = excluded.expire_at
                 WHERE {stale}",
                t = self.ident,
                stale = self.stale(4),
            )
        } else {
            format!(
                "INSERT INTO {t} (key, value, expire_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     expire_at = excluded.expire_at",
                t = self.ident,
            )
        };

        let stmt = Statement::new(sql).bind(key).bind(value).bind(expire_at);
        if opts.xx || opts.nx {
            stmt.bind(now)
        } else {
            stmt
        }
    }

    /// GET: one row with the stored value, or none
    pub fn get(&self, key: &str, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT value FROM {t} WHERE key = ?1 AND {live}",
            t = self.ident,
            live = self.live(2),
        ))
        .bind(key)
        .bind(now)
    }

    /// MSET: a single multi-row upsert. Clears any expiry on the keys.
    pub fn mset(&self, pairs: Vec<(String, SqlValue)>) -> Statement {
        let rows = (0..pairs.len())
            .map(|i| format!("(?{}, ?{}, NULL)", 2 * i + 1, 2 * i + 2))
            .collect::<Vec<_>>()
            .join(", ");

        let mut stmt = Statement::new(format!(
            "INSERT INTO {t} (key, value, expire_at) VALUES {rows}
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expire_at = NULL",
            t = self.ident,
            rows = rows,
        ));
        for (key, value) in pairs {
            stmt = stmt.bind(key).bind(value);
        }
        stmt
    }

    /// MGET: `(key, value)` rows for the live keys among `keys`
    pub fn mget(&self, keys: &[&str], now: i64) -> Statement {
        let mut stmt = Statement::new(format!(
            "SELECT key, value FROM {t} WHERE key IN ({keys}) AND {live}",
            t = self.ident,
            keys = Self::placeholders(2, keys.len()),
            live = self.live(1),
        ))
        .bind(now);
        for key in keys {
            stmt = stmt.bind(*key);
        }
        stmt
    }

    /// INCRBY: start from zero when absent or expired, then add `delta`.
    ///
    /// Returns the new value. Yields no row, and leaves the stored value
    /// alone, when it is not an integer or the sum would leave the `i64`
    /// range.
    pub fn incr_by(&self, key: &str, delta: i64, now: i64) -> Statement {
        // Largest (or smallest) current value the delta can be added to
        let (cmp, bound) = if delta >= 0 {
            ("<=", i64::MAX - delta)
        } else {
            (">=", i64::MIN - delta)
        };

        Statement::new(format!(
            "INSERT INTO {t} (key, value, expire_at) VALUES (?1, ?2, NULL)
             ON CONFLICT(key) DO UPDATE SET
                 value = CASE WHEN {stale} THEN excluded.value ELSE {t}.value + excluded.value END,
                 expire_at = CASE WHEN {stale} THEN NULL ELSE {t}.expire_at END
             WHERE {stale} OR (typeof({t}.value) = 'integer' AND {t}.value {cmp} ?4)
             RETURNING value",
            t = self.ident,
            stale = self.stale(3),
            cmp = cmp,
        ))
        .bind(key)
        .bind(delta)
        .bind(now)
        .bind(bound)
    }
}
