//! List statements
//!
//! A list is one JSON array document. Elements are encoded individually
//! before they are spliced in, so a string element is held as a JSON
//! string containing its encoded text and comes back out of `json_each`
//! or `json_extract` as that text.

use super::Namespace;
use crate::storage::backend::{SqlValue, Statement};

/// End of the list a push or pop works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// Head (index 0)
    Left,
    /// Tail (last index)
    Right,
}

impl End {
    fn path(self) -> &'static str {
        match self {
            End::Left => "$[0]",
            End::Right => "$[#-1]",
        }
    }
}

/// JSON path of a list index; negative indexes count from the tail
pub fn index_path(index: i64) -> String {
    if index >= 0 {
        format!("$[{}]", index)
    } else {
        format!("$[#-{}]", index.unsigned_abs())
    }
}

impl Namespace {
    /// LPUSH / RPUSH: one upsert that creates or patches the document and
    /// returns the new length. An expired row is replaced. A live row that
    /// is not a list is left alone and no row comes back.
    pub fn push(&self, end: End, key: &str, element: SqlValue, now: i64) -> Statement {
        let patched = match end {
            End::Left => format!(
                "json('[' || json_quote(?2) || CASE WHEN json_array_length({t}.value) = 0 THEN ']' \
                 ELSE ',' || substr(json({t}.value), 2) END)",
                t = self.ident,
            ),
            End::Right => format!("json_insert({t}.value, '$[#]', ?2)", t = self.ident),
        };

        Statement::new(format!(
            "INSERT INTO {t} (key, value, expire_at) VALUES (?1, json_array(?2), NULL)
             ON CONFLICT(key) DO UPDATE SET
                 value = CASE WHEN {stale} THEN excluded.value ELSE {patched} END,
                 expire_at = CASE WHEN {stale} THEN NULL ELSE {t}.expire_at END
             WHERE {is_list} OR {stale}
             RETURNING json_array_length(value)",
            t = self.ident,
            stale = self.stale(3),
            is_list = self.is_list(),
            patched = patched,
        ))
        .bind(key)
        .bind(element)
        .bind(now)
    }

    /// LPOP / RPOP: read the end element, then remove it. Must run as one
    /// batch; the first statement's row carries the document type and the
    /// element (NULL when the list is empty).
    pub fn pop(&self, end: End, key: &str, now: i64) -> Vec<Statement> {
        let read = Statement::new(format!(
            "SELECT json_type(value), json_extract(value, '{path}') FROM {t}
             WHERE key = ?1 AND {live}",
            t = self.ident,
            path = end.path(),
            live = self.live(2),
        ))
        .bind(key)
        .bind(now);

        let remove = Statement::new(format!(
            "UPDATE {t} SET value = json_remove(value, '{path}')
             WHERE key = ?1 AND {live} AND {is_list}",
            t = self.ident,
            path = end.path(),
            live = self.live(2),
            is_list = self.is_list(),
        ))
        .bind(key)
        .bind(now);

        vec![read, remove]
    }

    /// LRANGE: one row holding the document type and an array of the
    /// elements from `start` to `stop` inclusive, in list order
    pub fn lrange(&self, key: &str, start: i64, stop: i64, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT json_type({t}.value), (
                 SELECT json_group_array(v) FROM (
                     SELECT j.value AS v FROM json_each({t}.value) AS j
                     WHERE j.key >= (CASE WHEN ?2 < 0
                                          THEN json_array_length({t}.value) + ?2 ELSE ?2 END)
                       AND j.key <= (CASE WHEN ?3 < 0
                                          THEN json_array_length({t}.value) + ?3 ELSE ?3 END)
                     ORDER BY j.key
                 )
             )
             FROM {t} WHERE {t}.key = ?1 AND {live}",
            t = self.ident,
            live = self.live(4),
        ))
        .bind(key)
        .bind(start)
        .bind(stop)
        .bind(now)
    }

    /// LLEN: one row holding the document type and length when the key is
    /// live
    pub fn llen(&self, key: &str, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT json_type(value), json_array_length(value) FROM {t}
             WHERE key = ?1 AND {live}",
            t = self.ident,
            live = self.live(2),
        ))
        .bind(key)
        .bind(now)
    }

    /// LINDEX: one row holding the document type and the element, NULL when
    /// out of range
    pub fn lindex(&self, key: &str, index: i64, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT json_type(value), json_extract(value, ?2) FROM {t}
             WHERE key = ?1 AND {live}",
            t = self.ident,
            live = self.live(3),
        ))
        .bind(key)
        .bind(index_path(index))
        .bind(now)
    }

    /// LREM: a length read followed by a single update that rebuilds the
    /// document without the removed occurrences. Must run as one batch.
    ///
    /// Matching elements are numbered in scan order (from the head for
    /// `count >= 0`, from the tail otherwise); those numbered within
    /// `|count|` are dropped, or all of them when `count == 0`. The update
    /// returns the new length and skips documents that are not lists.
    pub fn lrem(&self, key: &str, count: i64, element: SqlValue, now: i64) -> Vec<Statement> {
        let before = self.llen(key, now);

        let rebuild = Statement::new(format!(
            "UPDATE {t} SET value = (
                 SELECT json_group_array(v) FROM (
                     SELECT j.value AS v,
                            j.value = ?2 AS hit,
                            ROW_NUMBER() OVER (
                                PARTITION BY j.value = ?2
                                ORDER BY CASE WHEN ?3 < 0 THEN -j.key ELSE j.key END
                            ) AS nth
                     FROM json_each({t}.value) AS j
                     ORDER BY j.key
                 )
                 WHERE NOT (hit AND (?3 = 0 OR nth <= abs(?3)))
             )
             WHERE key = ?1 AND {live} AND {is_list}
             RETURNING json_array_length(value)",
            t = self.ident,
            live = self.live(4),
            is_list = self.is_list(),
        ))
        .bind(key)
        .bind(element)
        .bind(count)
        .bind(now);

        vec![before, rebuild]
    }
}
