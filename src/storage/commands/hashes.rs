//! Hash statements
//!
//! A hash is one JSON object document. Fields are looked up through
//! `json_each` rather than JSON paths so any field name works, including
//! ones containing dots or quotes.

use super::Namespace;
use crate::storage::backend::{SqlValue, Statement};

impl Namespace {
    /// One row holding the document type and 1 when `field` exists in the
    /// live document, else 0. No row when the key is missing.
    pub fn hexists(&self, key: &str, field: &str, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT json_type({t}.value), EXISTS (
                 SELECT 1 FROM json_each({t}.value) AS j WHERE j.key = ?2
             )
             FROM {t} WHERE {t}.key = ?1 AND {live}",
            t = self.ident,
            live = self.live(3),
        ))
        .bind(key)
        .bind(field)
        .bind(now)
    }

    /// HSET: existence check followed by a merge-patch upsert. Must run as
    /// one batch; an expired row is replaced and a live row that is not a
    /// hash is left alone.
    pub fn hset(&self, key: &str, field: &str, value: SqlValue, now: i64) -> Vec<Statement> {
        let existed = self.hexists(key, field, now);

        let upsert = Statement::new(format!(
            "INSERT INTO {t} (key, value, expire_at) VALUES (?1, json_object(?2, ?3), NULL)
             ON CONFLICT(key) DO UPDATE SET
                 value = CASE WHEN {stale} THEN excluded.value
                              ELSE json_patch({t}.value, excluded.value) END,
                 expire_at = CASE WHEN {stale} THEN NULL ELSE {t}.expire_at END
             WHERE {is_hash} OR {stale}",
            t = self.ident,
            stale = self.stale(4),
            is_hash = self.is_hash(),
        ))
        .bind(key)
        .bind(field)
        .bind(value)
        .bind(now);

        vec![existed, upsert]
    }

    /// HGET: one row holding the document type and the field's stored
    /// element (NULL when the field is missing)
    pub fn hget(&self, key: &str, field: &str, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT json_type({t}.value), (
                 SELECT j.value FROM json_each({t}.value) AS j WHERE j.key = ?2
             )
             FROM {t} WHERE {t}.key = ?1 AND {live}",
            t = self.ident,
            live = self.live(3),
        ))
        .bind(key)
        .bind(field)
        .bind(now)
    }

    /// HDEL: existence check followed by a rebuild without the field. Must
    /// run as one batch.
    pub fn hdel(&self, key: &str, field: &str, now: i64) -> Vec<Statement> {
        let existed = self.hexists(key, field, now);

        let rebuild = Statement::new(format!(
            "UPDATE {t} SET value = (
                 SELECT json_group_object(j.key, j.value) FROM json_each({t}.value) AS j
                 WHERE j.key <> ?2
             )
             WHERE key = ?1 AND {live} AND {is_hash}",
            t = self.ident,
            live = self.live(3),
            is_hash = self.is_hash(),
        ))
        .bind(key)
        .bind(field)
        .bind(now);

        vec![existed, rebuild]
    }

    /// HLEN: one row holding the document type and the number of fields
    pub fn hlen(&self, key: &str, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT json_type({t}.value), (SELECT count(*) FROM json_each({t}.value))
             FROM {t} WHERE {t}.key = ?1 AND {live}",
            t = self.ident,
            live = self.live(2),
        ))
        .bind(key)
        .bind(now)
    }
}
