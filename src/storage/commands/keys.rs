//! Keyspace statements
//!
//! DEL, EXISTS, KEYS and the expiry commands.

use super::Namespace;
use crate::storage::backend::Statement;
use crate::storage::pattern::{to_match_pattern, LIKE_ESCAPE};

impl Namespace {
    /// DEL: removes expired rows too
    pub fn del(&self, keys: &[&str]) -> Statement {
        let mut stmt = Statement::new(format!(
            "DELETE FROM {t} WHERE key IN ({keys})",
            t = self.ident,
            keys = Self::placeholders(1, keys.len()),
        ));
        for key in keys {
            stmt = stmt.bind(*key);
        }
        stmt
    }

    /// EXISTS: one row holding the number of live keys among `keys`
    pub fn exists(&self, keys: &[&str], now: i64) -> Statement {
        let mut stmt = Statement::new(format!(
            "SELECT count(*) FROM {t} WHERE key IN ({keys}) AND {live}",
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

    /// KEYS: live keys matching a glob, in whatever order the store returns
    pub fn keys(&self, glob: &str, now: i64) -> Statement {
        let translated = to_match_pattern(glob);
        let escape = if translated.needs_escape {
            format!(" ESCAPE '{}'", LIKE_ESCAPE)
        } else {
            String::new()
        };

        Statement::new(format!(
            "SELECT key FROM {t} WHERE key LIKE ?1{escape} AND {live}",
            t = self.ident,
            escape = escape,
            live = self.live(2),
        ))
        .bind(translated.pattern)
        .bind(now)
    }

    /// EXPIRE: set an absolute expiry on a live key
    pub fn expire(&self, key: &str, seconds: i64, now: i64) -> Statement {
        Statement::new(format!(
            "UPDATE {t} SET expire_at = ?2 WHERE key = ?1 AND {live}",
            t = self.ident,
            live = self.live(3),
        ))
        .bind(key)
        .bind(now.saturating_add(seconds))
        .bind(now)
    }

    /// TTL: one row holding `expire_at` (possibly NULL) when the key is live
    pub fn ttl(&self, key: &str, now: i64) -> Statement {
        Statement::new(format!(
            "SELECT expire_at FROM {t} WHERE key = ?1 AND {live}",
            t = self.ident,
            live = self.live(2),
        ))
        .bind(key)
        .bind(now)
    }

    /// PERSIST: drop the expiry of a live key
    pub fn persist(&self, key: &str, now: i64) -> Statement {
        Statement::new(format!(
            "UPDATE {t} SET expire_at = NULL
             WHERE key = ?1 AND {t}.expire_at IS NOT NULL AND {t}.expire_at > ?2",
            t = self.ident,
        ))
        .bind(key)
        .bind(now)
    }
}
