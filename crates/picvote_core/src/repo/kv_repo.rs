//! Durable key-value store for client-side state.
//!
//! # Responsibility
//! - Map string keys to JSON documents that survive process restart.
//! - Offer typed JSON helpers on top of raw string values.
//!
//! # Invariants
//! - Writes are synchronous: a successful `set_raw` is committed on return.
//! - Values are stored as JSON text; unreadable values surface as errors.

use crate::db::{lock, SharedConnection};
use crate::repo::RepoResult;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key holding the local user's vote membership.
pub const VOTE_MEMBERSHIP_KEY: &str = "vote_membership_v1";
/// Key holding the signed-in identity for session resumption.
pub const CURRENT_IDENTITY_KEY: &str = "current_identity_v1";

/// Synchronous string-keyed document store.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> RepoResult<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Returns whether a value was removed.
    fn remove(&self, key: &str) -> RepoResult<bool>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> RepoResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> RepoResult<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }
}

/// SQLite-backed store over the `kv_entries` table.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    conn: SharedConnection,
}

impl SqliteKeyValueStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_raw(&self, key: &str) -> RepoResult<Option<String>> {
        let conn = lock(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> RepoResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        let conn = lock(&self.conn)?;
        let changed = conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }
}
