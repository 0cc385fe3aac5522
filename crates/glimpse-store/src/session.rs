//! Key-value operations for the persisted session entries.
//!
//! The session layer stores exactly two entries: the raw auth token under
//! [`TOKEN_KEY`] and the JSON-serialized profile snapshot under
//! [`PROFILE_KEY`].  The store itself treats values as opaque strings.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

/// Key of the persisted auth token.
pub const TOKEN_KEY: &str = "token";

/// Key of the persisted profile snapshot (JSON).
pub const PROFILE_KEY: &str = "user";

impl Database {
    /// Insert or replace one entry.
    pub fn put_entry(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO session_kv (key, value, updated_at)
             VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Fetch one entry, `None` if absent.
    pub fn get_entry(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM session_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Delete one entry.  Returns `true` if a row was deleted.
    pub fn delete_entry(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM session_kv WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// Remove both session entries.  Idempotent.
    pub fn clear_session(&self) -> Result<()> {
        self.delete_entry(TOKEN_KEY)?;
        self.delete_entry(PROFILE_KEY)?;
        Ok(())
    }
}
