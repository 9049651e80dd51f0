//! Durable bearer token cell
//!
//! A dumb, durable single-row store. Validity checks live in the
//! session service; callers must never treat "token present" as
//! "session valid".

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;

/// Token store
pub struct TokenStore<'a> {
    conn: &'a Connection,
}

impl<'a> TokenStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Persist the token, replacing any previous one
    pub fn set(&self, token: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO auth_token (id, token, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET token = excluded.token, updated_at = excluded.updated_at",
            params![token, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read the last-set token, if any
    pub fn get(&self) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT token FROM auth_token WHERE id = 1", [], |row| {
                row.get(0)
            });

        match result {
            Ok(token) => Ok(Some(token)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the token. Idempotent.
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM auth_token WHERE id = 1", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_set_get_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.tokens().get().unwrap(), None);

        db.tokens().set("tok-1").unwrap();
        assert_eq!(db.tokens().get().unwrap(), Some("tok-1".to_string()));
    }

    #[test]
    fn test_set_replaces_previous() {
        let db = Database::open_in_memory().unwrap();
        db.tokens().set("tok-1").unwrap();
        db.tokens().set("tok-2").unwrap();
        assert_eq!(db.tokens().get().unwrap(), Some("tok-2".to_string()));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.tokens().set("tok-1").unwrap();

        db.tokens().clear().unwrap();
        db.tokens().clear().unwrap();
        assert_eq!(db.tokens().get().unwrap(), None);
    }

    #[test]
    fn test_token_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tider.db");

        {
            let db = Database::open(&path).unwrap();
            db.tokens().set("durable-token").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.tokens().get().unwrap(),
            Some("durable-token".to_string())
        );
    }
}
