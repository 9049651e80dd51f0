//! App-state snapshot persistence
//!
//! Persists `{authenticated, profile_created, profile}` so a reload can
//! rebuild AppState. The transient loading flag is deliberately absent.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::Profile;

/// Durable portion of the app state
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub authenticated: bool,
    pub profile_created: bool,
    pub profile: Option<Profile>,
}

/// Snapshot store
pub struct SnapshotStore<'a> {
    conn: &'a Connection,
}

impl<'a> SnapshotStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save the snapshot, replacing any previous one
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let profile_json = state
            .profile
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO app_snapshot (id, authenticated, profile_created, profile_json, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 authenticated = excluded.authenticated,
                 profile_created = excluded.profile_created,
                 profile_json = excluded.profile_json,
                 updated_at = excluded.updated_at",
            params![
                state.authenticated,
                state.profile_created,
                profile_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the snapshot, if one was ever saved
    pub fn load(&self) -> Result<Option<PersistedState>> {
        let result = self.conn.query_row(
            "SELECT authenticated, profile_created, profile_json FROM app_snapshot WHERE id = 1",
            [],
            |row| {
                let authenticated: bool = row.get(0)?;
                let profile_created: bool = row.get(1)?;
                let profile_json: Option<String> = row.get(2)?;
                Ok((authenticated, profile_created, profile_json))
            },
        );

        match result {
            Ok((authenticated, profile_created, profile_json)) => {
                // A snapshot with an unreadable profile degrades to no profile
                let profile = profile_json
                    .as_deref()
                    .and_then(|json| serde_json::from_str(json).ok());
                Ok(Some(PersistedState {
                    authenticated,
                    profile_created,
                    profile,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
