//! SQLite storage layer for Tider
//!
//! Two durable cells keyed by fixed row ids: the bearer token and the
//! app-state snapshot. Both survive process restarts so a reload can
//! reconstruct state deterministically.

mod migrations;
mod snapshot;
mod token;

use std::path::Path;

use rusqlite::Connection;
use tracing::instrument;

use crate::error::Result;

pub use snapshot::{PersistedState, SnapshotStore};
pub use token::TokenStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get the token store
    pub fn tokens(&self) -> TokenStore<'_> {
        TokenStore::new(&self.conn)
    }

    /// Get the app-state snapshot store
    pub fn snapshots(&self) -> SnapshotStore<'_> {
        SnapshotStore::new(&self.conn)
    }
}
