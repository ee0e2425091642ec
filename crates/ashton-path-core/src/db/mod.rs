//! Persistence collaborators for AshtonPath.
//!
//! The schedule generator never touches storage. Hosts persist plans through
//! a [`PlanStore`]: either the SQLite-backed [`Database`] or the in-process
//! [`MemoryPlanStore`].

mod schema;
mod plans;
mod journal;
mod memory;

pub use schema::*;
pub use plans::*;
pub use memory::*;

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

use crate::models::{JournalError, TaperPlan};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid journal entry: {0}")]
    Journal(#[from] JournalError),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Load/save capability for the current taper plan.
pub trait PlanStore {
    /// Load the saved plan, repairing data written by older app versions.
    fn load_plan(&self) -> DbResult<Option<TaperPlan>>;

    /// Replace the saved plan.
    fn save_plan(&self, plan: &TaperPlan) -> DbResult<()>;

    /// Forget the saved plan.
    fn clear_plan(&self) -> DbResult<()>;
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Read a raw value from the key/value table.
    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM app_state WHERE key = ?", [key], |row| row.get(0))
            .optional()?)
    }

    /// Insert or replace a raw value in the key/value table.
    pub fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO app_state (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a key. Returns whether it existed.
    pub fn delete_value(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM app_state WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }
}
