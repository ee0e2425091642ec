//! Daily journal database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::DailyLogEntry;

impl Database {
    /// Save an entry, replacing any existing entry for the same day.
    pub fn save_log(&self, entry: &DailyLogEntry) -> DbResult<()> {
        entry.validate()?;
        let entry_json = serde_json::to_string(entry)?;

        self.conn.execute(
            r#"
            INSERT INTO daily_logs (date, entry) VALUES (?1, ?2)
            ON CONFLICT(date) DO UPDATE SET
                entry = excluded.entry,
                updated_at = datetime('now')
            "#,
            params![entry.date, entry_json],
        )?;
        tracing::debug!(date = %entry.date, "Saved journal entry");
        Ok(())
    }

    /// Get the entry for a day.
    pub fn get_log(&self, date: &str) -> DbResult<Option<DailyLogEntry>> {
        let entry_json: Option<String> = self
            .conn
            .query_row("SELECT entry FROM daily_logs WHERE date = ?", [date], |row| row.get(0))
            .optional()?;

        Ok(entry_json
            .map(|json| serde_json::from_str(&json))
            .transpose()?)
    }

    /// All entries, oldest first.
    pub fn list_logs(&self) -> DbResult<Vec<DailyLogEntry>> {
        let mut stmt = self.conn.prepare("SELECT entry FROM daily_logs ORDER BY date ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(serde_json::from_str(&row?)?);
        }
        Ok(entries)
    }

    /// Delete the entry for a day. Returns whether it existed.
    pub fn delete_log(&self, date: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM daily_logs WHERE date = ?", [date])?;
        Ok(rows_affected > 0)
    }
}
