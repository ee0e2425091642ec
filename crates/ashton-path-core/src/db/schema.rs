//! SQLite schema definition.

/// Complete database schema for AshtonPath.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Key/value application state (the current plan lives under 'plan')
-- ============================================================================

CREATE TABLE IF NOT EXISTS app_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,                          -- JSON, stored verbatim
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Symptom journal
-- ============================================================================

CREATE TABLE IF NOT EXISTS daily_logs (
    date TEXT PRIMARY KEY,                        -- YYYY-MM-DD, one entry per day
    entry TEXT NOT NULL,                          -- JSON DailyLogEntry
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
