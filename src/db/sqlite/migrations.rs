//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_series", CREATE_SERIES_TABLE)?;
    run_migration(conn, "002_observations", CREATE_OBSERVATIONS_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_SERIES_TABLE: &str = r#"
CREATE TABLE series (
    series_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    link TEXT NOT NULL,
    unit TEXT NOT NULL DEFAULT 'number'
);
"#;

/// `value` is canonical decimal text; `obs_date` is ISO `YYYY-MM-DD`
const CREATE_OBSERVATIONS_TABLE: &str = r#"
CREATE TABLE observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    series_id TEXT NOT NULL REFERENCES series(series_id) ON DELETE CASCADE,
    channel TEXT NOT NULL,
    frequency TEXT NOT NULL,
    "limit" INTEGER,
    obs_date TEXT NOT NULL,
    value TEXT,
    display_unit TEXT NOT NULL,
    UNIQUE(series_id, channel, obs_date)
);
CREATE INDEX IF NOT EXISTS idx_observations_channel ON observations(channel, series_id, obs_date);
"#;
