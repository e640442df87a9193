//! SQLite connection utilities

use rusqlite::Connection;
use std::path::Path;

/// Open a file-backed connection tuned for a single writer
pub fn create_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    enable_foreign_keys(&conn)?;
    Ok(conn)
}

/// Open a private in-memory connection
pub fn create_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    enable_foreign_keys(&conn)?;
    Ok(conn)
}

/// Observation rows cascade with their series only while this is on
fn enable_foreign_keys(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}
