//! SQLite database module

pub mod models;
pub mod observations;
pub mod retention;
pub mod series;
mod connection;
mod migrations;

use crate::error::Result;
use models::*;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::path::Path;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database file
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = connection::create_connection(path)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(connection::create_memory_connection()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };

        // Run migrations
        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    /// Run `f` inside one transaction
    ///
    /// Commits when `f` returns `Ok`; any error rolls every write back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    // ========== Catalog Methods ==========

    /// List all catalog entries
    pub fn list_series(&self) -> Result<Vec<Series>> {
        let conn = self.conn.lock();
        series::list_series(&conn)
    }

    /// Get one catalog entry
    pub fn get_series(&self, series_id: &str) -> Result<Option<Series>> {
        let conn = self.conn.lock();
        series::get_series(&conn, series_id)
    }

    // ========== Observation Methods ==========

    /// Observations of one series, most recent first
    pub fn observations_by_series(&self, series_id: &str) -> Result<Vec<Observation>> {
        let conn = self.conn.lock();
        observations::get_by_series(&conn, series_id)
    }

    /// Observations of one channel, most recent first
    pub fn observations_by_channel(&self, channel: &str) -> Result<Vec<Observation>> {
        let conn = self.conn.lock();
        observations::get_by_channel(&conn, channel)
    }

    /// Observations of one (series, channel) partition, most recent first
    pub fn partition(&self, series_id: &str, channel: &str) -> Result<Vec<Observation>> {
        let conn = self.conn.lock();
        observations::get_partition(&conn, series_id, channel)
    }

    /// Digest rows for a reporting channel
    pub fn digest_rows(&self, channel: &str) -> Result<Vec<DigestRow>> {
        let conn = self.conn.lock();
        observations::get_digest_rows(&conn, channel)
    }
}

/// Fresh in-memory connection with the schema applied
#[cfg(test)]
pub(crate) fn test_connection() -> Connection {
    let conn = connection::create_memory_connection().unwrap();
    migrations::run_migrations(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = SqliteDb::in_memory().unwrap();

        let result: Result<()> = db.transaction(|tx| {
            tx.execute(
                "INSERT INTO series (series_id, title, link) VALUES ('GDP', 'GDP', 'l')",
                [],
            )?;
            Err(AppError::Validation("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(db.list_series().unwrap().is_empty());
    }

    #[test]
    fn test_transaction_commits() {
        let db = SqliteDb::in_memory().unwrap();

        db.transaction(|tx| {
            tx.execute(
                "INSERT INTO series (series_id, title, link) VALUES ('GDP', 'GDP', 'l')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let gdp = db.get_series("GDP").unwrap().unwrap();
        assert_eq!(gdp.unit, "number");
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("joinquant.db");

        {
            let db = SqliteDb::new(&path).unwrap();
            db.transaction(|tx| {
                tx.execute(
                    "INSERT INTO series (series_id, title, link) VALUES ('GDP', 'GDP', 'l')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }

        let reopened = SqliteDb::new(&path).unwrap();
        assert_eq!(reopened.list_series().unwrap().len(), 1);
    }
}
