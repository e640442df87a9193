//! Application state shared by the HTTP API and the scheduler

use crate::config::Settings;
use crate::db::sqlite::SqliteDb;
use crate::error::Result;
use crate::services::DigestComposer;
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState {
    /// SQLite store
    pub db: Arc<SqliteDb>,

    /// Loaded settings
    pub settings: Arc<Settings>,

    /// Renders digests with links to this server's pages
    pub composer: DigestComposer,
}

impl AppState {
    /// Open the configured database and build the state
    pub fn new(settings: Settings) -> Result<Self> {
        let db = SqliteDb::new(&settings.database.path)?;
        Ok(Self::with_db(Arc::new(db), settings))
    }

    /// Build the state around an already open database
    pub fn with_db(db: Arc<SqliteDb>, settings: Settings) -> Self {
        let composer = DigestComposer::new(&settings.digest.web_base_url);
        Self {
            db,
            settings: Arc::new(settings),
            composer,
        }
    }

    /// Channel whose rows make up the digest
    pub fn reporting_channel(&self) -> &str {
        &self.settings.digest.channel
    }
}
