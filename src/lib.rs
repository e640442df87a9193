//! JoinQuant Sync - FRED ingestion pipeline
//!
//! Pulls configured economic series from FRED, keeps a bounded history of
//! each series/channel in SQLite, mails a digest of the reporting channel,
//! and serves the stored data over a read-only HTTP API.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod scheduler;
pub mod services;
pub mod state;

use chrono::Utc;
use clients::{FileParameterStore, FredClient, HttpMailer, KeychainSecretSource, SecretSource, StaticSecretSource};
use config::Settings;
use error::Result;
use services::{Collaborators, SyncOptions, SyncReport, SyncService};
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "joinquant_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Production collaborators for the given settings
///
/// Static mail credentials win over the keychain when both username and
/// password are configured.
pub fn build_collaborators(settings: &Settings) -> Result<Collaborators> {
    let secrets: Arc<dyn SecretSource> = match (&settings.mail.username, &settings.mail.password) {
        (Some(username), Some(password)) => Arc::new(StaticSecretSource::new(username, password)),
        _ => Arc::new(KeychainSecretSource::new()),
    };

    Ok(Collaborators {
        config: Arc::new(FileParameterStore::new(settings.catalog.parameter_root.clone())),
        secrets,
        fetcher: Arc::new(FredClient::new(&settings.fred.base_url, settings.fetch_timeout())?),
        mailer: Arc::new(HttpMailer::new(&settings.mail.endpoint, &settings.mail.from)?),
    })
}

/// One pipeline pass dated with today's date in the schedule timezone
pub async fn run_sync(state: &AppState, collaborators: &Collaborators) -> Result<SyncReport> {
    let today = Utc::now()
        .with_timezone(&state.settings.schedule_timezone()?)
        .date_naive();
    let options = SyncOptions::from(state.settings.as_ref());

    SyncService::run(&state.db, collaborators, &options, today).await
}
