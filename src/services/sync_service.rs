//! Sync Service
//!
//! One pass of the pipeline: read configuration, fetch every configured
//! series/channel, reconcile catalog and observations inside a single store
//! transaction, then mail the digest of the reporting channel.
//!
//! # Failure model
//!
//! - Configuration or secret failures abort before any write.
//! - A failed fetch skips that channel only.
//! - Any store or parse failure rolls the whole transaction back.
//! - Mail failures are logged after commit and never touch the store.

use crate::clients::{
    ConfigSource, Credentials, MailMessage, Mailer, RawObservation, SecretSource, SeriesFetcher,
};
use crate::config::Settings;
use crate::db::sqlite::observations::{self, UnitCache};
use crate::db::sqlite::{retention, series, SqliteDb};
use crate::error::{AppError, Result};
use crate::services::digest::DigestComposer;
use crate::services::series_config::{load_series_snapshot, ChannelConfig, SeriesSnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// External systems used by a run
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<dyn ConfigSource>,
    pub secrets: Arc<dyn SecretSource>,
    pub fetcher: Arc<dyn SeriesFetcher>,
    pub mailer: Arc<dyn Mailer>,
}

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub api_key_path: String,
    pub series_paths: Vec<String>,
    pub reporting_channel: String,
    pub mail_secret_id: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub web_base_url: String,
}

impl From<&Settings> for SyncOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            api_key_path: settings.fred.api_key_path.clone(),
            series_paths: settings.catalog.series_paths.clone(),
            reporting_channel: settings.digest.channel.clone(),
            mail_secret_id: settings.mail.secret_id.clone(),
            recipients: settings.mail.recipients.clone(),
            subject: settings.digest.subject.clone(),
            web_base_url: settings.digest.web_base_url.clone(),
        }
    }
}

/// A series/channel whose fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFetch {
    pub series_id: String,
    pub channel: String,
    pub reason: String,
}

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub series_configured: usize,
    pub channels_fetched: usize,
    pub failed_fetches: Vec<FailedFetch>,
    pub observations_merged: usize,
    pub observations_expired: usize,
    pub series_changed: usize,
    pub series_removed: usize,
    pub digest_rows: usize,
    pub digest_sent: bool,
    pub mail_error: Option<String>,
}

/// Fetched data for one series, in channel order
struct FetchedSeries {
    series_id: String,
    channels: Vec<FetchedChannel>,
}

struct FetchedChannel {
    name: String,
    config: ChannelConfig,
    observations: Vec<RawObservation>,
}

/// Sync service for the ingestion pipeline
pub struct SyncService;

impl SyncService {
    /// Run one full pass against `db`
    pub async fn run(
        db: &SqliteDb,
        collaborators: &Collaborators,
        options: &SyncOptions,
        today: NaiveDate,
    ) -> Result<SyncReport> {
        info!("Sync run started for {}", today);

        // Configuration first; nothing below runs without it
        let api_key = collaborators
            .config
            .get(&options.api_key_path)
            .await
            .map_err(as_config_unavailable)?;
        let snapshot = load_series_snapshot(collaborators.config.as_ref(), &options.series_paths)
            .await
            .map_err(as_config_unavailable)?;
        let credentials = collaborators
            .secrets
            .get(&options.mail_secret_id)
            .await
            .map_err(as_config_unavailable)?;

        let mut report = SyncReport {
            series_configured: snapshot.len(),
            ..Default::default()
        };

        let fetched = Self::fetch_all(collaborators.fetcher.as_ref(), &snapshot, &api_key, &mut report).await;

        let digest_rows = db.transaction(|tx| {
            // Catalog first so every merged series has its unit in place
            let catalog = series::reconcile(tx, &snapshot)?;
            report.series_changed = catalog.changed;
            report.series_removed = catalog.deleted;

            let mut units = UnitCache::new();

            for batch in &fetched {
                for channel in &batch.channels {
                    report.observations_merged += observations::merge(
                        tx,
                        &mut units,
                        &batch.series_id,
                        &channel.name,
                        &channel.config,
                        &channel.observations,
                    )?;
                }

                report.observations_expired += retention::enforce_series(tx, &batch.series_id)?;
            }

            observations::get_digest_rows(tx, &options.reporting_channel)
        })?;

        info!(
            "Store committed: {} merged, {} expired, {} series removed",
            report.observations_merged, report.observations_expired, report.series_removed
        );

        report.digest_rows = digest_rows.len();
        let composer = DigestComposer::new(&options.web_base_url);

        match composer.compose(&digest_rows) {
            Some(body) => {
                let message = MailMessage {
                    subject: format!("{} ({})", options.subject, today.format("%Y-%m-%d")),
                    html_body: body,
                    recipients: options.recipients.clone(),
                };
                match Self::deliver(collaborators.mailer.as_ref(), &credentials, &message).await {
                    Ok(()) => report.digest_sent = true,
                    Err(e) => {
                        warn!("Digest mail failed: {}", e);
                        report.mail_error = Some(e.to_string());
                    }
                }
            }
            None => info!("No rows on channel '{}', digest not sent", options.reporting_channel),
        }

        info!("Sync run completed");
        Ok(report)
    }

    /// Fetch every configured channel; failures are recorded and skipped
    async fn fetch_all(
        fetcher: &dyn SeriesFetcher,
        snapshot: &SeriesSnapshot,
        api_key: &str,
        report: &mut SyncReport,
    ) -> Vec<FetchedSeries> {
        let mut fetched = Vec::with_capacity(snapshot.len());

        for (series_id, cfg) in snapshot {
            let mut batch = FetchedSeries {
                series_id: series_id.clone(),
                channels: Vec::with_capacity(cfg.channels.len()),
            };

            for (channel_name, channel) in &cfg.channels {
                match fetcher.fetch(series_id, channel_name, channel, api_key).await {
                    Ok(observations) => {
                        report.channels_fetched += 1;
                        batch.channels.push(FetchedChannel {
                            name: channel_name.clone(),
                            config: channel.clone(),
                            observations,
                        });
                    }
                    Err(e) => {
                        warn!("Fetch failed for {}/{}: {}", series_id, channel_name, e);
                        report.failed_fetches.push(FailedFetch {
                            series_id: series_id.clone(),
                            channel: channel_name.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            fetched.push(batch);
        }

        fetched
    }

    async fn deliver(mailer: &dyn Mailer, credentials: &Credentials, message: &MailMessage) -> Result<()> {
        info!("Sending digest to {} recipients", message.recipients.len());
        let receipt = mailer.send(credentials, message).await?;
        if let Some(id) = receipt.message_id {
            info!("Digest accepted, message id {}", id);
        }
        Ok(())
    }
}

fn as_config_unavailable(err: AppError) -> AppError {
    match err {
        AppError::ConfigUnavailable(_) => err,
        other => AppError::ConfigUnavailable(other.to_string()),
    }
}
