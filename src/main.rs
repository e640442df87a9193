use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use joinquant_sync::api::ApiServer;
use joinquant_sync::config::Settings;
use joinquant_sync::scheduler::DailySyncScheduler;
use joinquant_sync::state::AppState;
use joinquant_sync::{build_collaborators, init_tracing, run_sync};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "joinquant-sync")]
#[command(about = "Sync FRED series into SQLite and mail a daily digest", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true, env = "JOINQUANT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass and exit
    Run,

    /// Serve the read-only HTTP API
    Serve,

    /// Serve the HTTP API and sync once a day
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let state = Arc::new(AppState::new(settings).context("Failed to open database")?);

    match cli.command {
        Commands::Run => run_once(&state).await,
        Commands::Serve => serve(state).await,
        Commands::Daemon => daemon(state).await,
    }
}

async fn run_once(state: &AppState) -> Result<()> {
    let collaborators = build_collaborators(&state.settings)?;
    let report = run_sync(state, &collaborators).await.context("Sync run failed")?;

    for failed in &report.failed_fetches {
        warn!("Skipped {}/{}: {}", failed.series_id, failed.channel, failed.reason);
    }
    info!(
        "Run finished: {} series, {} channels fetched, {} merged, {} expired, {} removed, digest sent: {}",
        report.series_configured,
        report.channels_fetched,
        report.observations_merged,
        report.observations_expired,
        report.series_removed,
        report.digest_sent
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn serve(state: Arc<AppState>) -> Result<()> {
    let mut server = ApiServer::new(state);
    server.start().await.context("Failed to start API server")?;

    tokio::signal::ctrl_c().await?;
    server.stop();
    server.wait().await;
    Ok(())
}

async fn daemon(state: Arc<AppState>) -> Result<()> {
    let collaborators = build_collaborators(&state.settings)?;
    let scheduler = DailySyncScheduler::new(
        state.settings.schedule.hour,
        state.settings.schedule.minute,
        state.settings.schedule_timezone()?,
    )
    .context("Invalid schedule time")?;

    let mut server = ApiServer::new(state.clone());
    server.start().await.context("Failed to start API server")?;

    let job_state = state.clone();
    let scheduled = tokio::spawn(scheduler.run(move || {
        let state = job_state.clone();
        let collaborators = collaborators.clone();
        async move {
            match run_sync(&state, &collaborators).await {
                Ok(report) => info!(
                    "Scheduled sync finished: {} merged, {} failed fetches, digest sent: {}",
                    report.observations_merged,
                    report.failed_fetches.len(),
                    report.digest_sent
                ),
                Err(e) => error!("Scheduled sync failed: {}", e),
            }
        }
    }));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduled.abort();
    server.stop();
    server.wait().await;
    Ok(())
}
