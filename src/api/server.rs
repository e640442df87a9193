//! HTTP server for the read-only API

use crate::api::handlers;
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Router with every route, CORS, and request tracing
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))
        // Catalog
        .route("/api/series", get(handlers::list_series))
        .route("/api/series/:series_id", get(handlers::get_series))
        // Observations
        .route(
            "/api/observations/by-series/:series_id",
            get(handlers::observations_by_series),
        )
        .route(
            "/api/observations/by-channel/:channel",
            get(handlers::observations_by_channel),
        )
        // Digest
        .route("/api/mail/latest", get(handlers::latest_digest))
        // Web pages
        .route("/web/series/:series_id", get(handlers::series_page))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Bind the configured address and serve in the background
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 is requested.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let server = &self.state.settings.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?;
        let app = build_router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("Starting API server on {}", bound);

        self.handle = Some(tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        }));

        info!("  GET  http://{}/health", bound);
        info!("  GET  http://{}/api/series", bound);
        info!("  GET  http://{}/api/mail/latest", bound);
        info!("  GET  http://{}/web/series/{{series_id}}", bound);

        Ok(bound)
    }

    /// Wait until the server task exits
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("API server task failed: {}", e);
            }
        }
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
