//! HTTP endpoint handlers

use crate::api::types::*;
use crate::error::{AppError, ErrorResponse};
use crate::services::digest::render_series_page;
use crate::state::AppState;
use axum::{
    extract::{Json, Path, State as AxumState},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

/// Channel rendered on the per-series web page
pub const WEB_CHANNEL: &str = "web";

/// Body of the web page when the series has no web rows
pub const NO_WEB_DATA: &str = "No web data available.";

fn ok<T: Serialize>(data: T) -> Response {
    Json(ApiResponse::success_with_data(data)).into_response()
}

fn error_response(err: AppError) -> Response {
    let status = match &err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    let body = ErrorResponse::from(&err);
    (status, Json(ApiResponse::<Empty>::error(&body.code, &body.message))).into_response()
}

fn respond<T: Serialize>(result: crate::error::Result<T>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::<Empty>::success_with_message("joinquant-sync API is running"))
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /api/series
pub async fn list_series(AxumState(state): AxumState<Arc<AppState>>) -> Response {
    respond(state.db.list_series())
}

/// GET /api/series/{series_id}
pub async fn get_series(
    AxumState(state): AxumState<Arc<AppState>>,
    Path(series_id): Path<String>,
) -> Response {
    respond(state.db.get_series(&series_id).and_then(|found| {
        found.ok_or_else(|| AppError::NotFound(format!("series {}", series_id)))
    }))
}

// ============================================================================
// Observations
// ============================================================================

/// GET /api/observations/by-series/{series_id}
pub async fn observations_by_series(
    AxumState(state): AxumState<Arc<AppState>>,
    Path(series_id): Path<String>,
) -> Response {
    respond(state.db.observations_by_series(&series_id))
}

/// GET /api/observations/by-channel/{channel}
pub async fn observations_by_channel(
    AxumState(state): AxumState<Arc<AppState>>,
    Path(channel): Path<String>,
) -> Response {
    respond(state.db.observations_by_channel(&channel))
}

// ============================================================================
// Digest
// ============================================================================

/// GET /api/mail/latest
pub async fn latest_digest(AxumState(state): AxumState<Arc<AppState>>) -> Response {
    let channel = state.reporting_channel().to_string();

    respond(state.db.digest_rows(&channel).map(|rows| {
        let html = state.composer.compose(&rows);
        LatestDigest { channel, rows, html }
    }))
}

// ============================================================================
// Web pages
// ============================================================================

/// GET /web/series/{series_id}
pub async fn series_page(
    AxumState(state): AxumState<Arc<AppState>>,
    Path(series_id): Path<String>,
) -> Response {
    let rows = match state.db.partition(&series_id, WEB_CHANNEL) {
        Ok(rows) => rows,
        Err(e) => return error_response(e),
    };

    if rows.is_empty() {
        return NO_WEB_DATA.into_response();
    }

    let title = match state.db.get_series(&series_id) {
        Ok(series) => series.map(|s| s.title),
        Err(e) => return error_response(e),
    };

    Html(render_series_page(&series_id, title.as_deref(), &rows)).into_response()
}
