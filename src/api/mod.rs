//! Read-only HTTP API
//!
//! Serves the stored catalog and observations as JSON, the latest digest,
//! and one HTML page per series:
//! - `GET /health`
//! - `GET /api/series`, `GET /api/series/{series_id}`
//! - `GET /api/observations/by-series/{series_id}`
//! - `GET /api/observations/by-channel/{channel}`
//! - `GET /api/mail/latest`
//! - `GET /web/series/{series_id}`

pub mod handlers;
mod server;
mod types;

pub use server::{build_router, ApiServer};
pub use types::{ApiResponse, LatestDigest};
