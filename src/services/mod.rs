//! Services Layer
//!
//! Pipeline logic shared by the CLI, the daily scheduler, and the HTTP API.
//!
//! # Architecture
//!
//! ```text
//! CLI run ──────────┐
//!                   ├──> SyncService --> clients (config, secrets, FRED, mail)
//! DailyScheduler ───┘                \-> db::sqlite (one transaction per run)
//!
//! HTTP API ───────────> db::sqlite (reads) + DigestComposer
//! ```
//!
//! # Services
//!
//! - `normalizer` - raw value parsing and unit scaling
//! - `series_config` - series configuration documents
//! - `digest` - digest and web page rendering
//! - `SyncService` - one full pipeline pass

pub mod digest;
pub mod normalizer;
pub mod series_config;
pub mod sync_service;

pub use digest::DigestComposer;
pub use normalizer::{normalize, normalize_raw, parse_raw_value, NormalizedValue};
pub use series_config::{ChannelConfig, SeriesConfig, SeriesSnapshot};
pub use sync_service::{Collaborators, FailedFetch, SyncOptions, SyncReport, SyncService};
