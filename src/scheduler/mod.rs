//! Scheduler module
//!
//! Triggers one fresh sync pass per day at a configured local time.

mod daily_sync;

pub use daily_sync::DailySyncScheduler;
