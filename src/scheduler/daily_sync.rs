//! Daily sync scheduler
//!
//! Sleeps until the next configured wall-clock time in the configured
//! timezone, runs the job, and repeats. A failed job only costs that day's
//! run; the loop keeps going.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Scheduler that fires once a day at `hour:minute` local time
#[derive(Debug, Clone)]
pub struct DailySyncScheduler {
    at: NaiveTime,
    timezone: Tz,
}

impl DailySyncScheduler {
    /// Returns `None` for an invalid time of day
    pub fn new(hour: u32, minute: u32, timezone: Tz) -> Option<Self> {
        Some(Self {
            at: NaiveTime::from_hms_opt(hour, minute, 0)?,
            timezone,
        })
    }

    /// Next firing instant strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.timezone).date_naive();

        // Day 0 may already be past; a DST gap can skip one more day's slot
        (0..=2)
            .filter_map(|offset| {
                let day = today + ChronoDuration::days(offset);
                self.timezone
                    .from_local_datetime(&day.and_time(self.at))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .find(|candidate| *candidate > now)
            .unwrap_or_else(|| now + ChronoDuration::days(1))
    }

    /// Time to sleep from `now` until the next run
    pub fn duration_until_next_run(&self, now: DateTime<Utc>) -> Duration {
        (self.next_run_after(now) - now)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Run `job` once a day, forever
    pub async fn run<F, Fut>(self, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("Daily sync scheduler started ({} {})", self.at, self.timezone);

        loop {
            let duration = self.duration_until_next_run(Utc::now());
            info!(
                "Next sync in {} hours {} minutes",
                duration.as_secs() / 3600,
                (duration.as_secs() % 3600) / 60
            );

            tokio::time::sleep(duration).await;

            info!("Starting scheduled sync");
            job().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Australia::Sydney;
    use chrono_tz::UTC;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_later_today() {
        let scheduler = DailySyncScheduler::new(7, 0, UTC).unwrap();
        let now = utc("2024-05-01T05:30:00Z");
        assert_eq!(scheduler.next_run_after(now), utc("2024-05-01T07:00:00Z"));
        assert_eq!(
            scheduler.duration_until_next_run(now),
            Duration::from_secs(90 * 60)
        );
    }

    #[test]
    fn test_rolls_to_tomorrow() {
        let scheduler = DailySyncScheduler::new(7, 0, UTC).unwrap();
        assert_eq!(
            scheduler.next_run_after(utc("2024-05-01T07:00:00Z")),
            utc("2024-05-02T07:00:00Z")
        );
    }

    #[test]
    fn test_local_timezone() {
        // Sydney is UTC+10 in May
        let scheduler = DailySyncScheduler::new(7, 0, Sydney).unwrap();
        assert_eq!(
            scheduler.next_run_after(utc("2024-05-01T12:00:00Z")),
            utc("2024-05-01T21:00:00Z")
        );
    }

    #[test]
    fn test_duration_bounded_by_a_day() {
        let scheduler = DailySyncScheduler::new(3, 0, Sydney).unwrap();
        let duration = scheduler.duration_until_next_run(Utc::now());
        assert!(duration.as_secs() > 0);
        assert!(duration.as_secs() <= 25 * 3600);
    }

    #[test]
    fn test_invalid_time_rejected() {
        assert!(DailySyncScheduler::new(24, 0, UTC).is_none());
        assert!(DailySyncScheduler::new(7, 60, UTC).is_none());
    }
}
