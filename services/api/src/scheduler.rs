//! services/api/src/scheduler.rs
//!
//! Fires the reminder pipeline once a day at a configurable UTC hour.
//! Sleeps until the next occurrence rather than polling; no cron crate,
//! just calendar math with chrono.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use organizer_core::reminder::ReminderPipeline;
use tokio::task::JoinHandle;
use tracing::info;

/// Owns the daily trigger. Constructed once at startup with the shared
/// pipeline and spawned onto the runtime; the handle is kept by main so
/// the task lives as long as the server.
pub struct ReminderScheduler {
    pipeline: Arc<ReminderPipeline>,
    hour_utc: u32,
}

impl ReminderScheduler {
    pub fn new(pipeline: Arc<ReminderPipeline>, hour_utc: u32) -> Self {
        Self { pipeline, hour_utc }
    }

    /// Starts the scheduling loop.
    pub fn spawn(self) -> JoinHandle<()> {
        info!("Reminder scheduler started (daily at {:02}:00 UTC)", self.hour_utc);
        tokio::spawn(async move {
            loop {
                let pause = duration_until_next(Utc::now(), self.hour_utc);
                tokio::time::sleep(to_std(pause)).await;
                self.pipeline.run_scheduled_check().await;
            }
        })
    }
}

/// Time until the next `hour_utc:00:00` strictly after `now`.
fn duration_until_next(now: DateTime<Utc>, hour_utc: u32) -> Duration {
    let today_run = now
        .date_naive()
        .and_hms_opt(hour_utc, 0, 0)
        .expect("reminder hour is validated at config load")
        .and_utc();
    let next_run = if now < today_run {
        today_run
    } else {
        today_run + Duration::days(1)
    };
    next_run - now
}

fn to_std(duration: Duration) -> StdDuration {
    duration.to_std().unwrap_or(StdDuration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn before_todays_run_waits_until_today() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 7, 30, 0).unwrap();
        assert_eq!(duration_until_next(now, 9), Duration::minutes(90));
    }

    #[test]
    fn at_or_after_todays_run_waits_until_tomorrow() {
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        assert_eq!(duration_until_next(at, 9), Duration::hours(24));

        let after = Utc.with_ymd_and_hms(2025, 6, 10, 21, 0, 0).unwrap();
        assert_eq!(duration_until_next(after, 9), Duration::hours(12));
    }

    #[test]
    fn crosses_month_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 10, 0, 0).unwrap();
        let pause = duration_until_next(now, 9);
        assert_eq!(now + pause, Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap());
    }
}
