//! Daily notification sweep

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::task::JoinHandle;

use super::notifications::NotificationService;
use crate::clock::Clock;

/// Next instant at `hour`:00 UTC strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let hour = hour.min(23);
    let at = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// When the next sweep runs and how long to sleep until then
pub fn time_to_next_run(clock: &dyn Clock, hour: u32) -> (DateTime<Utc>, std::time::Duration) {
    let now = clock.now();
    let next = next_run_after(now, hour);
    (next, (next - now).to_std().unwrap_or_default())
}

/// Spawn the background task running both sweeps once a day
pub fn spawn_daily_sweep(
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
    hour: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(hour, "Notification scheduler started (runs daily at {:02}:00 UTC)", hour);
        loop {
            let (next, wait) = time_to_next_run(clock.as_ref(), hour);
            tracing::debug!(next_run = %next, "Waiting for next notification sweep");
            tokio::time::sleep(wait).await;

            let summary = notifications.run_sweep().await;
            for task in &summary.summary {
                tracing::info!(task = %task.task, status = ?task.status, "Scheduled sweep task settled");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    #[test]
    fn test_wait_is_measured_on_the_injected_clock() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 7, 30, 0).unwrap());
        let (next, wait) = time_to_next_run(&clock, 9);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap());
        assert_eq!(wait, std::time::Duration::from_secs(90 * 60));

        clock.set(Utc.with_ymd_and_hms(2025, 5, 1, 21, 0, 0).unwrap());
        let (next, wait) = time_to_next_run(&clock, 9);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 5, 2, 9, 0, 0).unwrap());
        assert_eq!(wait, std::time::Duration::from_secs(12 * 60 * 60));
    }

    #[test]
    fn test_next_run_is_today_before_the_hour() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 7, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now, 9),
            Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, 9),
            Utc.with_ymd_and_hms(2025, 5, 2, 9, 0, 0).unwrap()
        );
    }
}
