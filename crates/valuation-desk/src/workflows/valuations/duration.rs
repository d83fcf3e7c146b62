use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::dashboard::DashboardState;
use super::domain::ValuationRecord;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_MINUTE: i64 = 60;

/// Cadence of the display-freshness recomputation.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Elapsed time-in-state decomposed with truncating division. A `created_at`
/// in the future produces a negative decomposition; callers treat negative
/// days as an upstream data anomaly, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElapsedBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl ElapsedBreakdown {
    pub fn from_seconds(total: i64) -> Self {
        let days = total / SECONDS_PER_DAY;
        let mut remainder = total % SECONDS_PER_DAY;
        let hours = remainder / SECONDS_PER_HOUR;
        remainder %= SECONDS_PER_HOUR;

        ElapsedBreakdown {
            days,
            hours,
            minutes: remainder / SECONDS_PER_MINUTE,
            seconds: remainder % SECONDS_PER_MINUTE,
        }
    }

    pub fn total_seconds(&self) -> i64 {
        self.days * SECONDS_PER_DAY
            + self.hours * SECONDS_PER_HOUR
            + self.minutes * SECONDS_PER_MINUTE
            + self.seconds
    }
}

/// Elapsed time since creation for every record still moving through review.
/// Approved valuations freeze their visible duration and are skipped, as are
/// records with an unknown status, no usable id, or no parsed `created_at`.
/// Pure and idempotent; cheap enough to run over the full set every tick.
pub fn compute_durations(
    records: &[ValuationRecord],
    now: DateTime<Utc>,
) -> HashMap<String, ElapsedBreakdown> {
    let mut durations = HashMap::new();

    for record in records {
        if !record.tracks_duration() {
            continue;
        }
        let (Some(key), Some(created_at)) = (record.dedup_key(), record.created_at) else {
            continue;
        };
        durations.insert(
            key.to_owned(),
            ElapsedBreakdown::from_seconds((now - created_at).num_seconds()),
        );
    }

    durations
}

/// Cooperative task recomputing the dashboard's duration map once per
/// second. Tied to the consuming view's lifetime: stopped explicitly or
/// aborted on drop, so a torn-down session leaks no timer.
pub struct DurationTicker {
    handle: JoinHandle<()>,
}

impl DurationTicker {
    pub fn start(dashboard: Arc<DashboardState>) -> Self {
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(REFRESH_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                dashboard.refresh_durations(Utc::now());
            }
        });

        DurationTicker { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for DurationTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
