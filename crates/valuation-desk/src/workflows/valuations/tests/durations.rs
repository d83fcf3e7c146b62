use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use crate::workflows::valuations::dashboard::DashboardState;
use crate::workflows::valuations::domain::{FormFamily, ValuationRecord};
use crate::workflows::valuations::duration::{
    compute_durations, DurationTicker, ElapsedBreakdown,
};

use super::common::{merged, raw};

#[test]
fn decomposes_whole_seconds_without_rounding() {
    assert_eq!(
        ElapsedBreakdown::from_seconds(2 * 86_400),
        ElapsedBreakdown {
            days: 2,
            hours: 0,
            minutes: 0,
            seconds: 0
        }
    );
    assert_eq!(
        ElapsedBreakdown::from_seconds(90_061),
        ElapsedBreakdown {
            days: 1,
            hours: 1,
            minutes: 1,
            seconds: 1
        }
    );
    assert_eq!(
        ElapsedBreakdown::from_seconds(59),
        ElapsedBreakdown {
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 59
        }
    );
}

#[test]
fn future_created_at_yields_a_negative_decomposition() {
    let breakdown = ElapsedBreakdown::from_seconds(-90_061);
    assert_eq!(breakdown.days, -1);
    assert_eq!(breakdown.hours, -1);
    assert_eq!(breakdown.minutes, -1);
    assert_eq!(breakdown.seconds, -1);
    assert_eq!(breakdown.total_seconds(), -90_061);
}

#[test]
fn total_seconds_round_trips() {
    for total in [0, 1, 59, 60, 3_599, 3_600, 86_399, 86_400, 1_234_567] {
        assert_eq!(ElapsedBreakdown::from_seconds(total).total_seconds(), total);
    }
}

#[test]
fn approved_and_unknown_records_are_not_tracked() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let records = vec![
        merged("P", "pending", FormFamily::ShopForm),
        merged("A", "approved", FormFamily::ShopForm),
        merged("U", "closed", FormFamily::ShopForm),
        merged("R", "rework", FormFamily::ApfForm),
    ];

    let durations = compute_durations(&records, now);
    assert!(durations.contains_key("P"));
    assert!(durations.contains_key("R"));
    assert!(!durations.contains_key("A"), "approval freezes the duration");
    assert!(!durations.contains_key("U"));
}

#[test]
fn records_without_created_at_are_skipped() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let record = raw("X", "pending", "not-a-date");
    let records = vec![ValuationRecord::from_raw(record, FormFamily::ShopForm)];

    assert!(compute_durations(&records, now).is_empty());
}

#[test]
fn elapsed_is_now_minus_created_at_in_whole_seconds() {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let now = created + Duration::days(2) + Duration::hours(3) + Duration::seconds(5);

    let records = vec![merged_at("X", created.to_rfc3339())];
    let durations = compute_durations(&records, now);
    let breakdown = durations.get("X").expect("tracked");

    assert_eq!(breakdown.days, 2);
    assert_eq!(breakdown.hours, 3);
    assert_eq!(breakdown.minutes, 0);
    assert_eq!(breakdown.seconds, 5);
}

fn merged_at(unique_id: &str, created_at: String) -> ValuationRecord {
    ValuationRecord::from_raw(raw(unique_id, "pending", &created_at), FormFamily::ShopForm)
}

#[tokio::test]
async fn ticker_stops_cleanly_and_twice() {
    let dashboard = Arc::new(DashboardState::new(10));
    dashboard.replace_records(
        vec![merged("X", "pending", FormFamily::ShopForm)],
        Utc::now(),
    );

    let ticker = DurationTicker::start(Arc::clone(&dashboard));
    ticker.stop();
    ticker.stop();
    drop(ticker);

    // The snapshot survives the ticker's teardown.
    assert_eq!(dashboard.records().len(), 1);
}
