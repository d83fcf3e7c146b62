use std::sync::Arc;

use crate::workflows::valuations::domain::{ActorRole, FormFamily};
use crate::workflows::valuations::sources::{aggregate, ValuationSource};

use super::common::{ctx, raw, StaticSource};

#[tokio::test]
async fn one_healthy_source_is_enough() {
    let sources: Vec<Arc<dyn ValuationSource>> = vec![
        StaticSource::failing(FormFamily::ShopForm),
        StaticSource::healthy(
            FormFamily::AltFlatForm,
            vec![raw("X", "pending", "2024-01-01T00:00:00Z")],
        ),
        StaticSource::failing(FormFamily::ApfForm),
    ];

    let records = aggregate(&sources, &ctx(ActorRole::Manager)).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dedup_key(), Some("X"));
    assert_eq!(records[0].form_family, FormFamily::AltFlatForm);
}

#[tokio::test]
async fn all_sources_down_degrades_to_an_empty_set() {
    let sources: Vec<Arc<dyn ValuationSource>> = vec![
        StaticSource::failing(FormFamily::ShopForm),
        StaticSource::failing(FormFamily::AltFlatForm),
        StaticSource::failing(FormFamily::ApfForm),
    ];

    let records = aggregate(&sources, &ctx(ActorRole::Admin)).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn every_record_carries_the_producing_sources_family() {
    // The same raw payload lands in two stores; the tag must come from the
    // source, never from record content.
    let shared = raw("DUP", "pending", "2024-01-01T00:00:00Z");
    let sources: Vec<Arc<dyn ValuationSource>> = vec![
        StaticSource::healthy(FormFamily::ShopForm, vec![shared.clone()]),
        StaticSource::healthy(FormFamily::ApfForm, vec![shared]),
    ];

    let records = aggregate(&sources, &ctx(ActorRole::User)).await;
    assert_eq!(records.len(), 2, "the aggregator never deduplicates");
    assert_eq!(records[0].form_family, FormFamily::ShopForm);
    assert_eq!(records[1].form_family, FormFamily::ApfForm);
}

#[tokio::test]
async fn contributions_arrive_in_configured_source_order() {
    let sources: Vec<Arc<dyn ValuationSource>> = vec![
        StaticSource::healthy(
            FormFamily::ShopForm,
            vec![
                raw("S1", "pending", "2024-01-01T00:00:00Z"),
                raw("S2", "approved", "2024-01-02T00:00:00Z"),
            ],
        ),
        StaticSource::healthy(
            FormFamily::AltFlatForm,
            vec![raw("F1", "rework", "2024-01-03T00:00:00Z")],
        ),
    ];

    let records = aggregate(&sources, &ctx(ActorRole::Manager)).await;
    let keys: Vec<_> = records.iter().map(|r| r.dedup_key().unwrap()).collect();
    assert_eq!(keys, ["S1", "S2", "F1"]);
}
