use crate::infra::{parse_role, InMemoryValuationStore, StoreMutationClient, StoreSource};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use valuation_desk::error::AppError;
use valuation_desk::workflows::valuations::{
    ActorRole, ApprovalDecision, ApprovalVerdict, EditPayload, FormFamily, RawValuationRecord,
    ReviewContext, ReviewService, SortField, SortOrder, ValuationCsvImporter, ValuationSource,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Optional CSV export used to seed the in-memory form stores
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Role used for the initial dashboard refresh
    #[arg(long, value_parser = parse_role, default_value = "admin")]
    pub(crate) role: ActorRole,
    /// Dashboard page size for the demo output
    #[arg(long, default_value_t = 10)]
    pub(crate) page_size: usize,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        csv,
        role,
        page_size,
    } = args;

    let store = Arc::new(InMemoryValuationStore::default());
    seed_store(&store, csv)?;
    // One family starts out unreachable so the silent-degradation path is
    // visible in the walkthrough.
    store.set_outage(FormFamily::ApfForm, true);

    let sources: Vec<Arc<dyn ValuationSource>> = FormFamily::ALL
        .into_iter()
        .map(|family| {
            Arc::new(StoreSource::new(Arc::clone(&store), family)) as Arc<dyn ValuationSource>
        })
        .collect();
    let service = ReviewService::new(
        sources,
        Arc::new(StoreMutationClient::new(Arc::clone(&store))),
        page_size,
    );

    let ctx = ReviewContext {
        username: "demo.reviewer".to_string(),
        role,
        client_id: "bank-ops".to_string(),
    };

    println!("Valuation review demo");
    let merged = service.refresh(&ctx).await;
    println!(
        "- merged {merged} records across the form stores ({} offline, degraded silently)",
        FormFamily::ApfForm.label()
    );
    print_counts(&service);

    store.set_outage(FormFamily::ApfForm, false);
    let merged = service.refresh(&ctx).await;
    println!("- store back online: merged set now holds {merged} records");
    print_counts(&service);

    let dashboard = service.dashboard();
    dashboard.set_sort(SortField::Duration, SortOrder::Desc);
    println!("\nLongest-waiting submissions:");
    let page = dashboard.view();
    let durations = dashboard.durations();
    for record in &page.records {
        let id = record.unique_id.as_deref().unwrap_or("(no id)");
        let age = record
            .dedup_key()
            .and_then(|key| durations.get(key))
            .map(|elapsed| format!("{}d {}h {}m", elapsed.days, elapsed.hours, elapsed.minutes))
            .unwrap_or_else(|| "frozen".to_string());
        println!(
            "  - {id}: {} | {} | waiting {age}",
            record
                .status
                .map(|status| status.label())
                .unwrap_or("unknown"),
            record.client_name.as_deref().unwrap_or("-"),
        );
    }

    walk_review_round_trip(&service).await;

    println!("\nFinal tallies:");
    print_counts(&service);
    Ok(())
}

async fn walk_review_round_trip(service: &ReviewService<StoreMutationClient>) {
    let Some(pending) = service
        .page()
        .records
        .iter()
        .find(|record| {
            record.status
                == Some(valuation_desk::workflows::valuations::ValuationStatus::Pending)
        })
        .and_then(|record| record.dedup_key().map(str::to_string))
    else {
        println!("\nNo pending submission available for the review walkthrough.");
        return;
    };

    let manager = ReviewContext {
        username: "priya.menon".to_string(),
        role: ActorRole::Manager,
        client_id: "bank-ops".to_string(),
    };
    let submitter = ReviewContext {
        username: "ops.sharma".to_string(),
        role: ActorRole::User,
        client_id: "bank-ops".to_string(),
    };

    println!("\nReview round trip for {pending}:");

    match service
        .submit_decision(
            &pending,
            &ApprovalDecision {
                verdict: ApprovalVerdict::Approved,
                feedback: Some("measurements verified".to_string()),
            },
            &manager,
        )
        .await
    {
        Ok(record) => println!(
            "  - manager approved -> {}",
            record.status.map(|s| s.label()).unwrap_or("unknown")
        ),
        Err(err) => println!("  - approval failed: {err}"),
    }

    match service
        .request_rework(&pending, Some("frontage photos missing"), &manager)
        .await
    {
        Ok(record) => println!(
            "  - manager requested rework -> {}",
            record.status.map(|s| s.label()).unwrap_or("unknown")
        ),
        Err(err) => println!("  - rework request failed: {err}"),
    }

    // The submitter's resave lands the record back on on-progress; a second
    // user trying to edit it now gets a denial.
    let mut payload = EditPayload::default();
    payload.fields.insert(
        "notes".to_string(),
        serde_json::Value::String("photos attached".to_string()),
    );
    match service.save_edit(&pending, &payload, &submitter).await {
        Ok(record) => println!(
            "  - submitter resaved -> {}",
            record.status.map(|s| s.label()).unwrap_or("unknown")
        ),
        Err(err) => println!("  - resave failed: {err}"),
    }

    match service.save_edit(&pending, &payload, &submitter).await {
        Ok(_) => println!("  - unexpected: concurrent submitter edit went through"),
        Err(err) => println!("  - concurrent submitter edit denied: {err}"),
    }
}

fn print_counts(service: &ReviewService<StoreMutationClient>) {
    let counts = service.counts();
    println!(
        "  pending {} | on-progress {} | approved {} | rejected {} | rework {}",
        counts.pending, counts.on_progress, counts.approved, counts.rejected, counts.rework
    );
}

fn seed_store(
    store: &Arc<InMemoryValuationStore>,
    csv: Option<PathBuf>,
) -> Result<(), AppError> {
    if let Some(path) = csv {
        for seed in ValuationCsvImporter::from_path(path)? {
            store.seed(seed.family.unwrap_or(FormFamily::ShopForm), vec![seed.record]);
        }
        return Ok(());
    }

    for (family, records) in sample_records() {
        store.seed(family, records);
    }
    Ok(())
}

fn sample_records() -> Vec<(FormFamily, Vec<RawValuationRecord>)> {
    let record = |id: &str, status: &str, client: &str, city: &str, days_old: i64| {
        let created = chrono::Utc::now() - chrono::Duration::days(days_old);
        RawValuationRecord {
            unique_id: Some(id.to_string()),
            status: Some(status.to_string()),
            created_at: Some(created.to_rfc3339()),
            client_name: Some(client.to_string()),
            city: Some(city.to_string()),
            bank_name: Some("Axis Bank".to_string()),
            client_id: Some("bank-ops".to_string()),
            ..RawValuationRecord::default()
        }
    };

    // VAL-1004 was written to two stores; the flat copy carries the fresher
    // update and should win reconciliation.
    let mut stale_copy = record("VAL-1004", "pending", "Mehta Residency", "Mumbai", 12);
    stale_copy.last_updated_at = Some(
        (chrono::Utc::now() - chrono::Duration::days(10)).to_rfc3339(),
    );
    let mut fresh_copy = record("VAL-1004", "on-progress", "Mehta Residency", "Mumbai", 12);
    fresh_copy.last_updated_at = Some(
        (chrono::Utc::now() - chrono::Duration::days(2)).to_rfc3339(),
    );

    vec![
        (
            FormFamily::ShopForm,
            vec![
                record("VAL-1001", "pending", "Sharma Traders", "Pune", 3),
                record("VAL-1002", "approved", "Patil Hardware", "Nashik", 25),
                stale_copy,
            ],
        ),
        (
            FormFamily::AltFlatForm,
            vec![
                fresh_copy,
                record("VAL-1005", "rejected", "Rao Apartments", "Hyderabad", 8),
            ],
        ),
        (
            FormFamily::ApfForm,
            vec![record("VAL-1006", "closed", "Verma Estates", "Delhi", 5)],
        ),
    ]
}
