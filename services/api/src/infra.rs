use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use futures::future::BoxFuture;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use valuation_desk::workflows::valuations::{
    ActorRole, ApprovalDecision, EditPayload, FormFamily, MutationClient, MutationError,
    RawValuationRecord, ReviewContext, SourceBatch, SourceError, ValuationRecord,
    ValuationSource, ValuationStatus,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// One shared in-memory backing store for all three form families, so an
/// edit applied through the mutation client surfaces on the next fetch the
/// way the real stores behave.
#[derive(Default)]
pub(crate) struct InMemoryValuationStore {
    records: Mutex<HashMap<FormFamily, Vec<RawValuationRecord>>>,
    outages: Mutex<HashSet<FormFamily>>,
}

impl InMemoryValuationStore {
    pub(crate) fn seed(&self, family: FormFamily, records: Vec<RawValuationRecord>) {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.entry(family).or_default().extend(records);
    }

    /// Marks one family's store as unreachable; its source then degrades to
    /// an empty contribution instead of failing the merged view.
    pub(crate) fn set_outage(&self, family: FormFamily, down: bool) {
        let mut guard = self.outages.lock().expect("outage mutex poisoned");
        if down {
            guard.insert(family);
        } else {
            guard.remove(&family);
        }
    }

    fn is_down(&self, family: FormFamily) -> bool {
        self.outages
            .lock()
            .expect("outage mutex poisoned")
            .contains(&family)
    }

    fn visible(&self, family: FormFamily, ctx: &ReviewContext) -> Vec<RawValuationRecord> {
        let guard = self.records.lock().expect("store mutex poisoned");
        guard
            .get(&family)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| tenant_visible(record, ctx))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn mutate<F>(&self, id: &str, apply: F) -> Result<ValuationRecord, MutationError>
    where
        F: FnOnce(&mut RawValuationRecord) -> Result<(), MutationError>,
    {
        let wanted = id.trim();
        let mut guard = self.records.lock().expect("store mutex poisoned");
        for (family, records) in guard.iter_mut() {
            if let Some(record) = records
                .iter_mut()
                .find(|record| record.unique_id.as_deref().map(str::trim) == Some(wanted))
            {
                apply(record)?;
                return Ok(ValuationRecord::from_raw(record.clone(), *family));
            }
        }
        Err(MutationError::NotFound)
    }
}

/// Records with a tenant tag are only visible inside that tenant; untagged
/// legacy rows stay visible everywhere.
fn tenant_visible(record: &RawValuationRecord, ctx: &ReviewContext) -> bool {
    match record.client_id.as_deref() {
        Some(client_id) => client_id == ctx.client_id,
        None => true,
    }
}

/// Fetch handle for one form family backed by the shared store.
pub(crate) struct StoreSource {
    store: Arc<InMemoryValuationStore>,
    family: FormFamily,
}

impl StoreSource {
    pub(crate) fn new(store: Arc<InMemoryValuationStore>, family: FormFamily) -> Self {
        StoreSource { store, family }
    }
}

impl ValuationSource for StoreSource {
    fn form_family(&self) -> FormFamily {
        self.family
    }

    fn fetch_records<'a>(
        &'a self,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<SourceBatch, SourceError>> {
        Box::pin(async move {
            if self.store.is_down(self.family) {
                return Err(SourceError::Unavailable(format!(
                    "{} store offline",
                    self.family.label()
                )));
            }
            Ok(SourceBatch {
                data: self.store.visible(self.family, ctx),
            })
        })
    }
}

/// Mutation client applying the server-authoritative status rules against
/// the shared store: edit saves always land on `on-progress`, decisions set
/// the verdict status, rework only comes off an approved record.
pub(crate) struct StoreMutationClient {
    store: Arc<InMemoryValuationStore>,
}

impl StoreMutationClient {
    pub(crate) fn new(store: Arc<InMemoryValuationStore>) -> Self {
        StoreMutationClient { store }
    }
}

impl MutationClient for StoreMutationClient {
    fn save_edit<'a>(
        &'a self,
        id: &'a str,
        payload: &'a EditPayload,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>> {
        Box::pin(async move {
            self.store.mutate(id, |record| {
                for (field, value) in &payload.fields {
                    apply_field(record, field, value);
                }
                stamp(record, ValuationStatus::OnProgress, ctx);
                Ok(())
            })
        })
    }

    fn set_approval_decision<'a>(
        &'a self,
        id: &'a str,
        decision: &'a ApprovalDecision,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>> {
        Box::pin(async move {
            self.store.mutate(id, |record| {
                stamp(record, decision.verdict.status(), ctx);
                if decision.feedback.is_some() {
                    record.manager_feedback = decision.feedback.clone();
                }
                Ok(())
            })
        })
    }

    fn request_rework<'a>(
        &'a self,
        id: &'a str,
        comments: Option<&'a str>,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>> {
        Box::pin(async move {
            self.store.mutate(id, |record| {
                if valuation_desk::workflows::valuations::normalize(record.status.as_deref())
                    != Some(ValuationStatus::Approved)
                {
                    return Err(MutationError::Rejected(
                        "rework may only be requested on an approved valuation".to_string(),
                    ));
                }
                stamp(record, ValuationStatus::Rework, ctx);
                record.manager_feedback = comments.map(str::to_string);
                Ok(())
            })
        })
    }
}

fn stamp(record: &mut RawValuationRecord, status: ValuationStatus, ctx: &ReviewContext) {
    record.status = Some(status.label().to_string());
    record.last_updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    record.last_updated_by = Some(ctx.username.clone());
}

fn apply_field(record: &mut RawValuationRecord, field: &str, value: &Value) {
    match field {
        "clientName" => record.client_name = value_as_string(value),
        "city" => record.city = value_as_string(value),
        "bankName" => record.bank_name = value_as_string(value),
        "engineerName" => record.engineer_name = value_as_string(value),
        "address" => record.address = value_as_string(value),
        "mobileNumber" => record.mobile_number = value_as_string(value),
        "notes" => record.notes = value_as_string(value),
        "collectedBy" => record.collected_by = value_as_string(value),
        "dsa" => record.dsa = value_as_string(value),
        "dateTime" => record.date_time = value_as_string(value),
        "payment" => {
            record.payment = value
                .as_f64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()));
        }
        // Unknown form fields are dropped; the permission gate upstream has
        // already vetted the ones that matter.
        _ => {}
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<ActorRole, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "user" => Ok(ActorRole::User),
        "manager" => Ok(ActorRole::Manager),
        "admin" => Ok(ActorRole::Admin),
        other => Err(format!(
            "unknown role '{other}' (expected user, manager, or admin)"
        )),
    }
}
