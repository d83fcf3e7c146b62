use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::workflows::valuations::domain::{
    ActorRole, FormFamily, RawValuationRecord, ReviewContext, ValuationRecord,
};
use crate::workflows::valuations::service::{
    ApprovalDecision, EditPayload, MutationClient, MutationError, ReviewService,
};
use crate::workflows::valuations::sources::{SourceBatch, SourceError, ValuationSource};
use crate::workflows::valuations::status::ValuationStatus;

pub(super) fn ctx(role: ActorRole) -> ReviewContext {
    ReviewContext {
        username: "lata.krishnan".to_string(),
        role,
        client_id: "bank-ops".to_string(),
    }
}

pub(super) fn raw(unique_id: &str, status: &str, created_at: &str) -> RawValuationRecord {
    RawValuationRecord {
        unique_id: Some(unique_id.to_string()),
        status: Some(status.to_string()),
        created_at: Some(created_at.to_string()),
        ..RawValuationRecord::default()
    }
}

pub(super) fn merged(unique_id: &str, status: &str, family: FormFamily) -> ValuationRecord {
    ValuationRecord::from_raw(raw(unique_id, status, "2024-01-01T00:00:00Z"), family)
}

/// Canned source: answers with a fixed batch, or fails every fetch.
pub(super) struct StaticSource {
    family: FormFamily,
    records: Vec<RawValuationRecord>,
    healthy: bool,
}

impl StaticSource {
    pub(super) fn healthy(family: FormFamily, records: Vec<RawValuationRecord>) -> Arc<Self> {
        Arc::new(StaticSource {
            family,
            records,
            healthy: true,
        })
    }

    pub(super) fn failing(family: FormFamily) -> Arc<Self> {
        Arc::new(StaticSource {
            family,
            records: Vec::new(),
            healthy: false,
        })
    }
}

impl ValuationSource for StaticSource {
    fn form_family(&self) -> FormFamily {
        self.family
    }

    fn fetch_records<'a>(
        &'a self,
        _ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<SourceBatch, SourceError>> {
        Box::pin(async move {
            if self.healthy {
                Ok(SourceBatch {
                    data: self.records.clone(),
                })
            } else {
                Err(SourceError::Unavailable("store offline".to_string()))
            }
        })
    }
}

/// Records every mutation call and answers with the server-authoritative
/// status for the action, so tests can assert both the gating (no call made
/// on denial) and the adopt-the-server-status rule.
#[derive(Default)]
pub(super) struct MemoryMutations {
    pub(super) calls: Mutex<Vec<String>>,
    pub(super) fail: bool,
}

impl MemoryMutations {
    pub(super) fn failing() -> Self {
        MemoryMutations {
            calls: Mutex::default(),
            fail: true,
        }
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }

    fn answer(&self, id: &str, status: ValuationStatus, ctx: &ReviewContext) -> ValuationRecord {
        let mut record = raw(id, status.label(), "2024-01-01T00:00:00Z");
        record.last_updated_at = Some("2024-06-01T00:00:00Z".to_string());
        record.last_updated_by = Some(ctx.username.clone());
        ValuationRecord::from_raw(record, FormFamily::ShopForm)
    }
}

impl MutationClient for MemoryMutations {
    fn save_edit<'a>(
        &'a self,
        id: &'a str,
        _payload: &'a EditPayload,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>> {
        Box::pin(async move {
            self.record_call(format!("edit:{id}"));
            if self.fail {
                return Err(MutationError::Upstream("mutation transport down".to_string()));
            }
            Ok(self.answer(id, ValuationStatus::OnProgress, ctx))
        })
    }

    fn set_approval_decision<'a>(
        &'a self,
        id: &'a str,
        decision: &'a ApprovalDecision,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>> {
        Box::pin(async move {
            self.record_call(format!("decision:{id}"));
            if self.fail {
                return Err(MutationError::Upstream("mutation transport down".to_string()));
            }
            let mut record = self.answer(id, decision.verdict.status(), ctx);
            record.manager_feedback = decision.feedback.clone();
            Ok(record)
        })
    }

    fn request_rework<'a>(
        &'a self,
        id: &'a str,
        comments: Option<&'a str>,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>> {
        Box::pin(async move {
            self.record_call(format!("rework:{id}"));
            if self.fail {
                return Err(MutationError::Upstream("mutation transport down".to_string()));
            }
            let mut record = self.answer(id, ValuationStatus::Rework, ctx);
            record.manager_feedback = comments.map(str::to_string);
            Ok(record)
        })
    }
}

pub(super) fn review_service(
    sources: Vec<Arc<dyn ValuationSource>>,
    mutations: Arc<MemoryMutations>,
) -> ReviewService<MemoryMutations> {
    ReviewService::new(sources, mutations, 10)
}

/// One healthy source per form family, with the given records in the shop
/// store.
pub(super) fn shop_only_sources(records: Vec<RawValuationRecord>) -> Vec<Arc<dyn ValuationSource>> {
    vec![
        StaticSource::healthy(FormFamily::ShopForm, records),
        StaticSource::healthy(FormFamily::AltFlatForm, Vec::new()),
        StaticSource::healthy(FormFamily::ApfForm, Vec::new()),
    ]
}
