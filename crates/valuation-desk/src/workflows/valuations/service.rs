use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::dashboard::{DashboardPage, DashboardState, StatusCounts};
use super::dedup::deduplicate;
use super::domain::{ActorRole, ReviewContext, ValuationRecord};
use super::lifecycle::{self, ReviewAction, TransitionDenied, MANAGED_FIELDS};
use super::sources::{aggregate, ValuationSource};
use super::status::ValuationStatus;

/// Field-name to value map carried by an edit save. Field names use the
/// wire's camelCase spelling so the per-field permission check sees the same
/// identifiers the form posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditPayload {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalVerdict {
    Approved,
    Rejected,
}

impl ApprovalVerdict {
    pub const fn action(self) -> ReviewAction {
        match self {
            ApprovalVerdict::Approved => ReviewAction::Approve,
            ApprovalVerdict::Rejected => ReviewAction::Reject,
        }
    }

    pub const fn status(self) -> ValuationStatus {
        match self {
            ApprovalVerdict::Approved => ValuationStatus::Approved,
            ApprovalVerdict::Rejected => ValuationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub verdict: ApprovalVerdict,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Error enumeration for mutation transport failures.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("record not found upstream")]
    NotFound,
    #[error("mutation rejected upstream: {0}")]
    Rejected(String),
    #[error("mutation transport failed: {0}")]
    Upstream(String),
}

/// Outbound mutation seam. The server is authoritative for the resulting
/// status: an edit save always resolves to `on-progress`, and callers adopt
/// the returned record rather than their own optimistic value.
pub trait MutationClient: Send + Sync {
    fn save_edit<'a>(
        &'a self,
        id: &'a str,
        payload: &'a EditPayload,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>>;

    fn set_approval_decision<'a>(
        &'a self,
        id: &'a str,
        decision: &'a ApprovalDecision,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>>;

    fn request_rework<'a>(
        &'a self,
        id: &'a str,
        comments: Option<&'a str>,
        ctx: &'a ReviewContext,
    ) -> BoxFuture<'a, Result<ValuationRecord, MutationError>>;
}

/// Error raised by the review service. Each variant renders as the single
/// consolidated message shown to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("no valuation with id '{0}' in the current working set")]
    RecordNotFound(String),
    #[error(transparent)]
    Transition(#[from] TransitionDenied),
    #[error("field '{field}' may only be edited by a manager or admin")]
    FieldRestricted { field: String },
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// Permission predicates for one inspected record, shaped for the
/// presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPermissions {
    pub can_edit: bool,
    pub can_approve: bool,
    pub can_request_rework: bool,
    pub locked_fields: Vec<&'static str>,
}

/// Facade composing the source aggregator, deduplicator, workflow table,
/// and dashboard state.
pub struct ReviewService<M> {
    sources: Vec<Arc<dyn ValuationSource>>,
    mutations: Arc<M>,
    dashboard: Arc<DashboardState>,
}

impl<M> ReviewService<M>
where
    M: MutationClient + 'static,
{
    pub fn new(sources: Vec<Arc<dyn ValuationSource>>, mutations: Arc<M>, page_size: usize) -> Self {
        ReviewService {
            sources,
            mutations,
            dashboard: Arc::new(DashboardState::new(page_size)),
        }
    }

    pub fn dashboard(&self) -> Arc<DashboardState> {
        Arc::clone(&self.dashboard)
    }

    /// Pulls every source, reconciles duplicates, and publishes the merged
    /// set as a fresh snapshot. Returns the merged record count.
    pub async fn refresh(&self, ctx: &ReviewContext) -> usize {
        let merged = deduplicate(aggregate(&self.sources, ctx).await);
        let total = merged.len();
        debug!(total, "merged valuation working set refreshed");
        self.dashboard.replace_records(merged, Utc::now());
        total
    }

    /// Saves an edit. Permission and field checks run against the freshest
    /// known state before the mutation client is called; on success the
    /// server-returned record (status included) replaces the local one.
    pub async fn save_edit(
        &self,
        id: &str,
        payload: &EditPayload,
        ctx: &ReviewContext,
    ) -> Result<ValuationRecord, ReviewServiceError> {
        let current = self.current_record(id)?;
        lifecycle::resolve_transition(ctx.role, ReviewAction::SaveEdit, current.status)?;

        for field in payload.fields.keys() {
            if !lifecycle::can_edit_field(ctx.role, current.status, field) {
                return Err(ReviewServiceError::FieldRestricted {
                    field: field.clone(),
                });
            }
        }

        let updated = self.mutations.save_edit(id, payload, ctx).await?;
        self.dashboard.adopt_record(updated.clone(), Utc::now());
        Ok(updated)
    }

    pub async fn submit_decision(
        &self,
        id: &str,
        decision: &ApprovalDecision,
        ctx: &ReviewContext,
    ) -> Result<ValuationRecord, ReviewServiceError> {
        let current = self.current_record(id)?;
        lifecycle::resolve_transition(ctx.role, decision.verdict.action(), current.status)?;

        let updated = self.mutations.set_approval_decision(id, decision, ctx).await?;
        self.dashboard.adopt_record(updated.clone(), Utc::now());
        Ok(updated)
    }

    pub async fn request_rework(
        &self,
        id: &str,
        comments: Option<&str>,
        ctx: &ReviewContext,
    ) -> Result<ValuationRecord, ReviewServiceError> {
        let current = self.current_record(id)?;
        lifecycle::resolve_transition(ctx.role, ReviewAction::RequestRework, current.status)?;

        let updated = self.mutations.request_rework(id, comments, ctx).await?;
        self.dashboard.adopt_record(updated.clone(), Utc::now());
        Ok(updated)
    }

    pub fn permissions(
        &self,
        id: &str,
        role: ActorRole,
    ) -> Result<RecordPermissions, ReviewServiceError> {
        let record = self.current_record(id)?;
        Ok(RecordPermissions {
            can_edit: lifecycle::can_edit(role, record.status),
            can_approve: lifecycle::can_approve(role, record.status),
            can_request_rework: lifecycle::can_request_rework(role, record.status),
            locked_fields: if role == ActorRole::User {
                MANAGED_FIELDS.to_vec()
            } else {
                Vec::new()
            },
        })
    }

    pub fn counts(&self) -> StatusCounts {
        self.dashboard.counts()
    }

    pub fn page(&self) -> DashboardPage {
        self.dashboard.view()
    }

    fn current_record(&self, id: &str) -> Result<ValuationRecord, ReviewServiceError> {
        self.dashboard
            .find_record(id)
            .ok_or_else(|| ReviewServiceError::RecordNotFound(id.to_owned()))
    }
}
