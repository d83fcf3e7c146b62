//! Valuation record reconciliation and review-workflow engine.
//!
//! Records for the same logical submission can surface from any of three
//! independently stored form families. This module merges them into one
//! consistent working set (aggregate, then deduplicate), enforces the
//! status state machine and role-based permissions on top of it, and keeps
//! the derived dashboard view (filters, sort, pagination, per-status
//! counts, elapsed durations) fresh for the presentation layer.

pub mod dashboard;
pub mod dedup;
pub mod domain;
pub mod duration;
pub mod import;
pub mod lifecycle;
pub mod router;
pub mod service;
pub mod sources;
pub mod status;

#[cfg(test)]
mod tests;

pub use dashboard::{
    DashboardPage, DashboardState, RecordFilters, SortField, SortOrder, SortState, StatusCounts,
};
pub use dedup::deduplicate;
pub use domain::{
    parse_instant, ActorRole, FormFamily, RawValuationRecord, ReviewContext, ValuationRecord,
};
pub use duration::{compute_durations, DurationTicker, ElapsedBreakdown};
pub use import::{SeedRecord, ValuationCsvImportError, ValuationCsvImporter};
pub use lifecycle::{
    can_approve, can_edit, can_edit_field, can_request_rework, is_managed_field,
    resolve_transition, ReviewAction, TransitionDenied, MANAGED_FIELDS,
};
pub use router::valuation_router;
pub use service::{
    ApprovalDecision, ApprovalVerdict, EditPayload, MutationClient, MutationError,
    RecordPermissions, ReviewService, ReviewServiceError,
};
pub use sources::{aggregate, SourceBatch, SourceError, ValuationSource};
pub use status::{normalize, ValuationStatus};
