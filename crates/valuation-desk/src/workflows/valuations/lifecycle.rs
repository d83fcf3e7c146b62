use serde::{Deserialize, Serialize};

use super::domain::ActorRole;
use super::status::ValuationStatus;

/// Role-initiated actions governed by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewAction {
    SaveEdit,
    Approve,
    Reject,
    RequestRework,
}

impl ReviewAction {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewAction::SaveEdit => "save an edit to",
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::RequestRework => "request rework on",
        }
    }
}

/// Identity and contact fields only managers and admins may change. A
/// submitter with edit permission can still edit every other field.
pub const MANAGED_FIELDS: [&str; 9] = [
    "bankName",
    "city",
    "clientName",
    "mobileNumber",
    "address",
    "payment",
    "collectedBy",
    "dsa",
    "engineerName",
];

pub fn is_managed_field(field: &str) -> bool {
    MANAGED_FIELDS.contains(&field)
}

/// Edit permission per (role, status). A submitter cannot edit while a
/// manager or admin holds the record `on-progress`; that keeps concurrent
/// edits from colliding. Unknown statuses fall in no role's bucket except
/// admin's "any".
pub fn can_edit(role: ActorRole, status: Option<ValuationStatus>) -> bool {
    match role {
        ActorRole::Admin => true,
        ActorRole::Manager => matches!(
            status,
            Some(
                ValuationStatus::Pending
                    | ValuationStatus::Rejected
                    | ValuationStatus::OnProgress
                    | ValuationStatus::Rework
            )
        ),
        ActorRole::User => matches!(
            status,
            Some(
                ValuationStatus::Pending
                    | ValuationStatus::Rejected
                    | ValuationStatus::Rework
            )
        ),
    }
}

/// Approve/reject permission: managers and admins, from any state except
/// `approved`.
pub fn can_approve(role: ActorRole, status: Option<ValuationStatus>) -> bool {
    matches!(role, ActorRole::Manager | ActorRole::Admin)
        && matches!(
            status,
            Some(
                ValuationStatus::Pending
                    | ValuationStatus::OnProgress
                    | ValuationStatus::Rejected
                    | ValuationStatus::Rework
            )
        )
}

/// Rework can only be requested on an approved valuation, by a manager or
/// admin.
pub fn can_request_rework(role: ActorRole, status: Option<ValuationStatus>) -> bool {
    matches!(role, ActorRole::Manager | ActorRole::Admin)
        && status == Some(ValuationStatus::Approved)
}

pub fn can_edit_field(role: ActorRole, status: Option<ValuationStatus>, field: &str) -> bool {
    can_edit(role, status) && (role != ActorRole::User || !is_managed_field(field))
}

/// Raised when a (role, action, status) combination is outside the
/// transition table. Checked before any network mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} may not {} a valuation currently {}", role_label(.role), action_label(.action), status_label(.status))]
pub struct TransitionDenied {
    pub role: ActorRole,
    pub action: ReviewAction,
    pub status: Option<ValuationStatus>,
}

fn role_label(role: &ActorRole) -> &'static str {
    role.label()
}

fn action_label(action: &ReviewAction) -> &'static str {
    action.label()
}

fn status_label(status: &Option<ValuationStatus>) -> &'static str {
    match status {
        Some(status) => status.label(),
        None => "in an unknown status",
    }
}

/// The single table-driven transition function. Every successful edit save
/// lands on `on-progress` regardless of the actor's role; approval and
/// rejection are distinct actions that bypass the edit path.
pub fn resolve_transition(
    role: ActorRole,
    action: ReviewAction,
    status: Option<ValuationStatus>,
) -> Result<ValuationStatus, TransitionDenied> {
    let allowed = match action {
        ReviewAction::SaveEdit => can_edit(role, status),
        ReviewAction::Approve | ReviewAction::Reject => can_approve(role, status),
        ReviewAction::RequestRework => can_request_rework(role, status),
    };

    if !allowed {
        return Err(TransitionDenied {
            role,
            action,
            status,
        });
    }

    Ok(match action {
        ReviewAction::SaveEdit => ValuationStatus::OnProgress,
        ReviewAction::Approve => ValuationStatus::Approved,
        ReviewAction::Reject => ValuationStatus::Rejected,
        ReviewAction::RequestRework => ValuationStatus::Rework,
    })
}
