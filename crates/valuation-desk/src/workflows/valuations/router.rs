use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dashboard::{DashboardPage, RecordFilters, SortField, SortOrder, StatusCounts};
use super::domain::{ActorRole, ReviewContext};
use super::service::{
    ApprovalDecision, ApprovalVerdict, EditPayload, MutationClient, MutationError, ReviewService,
    ReviewServiceError,
};
use super::status::ValuationStatus;

/// Router builder exposing the reconciled dashboard and the mutation path.
pub fn valuation_router<M>(service: Arc<ReviewService<M>>) -> Router
where
    M: MutationClient + 'static,
{
    Router::new()
        .route("/api/v1/valuations", get(list_handler::<M>))
        .route("/api/v1/valuations/refresh", post(refresh_handler::<M>))
        .route("/api/v1/valuations/counts", get(counts_handler::<M>))
        .route(
            "/api/v1/valuations/:id/permissions",
            get(permissions_handler::<M>),
        )
        .route("/api/v1/valuations/:id/edit", post(edit_handler::<M>))
        .route(
            "/api/v1/valuations/:id/decision",
            post(decision_handler::<M>),
        )
        .route("/api/v1/valuations/:id/rework", post(rework_handler::<M>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    status: Option<ValuationStatus>,
    city: Option<String>,
    bank: Option<String>,
    engineer: Option<String>,
    sort: Option<SortField>,
    order: Option<SortOrder>,
    page: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshSummary {
    pub(crate) merged: usize,
    pub(crate) counts: StatusCounts,
}

pub(crate) async fn list_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
    Query(query): Query<ListQuery>,
) -> axum::Json<DashboardPage>
where
    M: MutationClient + 'static,
{
    let dashboard = service.dashboard();
    dashboard.set_filters(RecordFilters {
        status: query.status,
        city: query.city,
        bank_name: query.bank,
        engineer_name: query.engineer,
    });

    if let Some(field) = query.sort {
        match query.order {
            Some(order) => dashboard.set_sort(field, order),
            // Re-selecting a field without an explicit order flips it.
            None => dashboard.toggle_sort(field),
        }
    }

    if let Some(page) = query.page {
        dashboard.set_page(page);
    }

    axum::Json(dashboard.view())
}

pub(crate) async fn refresh_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
    axum::Json(ctx): axum::Json<ReviewContext>,
) -> axum::Json<RefreshSummary>
where
    M: MutationClient + 'static,
{
    let merged = service.refresh(&ctx).await;
    axum::Json(RefreshSummary {
        merged,
        counts: service.counts(),
    })
}

pub(crate) async fn counts_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
) -> axum::Json<StatusCounts>
where
    M: MutationClient + 'static,
{
    axum::Json(service.counts())
}

#[derive(Debug, Deserialize)]
pub(crate) struct PermissionsQuery {
    role: ActorRole,
}

pub(crate) async fn permissions_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
    Path(id): Path<String>,
    Query(query): Query<PermissionsQuery>,
) -> Response
where
    M: MutationClient + 'static,
{
    match service.permissions(&id, query.role) {
        Ok(permissions) => (StatusCode::OK, axum::Json(permissions)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditRequest {
    pub(crate) ctx: ReviewContext,
    #[serde(default)]
    pub(crate) fields: BTreeMap<String, Value>,
}

pub(crate) async fn edit_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<EditRequest>,
) -> Response
where
    M: MutationClient + 'static,
{
    let payload = EditPayload {
        fields: request.fields,
    };
    match service.save_edit(&id, &payload, &request.ctx).await {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) ctx: ReviewContext,
    pub(crate) verdict: ApprovalVerdict,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

pub(crate) async fn decision_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    M: MutationClient + 'static,
{
    let decision = ApprovalDecision {
        verdict: request.verdict,
        feedback: request.feedback,
    };
    match service.submit_decision(&id, &decision, &request.ctx).await {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReworkRequest {
    pub(crate) ctx: ReviewContext,
    #[serde(default)]
    pub(crate) comments: Option<String>,
}

pub(crate) async fn rework_handler<M>(
    State(service): State<Arc<ReviewService<M>>>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<ReworkRequest>,
) -> Response
where
    M: MutationClient + 'static,
{
    match service
        .request_rework(&id, request.comments.as_deref(), &request.ctx)
        .await
    {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ReviewServiceError) -> Response {
    let status = match &error {
        ReviewServiceError::RecordNotFound(_)
        | ReviewServiceError::Mutation(MutationError::NotFound) => StatusCode::NOT_FOUND,
        ReviewServiceError::Transition(_) | ReviewServiceError::FieldRestricted { .. } => {
            StatusCode::FORBIDDEN
        }
        ReviewServiceError::Mutation(_) => StatusCode::BAD_GATEWAY,
    };

    let body = axum::Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}
