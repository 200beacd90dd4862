//! REST endpoints over the response engine.
//!
//! Only `NotFound` (404) and `InvalidState` (409) surface as request-level
//! errors; diagnosis and actuation failures are absorbed into the event's
//! own state by the engine.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use remediation::{
    EngineError, EngineStats, EventListing, EventStatus, ReportOutcome, ReportedEvent,
    SharedResponseEngine, SuggestedAction,
};

/// Default listing bound when the caller does not pass one.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Request-level error wrapper with the HTTP mapping.
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidState(_) => StatusCode::CONFLICT,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<EventStatus>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RejectRequest {
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct AckResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct PendingActionsResponse {
    actions: Vec<SuggestedAction>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the API router over a shared engine.
pub fn api_router(engine: SharedResponseEngine) -> Router {
    Router::new()
        .route("/events", get(list_events).post(report_event))
        .route("/actions/:id/approve", post(approve_action))
        .route("/actions/:id/reject", post(reject_action))
        .route("/actions/pending", get(pending_actions))
        .route("/stats", get(get_stats))
        .route("/health", get(health))
        .with_state(engine)
}

async fn list_events(
    State(engine): State<SharedResponseEngine>,
    Query(params): Query<ListParams>,
) -> Result<Json<EventListing>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(engine.list(params.status, limit)?))
}

async fn report_event(
    State(engine): State<SharedResponseEngine>,
    Json(report): Json<ReportedEvent>,
) -> Result<Json<ReportOutcome>, ApiError> {
    Ok(Json(engine.report(report).await?))
}

async fn approve_action(
    State(engine): State<SharedResponseEngine>,
    Path(action_id): Path<String>,
) -> Result<Json<AckResponse>, ApiError> {
    engine.approve(&action_id)?;
    Ok(Json(AckResponse { success: true }))
}

async fn reject_action(
    State(engine): State<SharedResponseEngine>,
    Path(action_id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<AckResponse>, ApiError> {
    let reason = body.and_then(|Json(req)| req.reason);
    engine.reject(&action_id, reason)?;
    Ok(Json(AckResponse { success: true }))
}

async fn pending_actions(
    State(engine): State<SharedResponseEngine>,
) -> Result<Json<PendingActionsResponse>, ApiError> {
    Ok(Json(PendingActionsResponse {
        actions: engine.pending_actions()?,
    }))
}

async fn get_stats(
    State(engine): State<SharedResponseEngine>,
) -> Result<Json<EngineStats>, ApiError> {
    Ok(Json(engine.stats()?))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
