//! REST endpoints over the onboarding operations and read accessors.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::application::model::{BusinessProfile, SubscriptionPlan};
use crate::application::ApplicationStateMachine;
use crate::error::{Error, TaskError, WorkflowError};
use crate::tasks::TaskClaimCoordinator;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct ApiState {
    pub machine: Arc<ApplicationStateMachine>,
    pub claims: Arc<TaskClaimCoordinator>,
}

impl ApiState {
    pub fn new(machine: Arc<ApplicationStateMachine>) -> Self {
        let claims = machine.claims();
        Self { machine, claims }
    }
}

#[derive(Debug, Deserialize)]
struct InitiateRequest {
    user_id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct AcceptRequest {
    staff_id: String,
}

#[derive(Debug, Deserialize)]
struct CompleteRequest {
    approved: bool,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    rejection_reason: Option<String>,
}

/// Map engine errors onto HTTP statuses.
fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Workflow(WorkflowError::ApplicationNotFound { .. })
        | Error::Task(TaskError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Workflow(WorkflowError::MissingRejectionReason) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Task(TaskError::NotAssignedToStaff { .. }) => StatusCode::FORBIDDEN,
        Error::Workflow(_) | Error::Task(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// POST /api/onboarding/applications
async fn initiate(
    State(state): State<ApiState>,
    Json(req): Json<InitiateRequest>,
) -> Response {
    match state.machine.initiate(&req.user_id, &req.email).await {
        Ok(app) => (StatusCode::CREATED, Json(app)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/onboarding/applications/{id}/business-info
async fn record_business_info(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(profile): Json<BusinessProfile>,
) -> Response {
    match state.machine.record_business_info(id, profile).await {
        Ok(app) => Json(app).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/onboarding/applications/{id}/subscription
async fn confirm_subscription(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(plan): Json<SubscriptionPlan>,
) -> Response {
    match state.machine.confirm_subscription(id, plan).await {
        Ok(app) => Json(app).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/applications/{id}/activate
async fn activate(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.machine.activate(id).await {
        Ok(app) => Json(app).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/tasks/{id}/accept
async fn accept_task(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AcceptRequest>,
) -> Response {
    match state.claims.accept(id, &req.staff_id).await {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/tasks/{id}/complete
async fn complete_task(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteRequest>,
) -> Response {
    match state
        .machine
        .complete_review(
            id,
            req.approved,
            req.notes.as_deref(),
            req.rejection_reason.as_deref(),
        )
        .await
    {
        Ok(app) => Json(app).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/applications/{id}
async fn get_application(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.machine.application(id).await {
        Ok(app) => Json(app).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/applications/{id}/business-info
async fn get_business_info(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.machine.business_info(id).await {
        Ok(Some(info)) => Json(info).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No business info recorded" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/applications/{id}/subscription
async fn get_subscription(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.machine.subscription(id).await {
        Ok(Some(sub)) => Json(sub).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No subscription confirmed" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/applications/pending
async fn pending_applications(State(state): State<ApiState>) -> Response {
    match state.machine.pending_applications().await {
        Ok(apps) => Json(apps).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/staff/{staff_id}/tasks
async fn staff_tasks(State(state): State<ApiState>, Path(staff_id): Path<String>) -> Response {
    match state.machine.tasks_for_staff(&staff_id).await {
        Ok(tasks) => Json(tasks).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/users/{user_id}/notifications
async fn user_notifications(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.machine.notifications_for_user(&user_id).await {
        Ok(notifications) => Json(notifications).into_response(),
        Err(e) => error_response(e),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/onboarding/applications", post(initiate))
        .route(
            "/api/onboarding/applications/pending",
            get(pending_applications),
        )
        .route("/api/onboarding/applications/{id}", get(get_application))
        .route(
            "/api/onboarding/applications/{id}/business-info",
            put(record_business_info).get(get_business_info),
        )
        .route(
            "/api/onboarding/applications/{id}/subscription",
            put(confirm_subscription).get(get_subscription),
        )
        .route("/api/onboarding/applications/{id}/activate", post(activate))
        .route("/api/onboarding/tasks/{id}/accept", post(accept_task))
        .route("/api/onboarding/tasks/{id}/complete", post(complete_task))
        .route("/api/onboarding/staff/{staff_id}/tasks", get(staff_tasks))
        .route(
            "/api/onboarding/users/{user_id}/notifications",
            get(user_notifications),
        )
        .with_state(state)
}
