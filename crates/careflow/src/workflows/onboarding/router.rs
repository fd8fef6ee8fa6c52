use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{OnboardingPayload, PlanType, UserId};
use super::progress::{OnboardingStep, ProgressError, StepProgressRepository};
use super::repository::{AuditSink, FacilityDirectory};
use super::service::{OnboardingError, OnboardingService};

/// Router builder exposing the onboarding orchestration endpoints.
pub fn onboarding_router<D, P, A>(service: Arc<OnboardingService<D, P, A>>) -> Router
where
    D: FacilityDirectory + 'static,
    P: StepProgressRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/onboarding", post(complete_handler::<D, P, A>))
        .route(
            "/api/v1/onboarding/:user_id/progress",
            get(progress_handler::<D, P, A>),
        )
        .route(
            "/api/v1/onboarding/:user_id/steps/:step/complete",
            post(step_complete_handler::<D, P, A>),
        )
        .route(
            "/api/v1/onboarding/:user_id/steps/skip",
            post(skip_handler::<D, P, A>),
        )
        .with_state(service)
}

pub(crate) async fn complete_handler<D, P, A>(
    State(service): State<Arc<OnboardingService<D, P, A>>>,
    axum::Json(payload): axum::Json<OnboardingPayload>,
) -> Response
where
    D: FacilityDirectory + 'static,
    P: StepProgressRepository + 'static,
    A: AuditSink + 'static,
{
    match service.complete_onboarding(&payload) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(OnboardingError::Validation(report)) => {
            let body = json!({
                "success": false,
                "errors": report.issues,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response()
        }
        Err(err) => {
            tracing::error!(user = %payload.user_id, error = %err, "onboarding aborted");
            let body = json!({ "error": "onboarding failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
    }
}

pub(crate) async fn progress_handler<D, P, A>(
    State(service): State<Arc<OnboardingService<D, P, A>>>,
    Path(user_id): Path<String>,
) -> Response
where
    D: FacilityDirectory + 'static,
    P: StepProgressRepository + 'static,
    A: AuditSink + 'static,
{
    let user_id = UserId(user_id);
    match service.progress(&user_id) {
        Ok(Some(progress)) => (StatusCode::OK, axum::Json(progress.view())).into_response(),
        Ok(None) => {
            let body = json!({ "error": format!("onboarding has not started for user {user_id}") });
            (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
        }
        Err(err) => internal_progress_error(&user_id, err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepCompleteRequest {
    pub(crate) plan_type: String,
}

pub(crate) async fn step_complete_handler<D, P, A>(
    State(service): State<Arc<OnboardingService<D, P, A>>>,
    Path((user_id, step)): Path<(String, String)>,
    axum::Json(request): axum::Json<StepCompleteRequest>,
) -> Response
where
    D: FacilityDirectory + 'static,
    P: StepProgressRepository + 'static,
    A: AuditSink + 'static,
{
    let user_id = UserId(user_id);

    let plan = match PlanType::from_str(&request.plan_type) {
        Ok(plan) => plan,
        Err(err) => {
            let body = json!({ "error": err.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
        }
    };
    let step = match OnboardingStep::from_str(&step) {
        Ok(step) => step,
        Err(err) => {
            let body = json!({ "error": err.to_string() });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
        }
    };

    match service.mark_step_complete(&user_id, plan, step) {
        Ok(progress) => (StatusCode::OK, axum::Json(progress.view())).into_response(),
        Err(err @ (ProgressError::AlreadyCompleted(_) | ProgressError::StepNotInPlan { .. })) => {
            let body = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(body)).into_response()
        }
        Err(err) => internal_progress_error(&user_id, err),
    }
}

pub(crate) async fn skip_handler<D, P, A>(
    State(service): State<Arc<OnboardingService<D, P, A>>>,
    Path(user_id): Path<String>,
) -> Response
where
    D: FacilityDirectory + 'static,
    P: StepProgressRepository + 'static,
    A: AuditSink + 'static,
{
    let user_id = UserId(user_id);
    match service.skip_current_step(&user_id) {
        Ok(progress) => {
            let body = json!({
                "next_step": progress.current_step(),
                "progress": progress.view(),
            });
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(err @ ProgressError::NotStarted(_)) => {
            let body = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
        }
        Err(err @ (ProgressError::SkipNotAllowed(_) | ProgressError::AlreadyCompleted(_))) => {
            let body = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(body)).into_response()
        }
        Err(err) => internal_progress_error(&user_id, err),
    }
}

fn internal_progress_error(user_id: &UserId, err: ProgressError) -> Response {
    tracing::error!(user = %user_id, error = %err, "progress operation failed");
    let body = json!({ "error": "progress operation failed" });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}
