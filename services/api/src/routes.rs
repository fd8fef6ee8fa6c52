use crate::infra::{ApiOnboardingService, AppState};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use careflow::workflows::onboarding::plan::PlanRules;
use careflow::workflows::onboarding::{onboarding_router, PlanType};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

pub(crate) fn with_onboarding_routes(service: Arc<ApiOnboardingService>) -> axum::Router {
    onboarding_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/plans/:plan_type", axum::routing::get(plan_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Expose the static plan tables so clients can render limits and step
/// sequences without hardcoding them.
pub(crate) async fn plan_endpoint(Path(plan_type): Path<String>) -> Response {
    let plan = match PlanType::from_str(&plan_type) {
        Ok(plan) => plan,
        Err(err) => {
            let body = Json(json!({ "error": err.to_string() }));
            return (StatusCode::NOT_FOUND, body).into_response();
        }
    };

    let rules = PlanRules::for_plan(plan);
    let limits: Vec<serde_json::Value> = rules
        .limits
        .iter()
        .map(|(kind, limit)| json!({ "kind": kind, "limit": limit }))
        .collect();
    let steps: Vec<serde_json::Value> = rules
        .steps
        .iter()
        .map(|rule| json!({ "step": rule.step, "skip_to": rule.skip_to }))
        .collect();

    let body = Json(json!({
        "plan": rules.plan,
        "required": rules.required,
        "limits": limits,
        "departments_required_with_complexes": rules.departments_required_with_complexes,
        "creation_order": rules.creation_order,
        "steps": steps,
    }));
    (StatusCode::OK, body).into_response()
}
