use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::{clinic_payload, company_payload, harness, Harness};
use crate::workflows::onboarding::domain::{OnboardingPayload, PlanType, UserId};
use crate::workflows::onboarding::progress::OnboardingStep;
use crate::workflows::onboarding::router::onboarding_router;

fn app(harness: Harness) -> Router {
    onboarding_router(Arc::new(harness.service))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_payload(payload: &OnboardingPayload) -> Request<Body> {
    post_json(
        "/api/v1/onboarding",
        serde_json::to_value(payload).expect("serializable payload"),
    )
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn onboarding_endpoint_returns_the_created_graph() {
    let app = app(harness());
    let payload = company_payload("user-1");

    let response = app.oneshot(post_payload(&payload)).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["entities"]["complexes"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["entities"]["departments"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn invalid_submissions_get_the_full_error_report() {
    let app = app(harness());
    let mut payload = clinic_payload("user-2");
    payload.clinics.clear();
    payload.plan_type = "enterprise".to_string();

    let response = app.oneshot(post_payload(&payload)).await.expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["success"], json!(false));
    let errors = body["errors"].as_array().expect("errors array");
    assert!(!errors.is_empty());
    assert!(errors
        .iter()
        .any(|error| error["field"] == json!("plan_type")));
}

#[tokio::test]
async fn progress_for_an_unknown_user_is_not_found() {
    let app = app(harness());

    let request = Request::builder()
        .uri("/api/v1/onboarding/user-3/progress")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_reflects_a_committed_onboarding() {
    let harness = harness();
    harness
        .service
        .complete_onboarding(&company_payload("user-4"))
        .expect("onboarding succeeds");
    let app = app(harness);

    let request = Request::builder()
        .uri("/api/v1/onboarding/user-4/progress")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["current_step"], json!("completed"));
    assert_eq!(body["plan_type"], json!("company"));
}

#[tokio::test]
async fn completing_a_step_advances_the_current_step() {
    let app = app(harness());

    let request = post_json(
        "/api/v1/onboarding/user-5/steps/clinic-overview/complete",
        json!({ "plan_type": "clinic" }),
    );
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["current_step"], json!("clinic-contact"));
}

#[tokio::test]
async fn unknown_step_labels_are_unprocessable() {
    let app = app(harness());

    let request = post_json(
        "/api/v1/onboarding/user-6/steps/billing-setup/complete",
        json!({ "plan_type": "clinic" }),
    );
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["error"], json!("unknown onboarding step: billing-setup"));
}

#[tokio::test]
async fn steps_outside_the_plan_conflict() {
    let app = app(harness());

    let request = post_json(
        "/api/v1/onboarding/user-7/steps/organization-overview/complete",
        json!({ "plan_type": "clinic" }),
    );
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn skipping_jumps_past_the_optional_complex_block() {
    let harness = harness();
    let user = UserId("user-8".to_string());
    for step in [
        OnboardingStep::OrganizationOverview,
        OnboardingStep::OrganizationContact,
        OnboardingStep::OrganizationLegal,
    ] {
        harness
            .service
            .mark_step_complete(&user, PlanType::Company, step)
            .expect("mark");
    }
    let app = app(harness);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/onboarding/user-8/steps/skip")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["next_step"], json!("clinic-overview"));
}

#[tokio::test]
async fn skipping_a_mandatory_step_conflicts() {
    let harness = harness();
    harness
        .service
        .mark_step_complete(
            &UserId("user-9".to_string()),
            PlanType::Clinic,
            OnboardingStep::ClinicOverview,
        )
        .expect("mark");
    let app = app(harness);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/onboarding/user-9/steps/skip")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn skipping_before_starting_is_not_found() {
    let app = app(harness());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/onboarding/user-10/steps/skip")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
