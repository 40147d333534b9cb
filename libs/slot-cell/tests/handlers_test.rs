use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use slot_cell::router::slot_routes;

fn bearer(user: &TestUser, config: &TestConfig) -> String {
    format!(
        "Bearer {}",
        JwtTestUtils::create_test_token(user, &config.jwt_secret, None)
    )
}

#[tokio::test]
async fn listing_requires_authentication() {
    let config = TestConfig::default();
    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let config = TestConfig::default();
    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(
                    "Authorization",
                    format!("Bearer {}", JwtTestUtils::create_malformed_token()),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patients_cannot_generate_slots() {
    let config = TestConfig::default();
    let patient = TestUser::patient("patient@example.com");
    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/generate/{}", Uuid::new_v4()))
                .header("Authorization", bearer(&patient, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patients_cannot_toggle_availability() {
    let config = TestConfig::default();
    let patient = TestUser::patient("patient@example.com");
    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!(
                    "/{}/{}/availability",
                    Uuid::new_v4(),
                    Uuid::new_v4()
                ))
                .header("Authorization", bearer(&patient, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patients_cannot_run_maintenance() {
    let config = TestConfig::default();
    let patient = TestUser::patient("patient@example.com");
    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/maintenance/run")
                .header("Authorization", bearer(&patient, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_for_another_user_requires_admin() {
    let config = TestConfig::default();
    let patient = TestUser::patient("patient@example.com");
    let app = slot_routes(config.to_arc());

    // Request body names a different user than the caller
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/book")
                .header("Authorization", bearer(&patient, &config))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "user_id": Uuid::new_v4(),
                        "patient_id": Uuid::new_v4(),
                        "doctor_id": Uuid::new_v4(),
                        "slot_day_id": Uuid::new_v4(),
                        "slot_id": Uuid::new_v4(),
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_run_maintenance() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "doctor_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/activity_logs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .mount(&mock_server)
        .await;

    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/maintenance/run")
                .header("Authorization", bearer(&admin, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["maintenance"]["doctors_processed"], 0);
    assert_eq!(json["maintenance"]["days_purged"], 0);
}

#[tokio::test]
async fn listing_returns_days_and_stats_for_authenticated_user() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());
    let patient = TestUser::patient("patient@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = slot_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("Authorization", bearer(&patient, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["slot_days"], json!([]));
    assert_eq!(json["stats"]["total"], 0);
}
