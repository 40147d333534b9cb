use chrono::{Datelike, Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{MockStoreResponses, TestConfig};
use slot_cell::models::SlotScheduleConfig;
use slot_cell::services::SlotMaintenanceService;

/// Schedule whose excluded weekday can never collide with the extension
/// target, so generation outcomes stay deterministic across run dates.
fn open_schedule() -> SlotScheduleConfig {
    let schedule = SlotScheduleConfig::default();
    let target = Utc::now().date_naive() + Duration::days(schedule.horizon_days);

    SlotScheduleConfig {
        excluded_weekday: target.weekday().succ(),
        ..schedule
    }
}

fn service_for(mock_server: &MockServer, schedule: SlotScheduleConfig) -> SlotMaintenanceService {
    let config = TestConfig::with_base_url(&mock_server.uri()).to_app_config();
    SlotMaintenanceService::with_schedule(&config, schedule)
}

fn template_slot_rows(day_id: &str) -> serde_json::Value {
    let labels = [
        "09:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "01:00 PM",
        "02:00 PM", "03:00 PM", "04:00 PM", "05:00 PM",
    ];
    json!(labels
        .iter()
        .enumerate()
        .map(|(i, label)| MockStoreResponses::slot_response(
            &Uuid::new_v4().to_string(),
            day_id,
            i as i32,
            label,
            false,
            true,
        ))
        .collect::<Vec<_>>())
}

async fn mount_activity_log(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/activity_logs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn maintenance_extends_horizon_and_purges_expired_days() {
    let mock_server = MockServer::start().await;
    mount_activity_log(&mock_server).await;

    let schedule = open_schedule();
    let today = Utc::now().date_naive();
    let target = today + Duration::days(schedule.horizon_days);

    let doctor_id = Uuid::new_v4();
    let new_day_id = Uuid::new_v4().to_string();
    let expired_a = Uuid::new_v4().to_string();
    let expired_b = Uuid::new_v4().to_string();

    // Doctor scan
    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "doctor_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_id.to_string() }
        ])))
        .mount(&mock_server)
        .await;

    // The target date is not yet covered
    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("date", format!("eq.{}", target)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slot_days"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::slot_day_response(
                &new_day_id,
                &doctor_id.to_string(),
                &target.to_string(),
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(template_slot_rows(&new_day_id)))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Retention: two expired days, child slots deleted first
    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "id"))
        .and(query_param("date", format!("lt.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": expired_a },
            { "id": expired_b },
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/slots"))
        .and(query_param(
            "slot_day_id",
            format!("in.({},{})", expired_a, expired_b),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("date", format!("lt.{}", today)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server, schedule);
    let summary = service.run("test-token").await.expect("maintenance should succeed");

    assert_eq!(summary.doctors_processed, 1);
    assert_eq!(summary.days_generated, 1);
    assert_eq!(summary.days_skipped, 0);
    assert_eq!(summary.doctors_failed, 0);
    assert_eq!(summary.days_purged, 2);
}

#[tokio::test]
async fn maintenance_never_seeds_doctors_without_slot_days() {
    let mock_server = MockServer::start().await;
    mount_activity_log(&mock_server).await;

    let today = Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "doctor_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "id"))
        .and(query_param("date", format!("lt.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // No POST/DELETE mocks: with nothing to do, maintenance must not write
    let service = service_for(&mock_server, open_schedule());
    let summary = service.run("test-token").await.expect("no-op run succeeds");

    assert_eq!(summary.doctors_processed, 0);
    assert_eq!(summary.days_generated, 0);
    assert_eq!(summary.days_purged, 0);
}

#[tokio::test]
async fn extension_failure_for_one_doctor_does_not_stop_the_rest() {
    let mock_server = MockServer::start().await;
    mount_activity_log(&mock_server).await;

    let schedule = open_schedule();
    let today = Utc::now().date_naive();
    let target = today + Duration::days(schedule.horizon_days);

    let doctor_ok = Uuid::new_v4();
    let doctor_bad = Uuid::new_v4();
    let new_day_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "doctor_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_ok.to_string() },
            { "doctor_id": doctor_bad.to_string() },
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("date", format!("eq.{}", target)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // One doctor's insert fails outright; the other's goes through
    Mock::given(method("POST"))
        .and(path("/rest/v1/slot_days"))
        .and(body_partial_json(json!({ "doctor_id": doctor_bad.to_string() })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "internal error"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slot_days"))
        .and(body_partial_json(json!({ "doctor_id": doctor_ok.to_string() })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::slot_day_response(
                &new_day_id,
                &doctor_ok.to_string(),
                &target.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(template_slot_rows(&new_day_id)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "id"))
        .and(query_param("date", format!("lt.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server, schedule);
    let summary = service.run("test-token").await.expect("run survives one failure");

    assert_eq!(summary.doctors_processed, 2);
    assert_eq!(summary.days_generated, 1);
    assert_eq!(summary.doctors_failed, 1);
}

#[tokio::test]
async fn already_covered_target_counts_as_skip() {
    let mock_server = MockServer::start().await;
    mount_activity_log(&mock_server).await;

    let schedule = open_schedule();
    let today = Utc::now().date_naive();
    let target = today + Duration::days(schedule.horizon_days);

    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "doctor_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "doctor_id": doctor_id.to_string() }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("date", format!("eq.{}", target)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::slot_day_response(
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                &target.to_string(),
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_days"))
        .and(query_param("select", "id"))
        .and(query_param("date", format!("lt.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server, schedule);
    let summary = service.run("test-token").await.expect("run succeeds");

    assert_eq!(summary.days_generated, 0);
    assert_eq!(summary.days_skipped, 1);
}
