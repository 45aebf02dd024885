use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{JwtTestUtils, MockPostgrestResponses, TestConfig, TestUser};
use visit_queue_cell::queue_routes;

fn router_for(mock_server: &MockServer) -> (Router, String) {
    let config = TestConfig::with_store(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::front_desk(), &config.jwt_secret, None);
    (queue_routes(config.to_state()), token)
}

async fn send(router: &Router, token: &str, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn mock_patient_exists(mock_server: &MockServer, patient_id: i64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": patient_id }])))
        .mount(mock_server)
        .await;
}

async fn mock_not_queued(mock_server: &MockServer, patient_id: i64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

/// Serves the day's highest number once, then falls through to the next mock.
async fn mock_highest_number_once(mock_server: &MockServer, highest: Option<i32>) {
    let rows = match highest {
        Some(n) => json!([{ "queue_number": n }]),
        None => json!([]),
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue"))
        .and(query_param("select", "queue_number"))
        .and(query_param("order", "queue_number.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .up_to_n_times(1)
        .mount(mock_server)
        .await;
}

async fn mock_insert(mock_server: &MockServer, id: i64, patient_id: i64, queue_number: i32) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/queue"))
        .and(body_partial_json(json!({ "patient_id": patient_id, "queue_number": queue_number })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestResponses::queue_row(id, patient_id, queue_number, "Normal", "Waiting")
        ])))
        .expect(1)
        .mount(mock_server)
        .await;
}

async fn mock_details(mock_server: &MockServer, id: i64, patient_id: i64, queue_number: i32, priority: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::queue_details_row(id, patient_id, queue_number, priority, status)
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn active_queue_is_ordered_by_priority_then_number() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue"))
        .and(query_param("status", "neq.Completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::queue_details_row(1, 11, 1, "Normal", "Waiting"),
            MockPostgrestResponses::queue_details_row(2, 12, 2, "Normal", "With Doctor"),
            MockPostgrestResponses::queue_details_row(5, 15, 5, "Urgent", "Waiting"),
        ])))
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::OK);
    let order: Vec<i64> = body.as_array().unwrap().iter().map(|e| e["queue_number"].as_i64().unwrap()).collect();
    assert_eq!(order, vec![5, 1, 2]);
    assert_eq!(body[0]["patient_name"], "John Smith");
}

#[tokio::test]
async fn consecutive_patients_get_increasing_numbers() {
    let mock_server = MockServer::start().await;
    for patient_id in [11, 12] {
        mock_patient_exists(&mock_server, patient_id).await;
        mock_not_queued(&mock_server, patient_id).await;
    }
    mock_highest_number_once(&mock_server, None).await;
    mock_highest_number_once(&mock_server, Some(1)).await;
    mock_insert(&mock_server, 1, 11, 1).await;
    mock_insert(&mock_server, 2, 12, 2).await;
    mock_details(&mock_server, 1, 11, 1, "Normal", "Waiting").await;
    mock_details(&mock_server, 2, 12, 2, "Normal", "Waiting").await;

    let (router, token) = router_for(&mock_server);

    let (status, first) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": 11 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["message"], "Patient added to queue successfully");

    let (status, second) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": "12" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let first_number = first["queueEntry"]["queue_number"].as_i64().unwrap();
    let second_number = second["queueEntry"]["queue_number"].as_i64().unwrap();
    assert!(second_number > first_number);
}

#[tokio::test]
async fn lost_numbering_race_retries_with_next_number() {
    let mock_server = MockServer::start().await;
    mock_patient_exists(&mock_server, 11).await;
    mock_not_queued(&mock_server, 11).await;
    mock_highest_number_once(&mock_server, Some(3)).await;
    mock_highest_number_once(&mock_server, Some(4)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/queue"))
        .and(body_partial_json(json!({ "queue_number": 4 })))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockPostgrestResponses::unique_violation("queue_day_number_key"),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    mock_insert(&mock_server, 7, 11, 5).await;
    mock_details(&mock_server, 7, 11, 5, "Normal", "Waiting").await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": 11 }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["queueEntry"]["queue_number"], 5);
}

#[tokio::test]
async fn numbering_gives_up_after_configured_attempts() {
    let mock_server = MockServer::start().await;
    mock_patient_exists(&mock_server, 11).await;
    mock_not_queued(&mock_server, 11).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue"))
        .and(query_param("select", "queue_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "queue_number": 3 }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/queue"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockPostgrestResponses::unique_violation("queue_day_number_key"),
        ))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": 11 }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn patient_already_waiting_is_rejected() {
    let mock_server = MockServer::start().await;
    mock_patient_exists(&mock_server, 11).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/queue"))
        .and(query_param("patient_id", "eq.11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::queue_row(3, 11, 3, "Normal", "Waiting")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/queue"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": 11 }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient is already in queue");
}

#[tokio::test]
async fn concurrent_duplicate_is_reported_as_already_queued() {
    let mock_server = MockServer::start().await;
    mock_patient_exists(&mock_server, 11).await;
    mock_not_queued(&mock_server, 11).await;
    mock_highest_number_once(&mock_server, None).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/queue"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockPostgrestResponses::unique_violation("queue_active_patient_key"),
        ))
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": 11 }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient is already in queue");
}

#[tokio::test]
async fn unknown_patient_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::POST, "/", Some(json!({ "patient_id": 99 }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient not found");
}

#[tokio::test]
async fn patch_updates_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/queue"))
        .and(query_param("id", "eq.3"))
        .and(body_partial_json(json!({ "status": "With Doctor" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::queue_row(3, 11, 3, "Normal", "With Doctor")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mock_details(&mock_server, 3, 11, 3, "Normal", "With Doctor").await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::PATCH, "/3", Some(json!({ "status": "With Doctor" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Queue entry updated successfully");
    assert_eq!(body["queueEntry"]["status"], "With Doctor");
}

#[tokio::test]
async fn patch_without_fields_is_rejected() {
    let mock_server = MockServer::start().await;
    let (router, token) = router_for(&mock_server);

    let (status, body) = send(&router, &token, Method::PATCH, "/3", Some(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No valid fields to update");
}

#[tokio::test]
async fn missing_entry_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);

    let (status, body) = send(&router, &token, Method::PATCH, "/42", Some(json!({ "priority": "Urgent" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Queue entry not found");

    let (status, _) = send(&router, &token, Method::DELETE, "/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remove_reports_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/queue"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::queue_row(3, 11, 3, "Normal", "Waiting")
        ])))
        .mount(&mock_server)
        .await;

    let (router, token) = router_for(&mock_server);
    let (status, body) = send(&router, &token, Method::DELETE, "/3", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Patient removed from queue successfully");
}
