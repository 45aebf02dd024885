use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::create_patient_router;
use patient_cell::services::PatientService;
use shared_utils::test_utils::{JwtTestUtils, MockPostgrestResponses, TestConfig, TestUser};

fn setup(mock_server: &MockServer) -> (Router, String) {
    let config = TestConfig::with_store(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::front_desk(), &config.jwt_secret, None);
    (create_patient_router(config.to_state()), token)
}

async fn call(router: &Router, token: &str, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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

#[tokio::test]
async fn lists_patients_by_name() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::patient_row(2, "John Smith"),
            MockPostgrestResponses::patient_row(1, "Maria Garcia"),
        ])))
        .mount(&mock_server)
        .await;

    let (router, token) = setup(&mock_server);
    let (status, body) = call(&router, &token, Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["gender"], "Male");
}

#[tokio::test]
async fn creates_patient() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({ "name": "John Smith", "email": "john.smith@email.com", "age": 45 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestResponses::patient_row(5, "John Smith")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (router, token) = setup(&mock_server);
    let (status, body) = call(&router, &token, Method::POST, "/", Some(json!({
        "name": "John Smith",
        "phone": "555-010-1010",
        "email": "John.Smith@email.com",
        "age": "45",
        "gender": "Male"
    }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Patient created successfully");
    assert_eq!(body["patient"]["id"], 5);
}

#[tokio::test]
async fn create_reports_invalid_fields() {
    let mock_server = MockServer::start().await;
    let (router, token) = setup(&mock_server);

    let (status, body) = call(&router, &token, Method::POST, "/", Some(json!({
        "name": "J",
        "phone": "123",
        "email": "not-an-email"
    }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"].as_array().unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "phone", "email"]);
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (router, token) = setup(&mock_server);

    let (status, body) = call(&router, &token, Method::GET, "/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Patient not found");

    let (status, _) = call(&router, &token, Method::PUT, "/404", Some(json!({
        "name": "John Smith",
        "phone": "555-010-1010"
    }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_failure_is_a_generic_server_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let (router, token) = setup(&mock_server);
    let (status, body) = call(&router, &token, Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn update_rewrites_contact_fields() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.5"))
        .and(body_partial_json(json!({ "name": "John Smith", "phone": "555-010-3030", "email": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestResponses::patient_row(5, "John Smith")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (router, token) = setup(&mock_server);
    let (status, body) = call(&router, &token, Method::PUT, "/5", Some(json!({
        "name": "John Smith",
        "phone": "555-010-3030",
        "email": ""
    }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Patient updated successfully");
    assert_eq!(body["patient"]["id"], 5);
}

#[tokio::test]
async fn demo_patients_fill_an_empty_table() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({ "gender": "Female" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestResponses::patient_row(2, "Maria Garcia")
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({ "gender": "Male" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestResponses::patient_row(1, "John Smith")
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&TestConfig::with_store(&mock_server.uri()).to_state());

    assert_eq!(service.seed_demo_patients().await.unwrap(), 4);
}

#[tokio::test]
async fn demo_patients_skip_populated_table() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&TestConfig::with_store(&mock_server.uri()).to_state());

    assert_eq!(service.seed_demo_patients().await.unwrap(), 0);
}
