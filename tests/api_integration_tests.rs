use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use tenant_api::api::handlers::{AppState, AppStateInner};
use tenant_api::api::routes::create_router;
use tenant_api::auth::ADMIN_ROLE;
use tenant_api::config::{
    AppConfig, AuthConfig, Config, Environment, RateLimitConfig, ServerConfig,
};
use tenant_api::errors::classifier::FailureLogEntry;
use tenant_api::errors::{Classifier, FailureLogger};

fn test_config(environment: Environment, requests_per_second: u32, burst: u32) -> Config {
    Config {
        app: AppConfig {
            environment,
            api_version: "1.0".to_string(),
            max_logged_body_bytes: 64 * 1024,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            instance_id: "test-instance".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: "integration-secret".to_string(),
            jwt_issuer: "tenant-api".to_string(),
        },
        rate_limit: RateLimitConfig {
            requests_per_second,
            burst,
        },
    }
}

// Helper to create test app
fn create_test_app(environment: Environment) -> (Router, AppState) {
    let state = Arc::new(AppStateInner::from_config(&test_config(
        environment,
        1000,
        1000,
    )));
    (create_router(state.clone()), state)
}

/// Keeps the body of every logged failure
#[derive(Default)]
struct RecordingLogger {
    bodies: Mutex<Vec<Option<Value>>>,
}

impl FailureLogger for RecordingLogger {
    fn log(&self, entry: &FailureLogEntry<'_>) {
        self.bodies.lock().unwrap().push(entry.body.cloned());
    }
}

// Helper to create test app whose failure log entries are recorded
fn create_recording_app(config: Config) -> (Router, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let mut state = AppStateInner::from_config(&config);
    state.classifier = Classifier::new(config.app.environment.clone()).with_logger(logger.clone());
    (create_router(Arc::new(state)), logger)
}

// Helper to send request and parse JSON response
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!({}));

    (status, headers, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    let bytes = serde_json::to_vec(&body).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("content-length", bytes.len())
        .body(Body::from(bytes))
        .unwrap()
}

fn with_bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn create_org(app: &Router, name: &str) -> Value {
    let (status, _, body) = send(
        app,
        post_json(
            "/api/organizations",
            json!({ "name": name, "email": "ops@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

fn assert_failure_shape(body: &Value) {
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
    assert!(body["error_code"].is_string());
    assert!(body["request_id"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app(Environment::local());
    let (status, headers, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["instance_id"], "test-instance");
    assert_eq!(body["meta"]["api_version"], "1.0");
    assert!(body.get("error_code").is_none());
    assert!(body.get("debug").is_none());

    let request_id = body["request_id"].as_str().unwrap();
    assert!(request_id.starts_with("req_"));
    assert_eq!(headers["x-request-id"], request_id);
}

#[tokio::test]
async fn test_inbound_request_id_is_echoed() {
    let (app, _) = create_test_app(Environment::local());
    let request = Request::builder()
        .uri("/health/live")
        .header("x-request-id", "req_from_client")
        .body(Body::empty())
        .unwrap();
    let (_, headers, body) = send(&app, request).await;

    assert_eq!(body["request_id"], "req_from_client");
    assert_eq!(headers["x-request-id"], "req_from_client");
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _) = create_test_app(Environment::local());
    let (status, _, body) = send(&app, get("/api/nothing-here")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_failure_shape(&body);
    assert_eq!(body["error_code"], "RESOURCE_NOT_FOUND");
    assert_eq!(body["message"], "Endpoint not found");
    assert_eq!(body["errors"]["identifier"], "/api/nothing-here");
    assert!(body["debug"]["trace_id"].as_str().unwrap().starts_with("trace_"));
}

#[tokio::test]
async fn test_production_hides_debug() {
    let (app, _) = create_test_app(Environment::production());
    let (status, _, body) = send(&app, get("/api/nothing-here")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("debug").is_none());
    assert_eq!(body["meta"]["environment"], "production");

    let (_, _, body) = send(&app, get("/health")).await;
    assert!(body.get("debug").is_none());
}

#[tokio::test]
async fn test_create_validation_errors_verbatim() {
    let (app, _) = create_test_app(Environment::local());
    let (status, _, body) = send(
        &app,
        post_json(
            "/api/organizations",
            json!({ "name": "Acme", "password": "hunter2" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_failure_shape(&body);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "The given data was invalid.");
    assert_eq!(
        body["errors"],
        json!({ "email": ["The email field is required."] })
    );
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let (app, _) = create_test_app(Environment::local());
    let request = Request::builder()
        .method("POST")
        .uri("/api/organizations")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["errors"]["body"].is_array());
}

#[tokio::test]
async fn test_create_then_fetch() {
    let (app, _) = create_test_app(Environment::local());
    let created = create_org(&app, "Acme").await;
    let id = created["id"].as_str().unwrap();

    let (status, _, body) = send(&app, get(&format!("/api/organizations/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme");
    assert_eq!(body["data"]["plan"], "free");
}

#[tokio::test]
async fn test_missing_organization() {
    let (app, _) = create_test_app(Environment::local());
    let id = "6f1c1f04-8d0e-4d47-9a55-1b1f3f0c7a10";
    let (status, _, body) = send(&app, get(&format!("/api/organizations/{id}"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "RESOURCE_NOT_FOUND");
    assert_eq!(
        body["message"],
        format!("Organization with identifier '{id}' not found")
    );
}

#[tokio::test]
async fn test_bad_uuid_is_validation_error() {
    let (app, _) = create_test_app(Environment::local());
    let (status, _, body) = send(&app, get("/api/organizations/abc-123")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["errors"]["path"].is_array());
}

#[tokio::test]
async fn test_duplicate_name_conflict() {
    let (app, _) = create_test_app(Environment::local());
    create_org(&app, "Acme").await;
    let (status, _, body) = send(
        &app,
        post_json(
            "/api/organizations",
            json!({ "name": "acme", "email": "other@example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "RESOURCE_CONFLICT");
    assert_eq!(body["message"], "An organization named 'acme' already exists");
}

#[tokio::test]
async fn test_list_is_paginated() {
    let (app, _) = create_test_app(Environment::local());
    for name in ["One", "Two", "Three"] {
        create_org(&app, name).await;
    }

    let (status, _, body) = send(&app, get("/api/organizations?page=1&per_page=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["name"], "One");
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["last_page"], 2);
    assert_eq!(body["pagination"]["from"], 1);
    assert_eq!(body["pagination"]["to"], 2);
    assert_eq!(body["pagination"]["has_more_pages"], true);
    assert_eq!(
        body["pagination"]["links"]["next"],
        "/api/organizations?page=2"
    );
}

#[tokio::test]
async fn test_bad_query_is_validation_error() {
    let (app, _) = create_test_app(Environment::local());
    let (status, _, body) = send(&app, get("/api/organizations?page=first")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["query"].is_array());
}

#[tokio::test]
async fn test_me_token_failures() {
    let (app, state) = create_test_app(Environment::local());

    let (status, _, body) = send(&app, get("/api/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    let expired = state
        .tokens
        .issue("user-1", vec![], Duration::minutes(-10))
        .unwrap();
    let (status, _, body) = send(&app, with_bearer("GET", "/api/me", &expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "TOKEN_EXPIRED");

    let (status, _, body) = send(&app, with_bearer("GET", "/api/me", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_me_with_valid_token() {
    let (app, state) = create_test_app(Environment::local());
    let token = state
        .tokens
        .issue("user-1", vec!["member".to_string()], Duration::minutes(10))
        .unwrap();

    let (status, _, body) = send(&app, with_bearer("GET", "/api/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "user-1");
    assert_eq!(body["data"]["roles"], json!(["member"]));
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let (app, state) = create_test_app(Environment::local());
    let created = create_org(&app, "Acme").await;
    let uri = format!("/api/organizations/{}", created["id"].as_str().unwrap());

    let anonymous = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    let member = state
        .tokens
        .issue("user-1", vec!["member".to_string()], Duration::minutes(10))
        .unwrap();
    let (status, _, body) = send(&app, with_bearer("DELETE", &uri, &member)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "FORBIDDEN");

    let admin = state
        .tokens
        .issue("user-2", vec![ADMIN_ROLE.to_string()], Duration::minutes(10))
        .unwrap();
    let (status, _, body) = send(&app, with_bearer("DELETE", &uri, &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _, _) = send(&app, with_bearer("DELETE", &uri, &admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let state = Arc::new(AppStateInner::from_config(&test_config(
        Environment::local(),
        1,
        1,
    )));
    let app = create_router(state);

    let (status, _, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error_code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["meta"]["retry_after"], 1);
    assert_eq!(headers[header::RETRY_AFTER], "1");
}

#[tokio::test]
async fn test_method_not_allowed_is_enveloped() {
    let (app, _) = create_test_app(Environment::local());
    let request = Request::builder()
        .method("PATCH")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_failure_shape(&body);
    assert_eq!(body["message"], "Method Not Allowed");
}

#[tokio::test]
async fn test_huge_page_number_is_empty_page() {
    let (app, _) = create_test_app(Environment::local());
    create_org(&app, "Acme").await;

    let huge_page = get("/api/organizations?page=18446744073709551615");
    let (status, _, body) = send(&app, huge_page).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["current_page"], u64::MAX);
    assert_eq!(body["pagination"]["total"], 1);
    assert!(body["pagination"]["from"].is_null());
    assert_eq!(body["pagination"]["has_more_pages"], false);
}

#[tokio::test]
async fn test_failure_log_carries_sanitized_body() {
    let (app, logger) = create_recording_app(test_config(Environment::local(), 1000, 1000));
    let (status, _, _) = send(
        &app,
        post_json(
            "/api/organizations",
            json!({ "name": "Acme", "password": "hunter2", "owner": { "api_key": "k" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let bodies = logger.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let body = bodies[0].as_ref().expect("body captured outside production");
    assert_eq!(body["name"], "Acme");
    assert_eq!(body["password"], "[REDACTED]");
    assert_eq!(body["owner"]["api_key"], "[REDACTED]");
}

#[tokio::test]
async fn test_production_failure_log_has_no_body() {
    let (app, logger) = create_recording_app(test_config(Environment::production(), 1000, 1000));
    let (status, _, _) = send(
        &app,
        post_json(
            "/api/organizations",
            json!({ "name": "Acme", "password": "hunter2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let bodies = logger.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].is_none());
}

#[tokio::test]
async fn test_body_larger_than_declared_is_rejected() {
    let mut config = test_config(Environment::local(), 1000, 1000);
    config.app.max_logged_body_bytes = 16;
    let (app, logger) = create_recording_app(config);

    let payload = json!({ "name": "A long enough organization name", "email": "ops@example.com" });
    let request = Request::builder()
        .method("POST")
        .uri("/api/organizations")
        .header("content-type", "application/json")
        .header("content-length", "8")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure_shape(&body);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Bad Request");
    assert_eq!(logger.bodies.lock().unwrap().len(), 1);
}
