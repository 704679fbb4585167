//! Common test utilities for integration tests.
//!
//! Integration tests run the full router against the in-memory store, so
//! every request exercises the same handlers, middleware, and store
//! primitives production uses, without an external database.

// Allow dead code in this module - these are helper utilities that may not be
// used by all integration tests but are intentionally available.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use band_manager_api::app::create_app;
use band_manager_api::config::{
    Config, DatabaseConfig, JobsConfig, LoggingConfig, SecurityConfig, ServerConfig, StoreBackend,
};
use persistence::MemoryStore;

/// Test configuration: memory backend, auth disabled.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Use random port
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            api_keys: vec![],
            admin_api_keys: vec![],
        },
        jobs: JobsConfig {
            pool_audit_enabled: false, // Jobs are driven explicitly in tests
            pool_audit_interval_secs: 300,
        },
    }
}

/// Create a test application backed by a fresh in-memory store.
///
/// Returns the router together with the store so tests can inspect or
/// corrupt state directly.
pub fn create_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = create_app(test_config(), store.clone());
    (app, store)
}

/// Create a test application with API keys configured.
pub fn create_test_app_with_keys(api_keys: Vec<String>, admin_api_keys: Vec<String>) -> Router {
    let mut config = test_config();
    config.security.api_keys = api_keys;
    config.security.admin_api_keys = admin_api_keys;
    create_app(config, Arc::new(MemoryStore::new()))
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a JSON request with an API key header.
pub fn json_request_with_api_key(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    api_key: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", api_key)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a GET request with an API key header.
pub fn get_request_with_api_key(uri: &str, api_key: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("X-API-Key", api_key)
        .body(Body::empty())
        .unwrap()
}

/// Build a DELETE request.
pub fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Register a band via the API and return its representation.
pub async fn register_band(app: &Router, serial: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/bands",
            serde_json::json!({ "serial": serial }),
        ))
        .await
        .unwrap();
    assert_eq!(
        response.status(),
        axum::http::StatusCode::CREATED,
        "failed to register band {serial}"
    );
    parse_response_body(response).await
}

/// Create a pilgrim via the API and return their id.
pub async fn create_pilgrim(app: &Router, full_name: &str) -> Uuid {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/pilgrims",
            serde_json::json!({ "fullName": full_name }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let body = parse_response_body(response).await;
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

/// Create a group via the API and return its id.
pub async fn create_group(app: &Router, name: &str, enforce_pool: bool) -> Uuid {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/groups",
            serde_json::json!({ "name": name, "enforcePool": enforce_pool }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let body = parse_response_body(response).await;
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

/// Stage a band into a group's pool via the API.
pub async fn stage_band(app: &Router, group_id: Uuid, serial: &str) {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/groups/{group_id}/pool"),
            serde_json::json!({ "serial": serial }),
        ))
        .await
        .unwrap();
    assert_eq!(
        response.status(),
        axum::http::StatusCode::OK,
        "failed to stage band {serial}"
    );
}

/// Issue an assignment command and return the raw response.
pub async fn assign_band(
    app: &Router,
    serial: &str,
    pilgrim_id: Uuid,
    group_id: Uuid,
) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/assignments",
            serde_json::json!({
                "serial": serial,
                "pilgrimId": pilgrim_id,
                "groupId": group_id
            }),
        ))
        .await
        .unwrap()
}

/// Issue a release command and return the raw response.
pub async fn release_band(
    app: &Router,
    pilgrim_id: Uuid,
    group_id: Uuid,
) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/assignments/release",
            serde_json::json!({
                "pilgrimId": pilgrim_id,
                "groupId": group_id
            }),
        ))
        .await
        .unwrap()
}

/// Serials currently available in a group's pool, in listing order.
pub async fn available_serials(app: &Router, group_id: Uuid) -> Vec<String> {
    let response = app
        .clone()
        .oneshot(get_request(&format!(
            "/api/v1/groups/{group_id}/available-bands"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = parse_response_body(response).await;
    body["bands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|band| band["serial"].as_str().unwrap().to_string())
        .collect()
}

/// Fetch a band's detail representation via the API.
pub async fn get_band(app: &Router, serial: &str) -> axum::response::Response {
    app.clone()
        .oneshot(get_request(&format!("/api/v1/bands/{serial}")))
        .await
        .unwrap()
}
