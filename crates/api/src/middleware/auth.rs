//! Authentication middleware.
//!
//! Routes are gated by static API keys from configuration, compared by
//! SHA-256 digest. Admin keys also pass the moderator gate. An empty key
//! configuration disables the check entirely (development mode); identity
//! and session management live outside this service.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;

fn presented_key(req: &Request<Body>) -> Option<&str> {
    req.headers().get("X-API-Key").and_then(|v| v.to_str().ok())
}

fn matches_any(presented: &str, configured: &[String]) -> bool {
    configured
        .iter()
        .any(|key| shared::crypto::key_matches(presented, key))
}

/// Middleware that requires a moderator or admin API key.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let security = &state.config.security;
    if security.auth_disabled() {
        return next.run(req).await;
    }

    match presented_key(&req) {
        Some(key)
            if matches_any(key, &security.api_keys)
                || matches_any(key, &security.admin_api_keys) =>
        {
            next.run(req).await
        }
        _ => unauthorized_response("Invalid or missing API key"),
    }
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let security = &state.config.security;
    if security.auth_disabled() {
        return next.run(req).await;
    }

    match presented_key(&req) {
        Some(key) if matches_any(key, &security.admin_api_keys) => next.run(req).await,
        Some(key) if matches_any(key, &security.api_keys) => {
            forbidden_response("Admin access required")
        }
        _ => unauthorized_response("Invalid or missing API key"),
    }
}

/// Helper to create unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Helper to create forbidden response.
fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized_response("Invalid or missing API key");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_response() {
        let response = forbidden_response("Admin access required");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_matches_any() {
        let keys = vec!["bm_mod_key_1234".to_string(), "bm_mod_key_5678".to_string()];
        assert!(matches_any("bm_mod_key_5678", &keys));
        assert!(!matches_any("bm_other_key", &keys));
        assert!(!matches_any("bm_mod_key_1234", &[]));
    }
}
