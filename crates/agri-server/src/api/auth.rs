//! Admin guard for maintenance endpoints.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Configured admin token; `None` disables admin endpoints.
#[derive(Clone)]
pub struct AdminToken(pub Arc<Option<String>>);

/// Requires `Authorization: Bearer <admin_token>`.
pub async fn require_admin(
    State(admin_token): State<AdminToken>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = admin_token.0.as_deref() else {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Admin endpoints are disabled",
                "hint": "Set AGRI_ADMIN_TOKEN to enable them"
            })),
        )
            .into_response();
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match auth_header {
        Some(auth) if auth.starts_with("Bearer ") => {
            if auth.trim_start_matches("Bearer ") == expected {
                next.run(request).await
            } else {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": "Invalid admin token" })),
                )
                    .into_response()
            }
        }
        Some(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid Authorization header format",
                "expected": "Bearer <token>"
            })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Authorization required",
                "hint": "Add header: Authorization: Bearer <admin_token>"
            })),
        )
            .into_response(),
    }
}
