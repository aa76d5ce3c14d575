//! Error type returned by every handler.

use crate::commune::ReportError;
use crate::http::FetchError;
use agri_core::{CoreError, GeocodeFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Geocode(GeocodeFailure),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Geocode(GeocodeFailure::EmptyAddress) => {
                ApiError::BadRequest(GeocodeFailure::EmptyAddress.to_string())
            }
            ReportError::Geocode(failure) => ApiError::Geocode(failure),
            ReportError::Location(err) => ApiError::from(err),
            ReportError::CommuneNotFound(name) => {
                ApiError::NotFound(format!("commune '{name}' not found"))
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else {
            ApiError::Upstream(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Geocode(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = match &self {
            ApiError::Geocode(failure) => json!({ "error": self.to_string(), "geocode": failure }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
