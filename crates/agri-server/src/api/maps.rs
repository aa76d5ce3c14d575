use crate::api::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// POST /v1/maps/purge (admin)
pub async fn purge_maps(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let removed = state
        .maps
        .purge()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(json!({ "removed": removed })))
}
