//! Department synthesis handlers.

use crate::api::error::ApiError;
use crate::api::reports::{parse_query, ReportQuery};
use crate::state::AppState;
use agri_core::{CommuneReport, DepartmentSynthesis};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SynthesisRequest {
    pub reports: Vec<CommuneReport>,
    #[serde(default)]
    pub enrich_cadastre: bool,
}

/// POST /v1/synthesis
pub async fn synthesize_reports(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SynthesisRequest>, JsonRejection>,
) -> Result<Json<DepartmentSynthesis>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let synthesis = state
        .departments
        .reduce(&request.reports, request.enrich_cadastre)
        .await;
    Ok(Json(synthesis))
}

/// GET /v1/departments/:code/synthesis
pub async fn department_synthesis(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<DepartmentSynthesis>, ApiError> {
    let query = parse_query(query)?;
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::BadRequest(format!("invalid department code '{code}'")));
    }
    let filters = query.filters()?;
    let synthesis = state
        .departments
        .build(&code, &filters, query.enrich_cadastre.unwrap_or(true))
        .await?;
    Ok(Json(synthesis))
}
