//! Report and risk handlers.

use crate::api::error::ApiError;
use crate::commune::ReportTarget;
use crate::map::report_overlays;
use crate::state::AppState;
use agri_core::{CommuneReport, Location, NetworkKind, ReportFilters, RiskBundle};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query string shared by every report endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub address: Option<String>,
    pub commune: Option<String>,

    pub min_area_ha: Option<f64>,
    pub max_area_ha: Option<f64>,
    pub culture: Option<String>,
    pub max_bt_distance_m: Option<f64>,
    pub max_hta_distance_m: Option<f64>,
    /// Comma list, e.g. `BT,HTA`.
    pub networks: Option<String>,
    pub min_parking_area_m2: Option<f64>,
    pub min_derelict_area_m2: Option<f64>,
    /// Comma list of zoning types.
    pub zone_types: Option<String>,
    pub include_livestock: Option<bool>,
    pub render_map: Option<bool>,
    pub enrich_cadastre: Option<bool>,
}

fn comma_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

impl ReportQuery {
    pub fn filters(&self) -> Result<ReportFilters, ApiError> {
        let networks = comma_list(self.networks.as_deref())
            .map(str::parse::<NetworkKind>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::BadRequest)?;
        for (name, value) in [
            ("min_area_ha", self.min_area_ha),
            ("max_area_ha", self.max_area_ha),
            ("max_bt_distance_m", self.max_bt_distance_m),
            ("max_hta_distance_m", self.max_hta_distance_m),
            ("min_parking_area_m2", self.min_parking_area_m2),
            ("min_derelict_area_m2", self.min_derelict_area_m2),
        ] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(ApiError::BadRequest(format!("{name} must be a non-negative number")));
            }
        }

        Ok(ReportFilters {
            min_area_ha: self.min_area_ha,
            max_area_ha: self.max_area_ha,
            culture: self
                .culture
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            max_bt_distance_m: self.max_bt_distance_m,
            max_hta_distance_m: self.max_hta_distance_m,
            networks,
            min_parking_area_m2: self.min_parking_area_m2,
            min_derelict_area_m2: self.min_derelict_area_m2,
            zone_types: comma_list(self.zone_types.as_deref()).map(str::to_string).collect(),
            include_livestock: self.include_livestock.unwrap_or(true),
        })
    }

    fn point(&self) -> Result<(f64, f64), ApiError> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(ApiError::BadRequest("lat and lon are required".to_string())),
        }
    }
}

/// Unwrap a query, turning axum's rejection into a JSON 400.
pub fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn build_report(
    state: &AppState,
    target: ReportTarget,
    query: &ReportQuery,
) -> Result<CommuneReport, ApiError> {
    let filters = query.filters()?;
    let title = match &target {
        ReportTarget::Point { lat, lon } => format!("{lat:.5}_{lon:.5}"),
        ReportTarget::Address(text) | ReportTarget::Commune(text) => text.clone(),
    };
    let mut report = state.reports.build(target, &filters).await?;

    if query.render_map.unwrap_or(false) {
        let overlays = report_overlays(&report);
        match state.maps.render(&report.location, &title, &overlays).await {
            Ok(artifact) => report.map_path = Some(artifact.relative_path),
            Err(err) => tracing::warn!("Map rendering failed for '{}': {}", title, err),
        }
    }
    Ok(report)
}

/// GET /v1/reports/point
pub async fn point_report(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<CommuneReport>, ApiError> {
    let query = parse_query(query)?;
    let (lat, lon) = query.point()?;
    let report = build_report(&state, ReportTarget::Point { lat, lon }, &query).await?;
    Ok(Json(report))
}

/// GET /v1/reports/address
pub async fn address_report(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<CommuneReport>, ApiError> {
    let query = parse_query(query)?;
    let address = query.address.clone().unwrap_or_default();
    let report = build_report(&state, ReportTarget::Address(address), &query).await?;
    Ok(Json(report))
}

/// GET /v1/reports/commune
pub async fn commune_report(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<CommuneReport>, ApiError> {
    let query = parse_query(query)?;
    let commune = query
        .commune
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("commune is required".to_string()))?
        .to_string();
    let report = build_report(&state, ReportTarget::Commune(commune), &query).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RiskQuery {
    pub lat: f64,
    pub lon: f64,
}

/// GET /v1/risks
pub async fn risks(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RiskQuery>, QueryRejection>,
) -> Result<Json<RiskBundle>, ApiError> {
    let query = parse_query(query)?;
    let location = Location::new(query.lat, query.lon)?;
    Ok(Json(state.reports.risks().aggregate(location.lat, location.lon).await))
}
