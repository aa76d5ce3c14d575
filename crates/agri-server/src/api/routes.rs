//! REST API routes.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::auth::{self, AdminToken};
use crate::api::{maps, reports, synthesis};
use crate::config::Config;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(config: &Config) -> Router<Arc<AppState>> {
    let admin_token = AdminToken(Arc::new(config.admin_token.clone()));

    let public_routes = Router::new()
        .route("/v1/reports/point", get(reports::point_report))
        .route("/v1/reports/address", get(reports::address_report))
        .route("/v1/reports/commune", get(reports::commune_report))
        .route("/v1/risks", get(reports::risks))
        .route("/v1/synthesis", post(synthesis::synthesize_reports))
        .route(
            "/v1/departments/:code/synthesis",
            get(synthesis::department_synthesis),
        );

    let admin_routes = Router::new()
        .route("/v1/maps/purge", post(maps::purge_maps))
        .layer(middleware::from_fn_with_state(admin_token, auth::require_admin));

    public_routes.merge(admin_routes)
}
