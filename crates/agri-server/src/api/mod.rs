//! HTTP API for the report service.

pub mod auth;
pub mod error;
pub mod maps;
pub mod reports;
pub mod request_id;
mod routes;
pub mod synthesis;

use crate::config::Config;
use axum::Router;

pub use error::ApiError;

pub fn routes(config: &Config) -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router(config)
}

#[cfg(test)]
mod tests;
