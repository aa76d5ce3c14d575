//! Error types shared by the pipeline.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("coordinates are not finite numbers")]
    InvalidCoordinates,
    #[error("point ({lat}, {lon}) is outside the national envelope")]
    OutOfEnvelope { lat: f64, lon: f64 },
}

/// Why an address could not be turned into a [`crate::Location`].
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GeocodeFailure {
    #[error("address is empty")]
    EmptyAddress,
    #[error("no geocoder could resolve '{address}'")]
    NotFound { address: String },
    #[error("resolved point ({lat}, {lon}) for '{address}' is outside the national envelope")]
    OutOfBounds { address: String, lat: f64, lon: f64 },
}
