//! Nearest-feature resolution with legacy precomputed distances.
//!
//! Some upstream layers ship distances joined by another tool under older
//! attribute names. When one of those holds a usable value it wins over a
//! fresh geometric computation.

use crate::models::Feature;
use crate::spatial::{distance_to_geometry_m, round_cm};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Attribute names that may carry a precomputed distance, in priority order.
pub const LEGACY_DISTANCE_KEYS: [&str; 3] = ["distance_bt", "distance_au_poste", "distance_hta"];

/// Extra keys seen on aggregated parcels.
pub const AGGREGATE_DISTANCE_KEYS: [&str; 2] = ["min_bt_distance_m", "min_ht_distance_m"];

/// Distance written for features without any computable distance.
pub const DEFAULT_DISTANCE_SENTINEL_M: f64 = 999_999.0;

/// Attribute the resolver writes the distance to.
pub const DISTANCE_KEY: &str = "distance";

/// Ordered candidate attribute names for a precomputed distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceKeys(Vec<String>);

impl Default for DistanceKeys {
    fn default() -> Self {
        Self::new(LEGACY_DISTANCE_KEYS)
    }
}

impl DistanceKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// Legacy keys followed by the aggregated-parcel keys.
    pub fn for_synthesis() -> Self {
        Self::new(LEGACY_DISTANCE_KEYS.into_iter().chain(AGGREGATE_DISTANCE_KEYS))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// First key, in priority order, holding a valid distance.
    pub fn first_valid(&self, properties: &Map<String, Value>) -> Option<f64> {
        self.keys()
            .find_map(|key| properties.get(key).and_then(valid_distance))
    }

    /// Smallest valid distance across all keys.
    pub fn min_valid(&self, properties: &Map<String, Value>) -> Option<f64> {
        self.keys()
            .filter_map(|key| properties.get(key).and_then(valid_distance))
            .min_by(f64::total_cmp)
    }
}

/// A JSON number that is finite and strictly positive.
pub fn valid_distance(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|d| d.is_finite() && *d > 0.0),
        _ => None,
    }
}

/// Distance for one feature: legacy attributes first, then geometry.
pub fn feature_distance(feature: &Feature, lat: f64, lon: f64, keys: &DistanceKeys) -> Option<f64> {
    keys.min_valid(&feature.properties).or_else(|| {
        feature
            .geometry
            .as_ref()
            .and_then(|geometry| distance_to_geometry_m(lat, lon, geometry))
    })
}

/// Geometric distance from a point to the closest of `features`.
pub fn closest_distance(features: &[Feature], lat: f64, lon: f64) -> Option<f64> {
    features
        .iter()
        .filter_map(|feature| feature.geometry.as_ref())
        .filter_map(|geometry| distance_to_geometry_m(lat, lon, geometry))
        .min_by(f64::total_cmp)
}

/// Ascending order with missing distances last.
pub fn compare_distances(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Return the `k` features closest to a point, each annotated with a
/// `distance` attribute in meters.
///
/// # Arguments
/// * `features` - Candidates, left untouched
/// * `lat`, `lon` - Reference point in degrees
/// * `k` - Maximum number of results
/// * `keys` - Attribute names that may carry a precomputed distance
/// * `sentinel_m` - Distance written when nothing can be computed
///
/// # Returns
/// Up to `k` features, closest first. Ties keep input order and features
/// without a distance come last.
pub fn nearest(
    features: &[Feature],
    lat: f64,
    lon: f64,
    k: usize,
    keys: &DistanceKeys,
    sentinel_m: f64,
) -> Vec<Feature> {
    let mut ranked: Vec<(Option<f64>, Feature)> = features
        .iter()
        .map(|feature| {
            let distance = feature_distance(feature, lat, lon, keys).map(round_cm);
            let mut annotated = feature.clone();
            annotated.set_property(DISTANCE_KEY, distance.unwrap_or(sentinel_m));
            (distance, annotated)
        })
        .collect();

    ranked.sort_by(|(a, _), (b, _)| compare_distances(*a, *b));
    ranked.truncate(k);
    ranked.into_iter().map(|(_, feature)| feature).collect()
}
