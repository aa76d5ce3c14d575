//! Post-fetch report filters.
//!
//! Filters only ever drop features from an already fetched layer; they never
//! narrow the query window.

use crate::models::Feature;
use crate::rpg::culture_matches;
use crate::spatial::geodesic_area_m2;
use crate::text::fold_key;
use serde::{Deserialize, Serialize};

/// Attribute the report builder writes a parcel's area to.
pub const AREA_HA_KEY: &str = "surface_ha";
pub const DISTANCE_BT_KEY: &str = "distance_bt";
pub const DISTANCE_HTA_KEY: &str = "distance_hta";

const AREA_M2_KEYS: [&str; 3] = ["surface_m2", "surface", "superficie"];
const ZONE_TYPE_KEYS: [&str; 3] = ["typezone", "TYPEZONE", "libelle"];

/// Grid connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkKind {
    Bt,
    Hta,
}

impl std::str::FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BT" => Ok(NetworkKind::Bt),
            "HTA" | "HT" => Ok(NetworkKind::Hta),
            other => Err(format!("unknown network type '{other}'")),
        }
    }
}

/// Caller-supplied thresholds applied after fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    pub min_area_ha: Option<f64>,
    #[serde(default)]
    pub max_area_ha: Option<f64>,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub max_bt_distance_m: Option<f64>,
    #[serde(default)]
    pub max_hta_distance_m: Option<f64>,
    /// Network types the distance limits apply to. Empty means both.
    #[serde(default)]
    pub networks: Vec<NetworkKind>,
    #[serde(default)]
    pub min_parking_area_m2: Option<f64>,
    #[serde(default)]
    pub min_derelict_area_m2: Option<f64>,
    #[serde(default)]
    pub zone_types: Vec<String>,
    #[serde(default = "default_true")]
    pub include_livestock: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReportFilters {
    fn default() -> Self {
        Self {
            min_area_ha: None,
            max_area_ha: None,
            culture: None,
            max_bt_distance_m: None,
            max_hta_distance_m: None,
            networks: Vec::new(),
            min_parking_area_m2: None,
            min_derelict_area_m2: None,
            zone_types: Vec::new(),
            include_livestock: true,
        }
    }
}

impl ReportFilters {
    fn distance_limits(&self) -> Vec<(&'static str, f64)> {
        let networks: &[NetworkKind] = if self.networks.is_empty() {
            &[NetworkKind::Bt, NetworkKind::Hta]
        } else {
            &self.networks
        };
        networks
            .iter()
            .filter_map(|network| match network {
                NetworkKind::Bt => self.max_bt_distance_m.map(|max| (DISTANCE_BT_KEY, max)),
                NetworkKind::Hta => self.max_hta_distance_m.map(|max| (DISTANCE_HTA_KEY, max)),
            })
            .collect()
    }

    /// Keep a parcel when it passes area and crop thresholds and lies within
    /// the distance limit of at least one requested network.
    pub fn keep_parcel(&self, parcel: &Feature) -> bool {
        if self.min_area_ha.is_some() || self.max_area_ha.is_some() {
            let Some(area) = parcel_area_ha(parcel) else {
                return false;
            };
            if self.min_area_ha.is_some_and(|min| area < min) {
                return false;
            }
            if self.max_area_ha.is_some_and(|max| area > max) {
                return false;
            }
        }

        if let Some(culture) = self.culture.as_deref() {
            if !culture_matches(parcel, culture) {
                return false;
            }
        }

        let limits = self.distance_limits();
        limits.is_empty()
            || limits.iter().any(|(key, max)| {
                parcel
                    .f64_property(key)
                    .is_some_and(|distance| distance <= *max)
            })
    }

    pub fn filter_parcels(&self, parcels: Vec<Feature>) -> Vec<Feature> {
        parcels.into_iter().filter(|p| self.keep_parcel(p)).collect()
    }

    pub fn filter_parkings(&self, parkings: Vec<Feature>) -> Vec<Feature> {
        filter_min_area(parkings, self.min_parking_area_m2)
    }

    pub fn filter_derelict_land(&self, sites: Vec<Feature>) -> Vec<Feature> {
        filter_min_area(sites, self.min_derelict_area_m2)
    }

    /// Keep zoning features whose zone type is in the allow-list.
    pub fn filter_zones(&self, zones: Vec<Feature>) -> Vec<Feature> {
        if self.zone_types.is_empty() {
            return zones;
        }
        let allowed: Vec<String> = self.zone_types.iter().map(|z| fold_key(z)).collect();
        zones
            .into_iter()
            .filter(|zone| {
                ZONE_TYPE_KEYS.iter().any(|key| {
                    zone.str_property(key)
                        .is_some_and(|value| allowed.contains(&fold_key(value)))
                })
            })
            .collect()
    }
}

/// Parcel area in hectares: the recorded attribute, else geodesic area.
pub fn parcel_area_ha(parcel: &Feature) -> Option<f64> {
    parcel
        .f64_property(AREA_HA_KEY)
        .or_else(|| feature_area_m2(parcel).map(|m2| m2 / 10_000.0))
}

/// Area in square meters: attribute keys first, else geodesic area.
pub fn feature_area_m2(feature: &Feature) -> Option<f64> {
    AREA_M2_KEYS
        .iter()
        .find_map(|key| feature.f64_property(key))
        .or_else(|| feature.geometry.as_ref().and_then(geodesic_area_m2))
}

fn filter_min_area(features: Vec<Feature>, min_m2: Option<f64>) -> Vec<Feature> {
    let Some(min_m2) = min_m2 else {
        return features;
    };
    features
        .into_iter()
        .filter(|feature| feature_area_m2(feature).is_some_and(|area| area >= min_m2))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parcel(area_ha: f64, bt: Option<f64>, hta: Option<f64>, code: &str) -> Feature {
        let mut feature = Feature::from_properties(json!({
            "surface_ha": area_ha,
            "CODE_CULTU": code,
        }));
        if let Some(bt) = bt {
            feature.set_property(DISTANCE_BT_KEY, bt);
        }
        if let Some(hta) = hta {
            feature.set_property(DISTANCE_HTA_KEY, hta);
        }
        feature
    }

    #[test]
    fn default_filters_keep_everything() {
        let filters = ReportFilters::default();
        assert!(filters.keep_parcel(&Feature::from_properties(json!({}))));
    }

    #[test]
    fn area_bounds_are_inclusive() {
        let filters = ReportFilters {
            min_area_ha: Some(1.0),
            max_area_ha: Some(5.0),
            ..ReportFilters::default()
        };
        assert!(filters.keep_parcel(&parcel(1.0, None, None, "BTH")));
        assert!(filters.keep_parcel(&parcel(5.0, None, None, "BTH")));
        assert!(!filters.keep_parcel(&parcel(0.5, None, None, "BTH")));
        assert!(!filters.keep_parcel(&parcel(6.0, None, None, "BTH")));
    }

    #[test]
    fn any_requested_network_within_limit_keeps_parcel() {
        let filters = ReportFilters {
            max_bt_distance_m: Some(500.0),
            max_hta_distance_m: Some(2_000.0),
            ..ReportFilters::default()
        };
        assert!(filters.keep_parcel(&parcel(1.0, Some(900.0), Some(1_500.0), "BTH")));
        assert!(!filters.keep_parcel(&parcel(1.0, Some(900.0), Some(2_500.0), "BTH")));
        assert!(!filters.keep_parcel(&parcel(1.0, None, None, "BTH")));
    }

    #[test]
    fn network_selection_restricts_limits() {
        let filters = ReportFilters {
            max_bt_distance_m: Some(500.0),
            max_hta_distance_m: Some(2_000.0),
            networks: vec![NetworkKind::Bt],
            ..ReportFilters::default()
        };
        assert!(!filters.keep_parcel(&parcel(1.0, Some(900.0), Some(100.0), "BTH")));
        assert!(filters.keep_parcel(&parcel(1.0, Some(400.0), None, "BTH")));
    }

    #[test]
    fn culture_filter_matches_decoded_label() {
        let filters = ReportFilters {
            culture: Some("blé".to_string()),
            ..ReportFilters::default()
        };
        assert!(filters.keep_parcel(&parcel(1.0, None, None, "BTH")));
        assert!(!filters.keep_parcel(&parcel(1.0, None, None, "MIS")));
    }

    #[test]
    fn min_area_uses_attributes_then_geometry() {
        let filters = ReportFilters {
            min_parking_area_m2: Some(1_000.0),
            ..ReportFilters::default()
        };
        let big = Feature::from_properties(json!({ "surface": 1_500 }));
        let small = Feature::from_properties(json!({ "surface_m2": "600" }));
        let unknown = Feature::from_properties(json!({ "nom": "?" }));
        let kept = filters.filter_parkings(vec![big, small, unknown]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].f64_property("surface"), Some(1_500.0));
    }

    #[test]
    fn zone_filter_touches_only_zoning() {
        let filters = ReportFilters {
            zone_types: vec!["AU".to_string(), "N".to_string()],
            ..ReportFilters::default()
        };
        let zones = vec![
            Feature::from_properties(json!({ "typezone": "U" })),
            Feature::from_properties(json!({ "typezone": "AU" })),
            Feature::from_properties(json!({ "libelle": "n" })),
        ];
        assert_eq!(filters.filter_zones(zones).len(), 2);
        let parkings = vec![Feature::from_properties(json!({ "typezone": "U" }))];
        assert_eq!(filters.filter_parkings(parkings).len(), 1);
    }

    #[test]
    fn network_kind_parses_case_insensitively() {
        assert_eq!("bt".parse::<NetworkKind>(), Ok(NetworkKind::Bt));
        assert_eq!("HTA".parse::<NetworkKind>(), Ok(NetworkKind::Hta));
        assert!("x".parse::<NetworkKind>().is_err());
    }
}
