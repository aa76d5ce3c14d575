//! National risk registry categories and the per-category result bundle.

use crate::models::Feature;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One registry endpoint; every bundle holds all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    SeismicZoning,
    FloodZoning,
    FloodTerritories,
    PollutedSoils,
    FormerIndustrialSites,
    MunicipalNotices,
    FloodAtlas,
    NaturalDisasters,
    UndergroundCavities,
    GroundMovements,
    ClayShrinkage,
    Radon,
    ClassifiedInstallations,
    NuclearInstallations,
}

/// Sub-arrays of the polluted soils payload.
pub const POLLUTED_SOIL_SECTIONS: [&str; 4] =
    ["casias", "instructions", "conclusions_sis", "conclusions_sup"];

/// Attribute naming the sub-array a polluted soils record came from.
pub const POLLUTED_SOIL_TYPE_KEY: &str = "ssp_type";

impl RiskCategory {
    pub const ALL: [RiskCategory; 14] = [
        RiskCategory::SeismicZoning,
        RiskCategory::FloodZoning,
        RiskCategory::FloodTerritories,
        RiskCategory::PollutedSoils,
        RiskCategory::FormerIndustrialSites,
        RiskCategory::MunicipalNotices,
        RiskCategory::FloodAtlas,
        RiskCategory::NaturalDisasters,
        RiskCategory::UndergroundCavities,
        RiskCategory::GroundMovements,
        RiskCategory::ClayShrinkage,
        RiskCategory::Radon,
        RiskCategory::ClassifiedInstallations,
        RiskCategory::NuclearInstallations,
    ];

    /// Path below the registry base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            RiskCategory::SeismicZoning => "zonage_sismique",
            RiskCategory::FloodZoning => "tri_zonage",
            RiskCategory::FloodTerritories => "gaspar/tri",
            RiskCategory::PollutedSoils => "ssp",
            RiskCategory::FormerIndustrialSites => "ssp/casias",
            RiskCategory::MunicipalNotices => "gaspar/tim",
            RiskCategory::FloodAtlas => "gaspar/azi",
            RiskCategory::NaturalDisasters => "gaspar/catnat",
            RiskCategory::UndergroundCavities => "cavites",
            RiskCategory::GroundMovements => "mvt",
            RiskCategory::ClayShrinkage => "argiles",
            RiskCategory::Radon => "radon",
            RiskCategory::ClassifiedInstallations => "installations",
            RiskCategory::NuclearInstallations => "installations_nucleaires",
        }
    }

    /// Search radius in meters for area-based categories.
    pub fn radius_m(&self) -> Option<u32> {
        match self {
            RiskCategory::SeismicZoning
            | RiskCategory::FloodZoning
            | RiskCategory::ClayShrinkage
            | RiskCategory::Radon => None,
            RiskCategory::ClassifiedInstallations => Some(2_000),
            RiskCategory::NuclearInstallations => Some(5_000),
            _ => Some(1_000),
        }
    }

    /// Zoning endpoints answer 404 where no zoning exists.
    pub fn not_found_means_empty(&self) -> bool {
        matches!(self, RiskCategory::SeismicZoning | RiskCategory::FloodZoning)
    }

    /// Turn a registry body into features.
    ///
    /// Bodies are `{data: [...]}`, or for polluted soils an object of named
    /// sections each holding `data`. A body of any other shape is an error.
    pub fn parse_records(&self, body: &Value) -> Result<Vec<Feature>, String> {
        if *self == RiskCategory::PollutedSoils {
            let object = body
                .as_object()
                .ok_or_else(|| "polluted soils body is not an object".to_string())?;
            if !POLLUTED_SOIL_SECTIONS
                .iter()
                .any(|section| object.contains_key(*section))
            {
                return Err("polluted soils body has no known section".to_string());
            }
            let mut features = Vec::new();
            for section in POLLUTED_SOIL_SECTIONS {
                let records = object
                    .get(section)
                    .and_then(|s| s.get("data"))
                    .and_then(Value::as_array);
                for record in records.into_iter().flatten() {
                    if let Some(mut feature) = record_to_feature(record) {
                        feature.set_property(POLLUTED_SOIL_TYPE_KEY, section);
                        features.push(feature);
                    }
                }
            }
            return Ok(features);
        }

        let records = match body {
            Value::Object(object) => object.get("data").and_then(Value::as_array),
            Value::Array(items) => Some(items),
            _ => None,
        }
        .ok_or_else(|| format!("{} body has no data array", self.endpoint()))?;

        Ok(records.iter().filter_map(record_to_feature).collect())
    }
}

/// Registry record to feature. Geometry comes from `geom`/`geometry`, else
/// from `latitude`/`longitude` attributes.
pub fn record_to_feature(record: &Value) -> Option<Feature> {
    let object = record.as_object()?;
    let mut properties: Map<String, Value> = object.clone();

    let geometry = ["geom", "geometry"]
        .iter()
        .filter_map(|key| properties.remove(*key))
        .find_map(|value| serde_json::from_value::<geojson::Geometry>(value).ok());

    let mut feature = Feature::new(geometry, properties);
    if feature.geometry.is_none() {
        if let (Some(lat), Some(lon)) = (
            feature.f64_property("latitude"),
            feature.f64_property("longitude"),
        ) {
            feature.geometry = Some(geojson::Geometry::new(geojson::Value::Point(vec![lon, lat])));
        }
    }
    Some(feature)
}

/// Result of one category: records, or an empty list and an error marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSlot {
    #[serde(default)]
    pub records: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RiskSlot {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Every category mapped to its slot. Categories are never absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBundle {
    pub categories: BTreeMap<RiskCategory, RiskSlot>,
}

impl Default for RiskBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskBundle {
    pub fn new() -> Self {
        Self {
            categories: RiskCategory::ALL
                .into_iter()
                .map(|category| (category, RiskSlot::default()))
                .collect(),
        }
    }

    /// Store the outcome of one category call.
    pub fn record(&mut self, category: RiskCategory, outcome: Result<Vec<Feature>, String>) {
        let slot = match outcome {
            Ok(records) => RiskSlot {
                records,
                error: None,
            },
            Err(error) => RiskSlot {
                records: Vec::new(),
                error: Some(error),
            },
        };
        self.categories.insert(category, slot);
    }

    pub fn slot(&self, category: RiskCategory) -> Option<&RiskSlot> {
        self.categories.get(&category)
    }

    pub fn total_count(&self) -> usize {
        self.categories.values().map(|slot| slot.records.len()).sum()
    }

    pub fn failed_categories(&self) -> Vec<RiskCategory> {
        self.categories
            .iter()
            .filter(|(_, slot)| slot.failed())
            .map(|(category, _)| *category)
            .collect()
    }

    pub fn counts(&self) -> BTreeMap<RiskCategory, usize> {
        self.categories
            .iter()
            .map(|(category, slot)| (*category, slot.records.len()))
            .collect()
    }
}
