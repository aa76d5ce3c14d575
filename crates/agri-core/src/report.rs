//! Commune-level report assembled by the server.

use crate::models::{Feature, FeatureCollection, LayerKind, Location};
use crate::risk::RiskBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Commune directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuneInfo {
    pub name: String,
    #[serde(default)]
    pub insee_code: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    /// Surface in hectares as published by the directory.
    #[serde(default)]
    pub surface_ha: Option<f64>,
    #[serde(default)]
    pub centre: Option<Location>,
    /// Administrative boundary; commune-scoped layers are clipped to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour: Option<geojson::Geometry>,
}

/// How many features a layer returned and how many survived filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDiagnostics {
    pub fetched: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuneReport {
    pub location: Location,
    #[serde(default)]
    pub commune: Option<CommuneInfo>,
    #[serde(default)]
    pub layers: BTreeMap<LayerKind, FeatureCollection>,
    #[serde(default)]
    pub nearest_bt: Vec<Feature>,
    #[serde(default)]
    pub nearest_hta: Vec<Feature>,
    #[serde(default)]
    pub risks: RiskBundle,
    #[serde(default)]
    pub solar_yield_kwh_per_kwp: Option<f64>,
    #[serde(default)]
    pub diagnostics: BTreeMap<LayerKind, LayerDiagnostics>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub map_path: Option<String>,
}

impl CommuneReport {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            commune: None,
            layers: BTreeMap::new(),
            nearest_bt: Vec::new(),
            nearest_hta: Vec::new(),
            risks: RiskBundle::new(),
            solar_yield_kwh_per_kwp: None,
            diagnostics: BTreeMap::new(),
            generated_at: Utc::now(),
            map_path: None,
        }
    }

    /// Features of one layer; empty when the layer was not fetched.
    pub fn features(&self, kind: LayerKind) -> &[Feature] {
        self.layers
            .get(&kind)
            .map(|collection| collection.features.as_slice())
            .unwrap_or(&[])
    }

    /// Store a filtered layer together with its diagnostics.
    pub fn set_layer(&mut self, kind: LayerKind, fetched: usize, collection: FeatureCollection) {
        self.diagnostics.insert(
            kind,
            LayerDiagnostics {
                fetched,
                kept: collection.len(),
            },
        );
        self.layers.insert(kind, collection);
    }

    pub fn commune_code(&self) -> Option<&str> {
        self.commune.as_ref()?.insee_code.as_deref()
    }
}
