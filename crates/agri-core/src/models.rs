//! Core data models for the AgriWeb pipeline.

use crate::error::CoreError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Plausible national envelope: metropolitan France including Corsica.
pub const ENVELOPE_MIN_LAT: f64 = 41.0;
pub const ENVELOPE_MAX_LAT: f64 = 51.5;
pub const ENVELOPE_MIN_LON: f64 = -5.5;
pub const ENVELOPE_MAX_LON: f64 = 10.0;

/// Which geocoder produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeSource {
    BanAdresse,
    Nominatim,
    CommuneCentre,
}

/// WGS84 point the pipeline works around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<GeocodeSource>,
}

impl Location {
    /// Build a location, rejecting non-finite or out-of-envelope points.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoreError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoreError::InvalidCoordinates);
        }
        if !in_envelope(lat, lon) {
            return Err(CoreError::OutOfEnvelope { lat, lon });
        }
        Ok(Self {
            lat,
            lon,
            address: None,
            source: None,
        })
    }

    pub fn with_address(mut self, address: impl Into<String>, source: GeocodeSource) -> Self {
        self.address = Some(address.into());
        self.source = Some(source);
        self
    }
}

pub fn in_envelope(lat: f64, lon: f64) -> bool {
    (ENVELOPE_MIN_LAT..=ENVELOPE_MAX_LAT).contains(&lat)
        && (ENVELOPE_MIN_LON..=ENVELOPE_MAX_LON).contains(&lon)
}

/// Spatial layers the report builder queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Cadastre,
    Rpg,
    BtSubstations,
    HtaSubstations,
    Zoning,
    Parkings,
    DerelictLand,
    SolarPotential,
    Livestock,
    GridCapacity,
    AccelerationZones,
}

impl LayerKind {
    pub const ALL: [LayerKind; 11] = [
        LayerKind::Cadastre,
        LayerKind::Rpg,
        LayerKind::BtSubstations,
        LayerKind::HtaSubstations,
        LayerKind::Zoning,
        LayerKind::Parkings,
        LayerKind::DerelictLand,
        LayerKind::SolarPotential,
        LayerKind::Livestock,
        LayerKind::GridCapacity,
        LayerKind::AccelerationZones,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Cadastre => "cadastre",
            LayerKind::Rpg => "rpg",
            LayerKind::BtSubstations => "bt_substations",
            LayerKind::HtaSubstations => "hta_substations",
            LayerKind::Zoning => "zoning",
            LayerKind::Parkings => "parkings",
            LayerKind::DerelictLand => "derelict_land",
            LayerKind::SolarPotential => "solar_potential",
            LayerKind::Livestock => "livestock",
            LayerKind::GridCapacity => "grid_capacity",
            LayerKind::AccelerationZones => "acceleration_zones",
        }
    }

    /// Query half-width around the search point, in meters.
    pub fn default_radius_m(&self) -> f64 {
        match self {
            LayerKind::Cadastre => 100.0,
            LayerKind::Rpg => 300.0,
            LayerKind::BtSubstations | LayerKind::GridCapacity => 11_000.0,
            LayerKind::HtaSubstations => 55_000.0,
            LayerKind::Zoning
            | LayerKind::Parkings
            | LayerKind::DerelictLand
            | LayerKind::SolarPotential
            | LayerKind::AccelerationZones => 3_000.0,
            LayerKind::Livestock => 5_500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    #[default]
    FeatureCollection,
}

/// One spatial object with open-ended attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub kind: FeatureTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<geojson::Geometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

/// How two features are recognized as the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureIdentity {
    Source { layer: String, id: String },
    Structural(String),
}

impl Feature {
    pub fn new(geometry: Option<geojson::Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            kind: FeatureTag::Feature,
            id: None,
            geometry,
            properties,
        }
    }

    /// Feature without geometry whose attributes come from a JSON object.
    /// Non-object values produce empty attributes.
    pub fn from_properties(properties: Value) -> Self {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(None, properties)
    }

    pub fn point(lat: f64, lon: f64, properties: Map<String, Value>) -> Self {
        let geometry = geojson::Geometry::new(geojson::Value::Point(vec![lon, lat]));
        Self::new(Some(geometry), properties)
    }

    /// Lenient conversion of one upstream item. Feature objects keep their
    /// geometry, attributes and id; bare geometries become attribute-less
    /// features; other objects become geometry-less features.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let is_feature = object.get("type").and_then(Value::as_str) == Some("Feature")
            || object.contains_key("geometry")
            || object.contains_key("properties");

        if is_feature {
            let geometry = object.get("geometry").and_then(parse_geometry);
            let properties = object
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let id = object.get("id").filter(|id| !id.is_null()).cloned();
            return Some(Self {
                kind: FeatureTag::Feature,
                id,
                geometry,
                properties,
            });
        }

        if object.contains_key("coordinates") {
            if let Some(geometry) = parse_geometry(value) {
                return Some(Self::new(Some(geometry), Map::new()));
            }
        }

        Some(Self::new(None, object.clone()))
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|value| !value.is_null())
    }

    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.property(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Numeric attribute, accepting numeric strings such as `"12.5"`.
    pub fn f64_property(&self, key: &str) -> Option<f64> {
        let value: Option<f64> = match self.property(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().replace(',', ".").parse().ok(),
            _ => None,
        };
        value.filter(|value| value.is_finite())
    }

    /// First non-empty textual attribute among `keys`, numbers rendered as text.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.property(key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn source_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// `(layer, source id)` when the upstream gave an id, else a canonical
    /// serialization of geometry and attributes.
    pub fn identity(&self, layer: &str) -> FeatureIdentity {
        match self.source_id() {
            Some(id) => FeatureIdentity::Source {
                layer: layer.to_string(),
                id,
            },
            None => FeatureIdentity::Structural(self.structural_key()),
        }
    }

    pub fn structural_key(&self) -> String {
        let geometry = self
            .geometry
            .as_ref()
            .and_then(|geometry| serde_json::to_string(geometry).ok())
            .unwrap_or_default();
        let properties = serde_json::to_string(&self.properties).unwrap_or_default();
        format!("{geometry}|{properties}")
    }
}

fn parse_geometry(value: &Value) -> Option<geojson::Geometry> {
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordered features sharing a layer origin, always in canonical shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub kind: CollectionTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(layer: Option<&str>, features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionTag::FeatureCollection,
            layer: layer.map(str::to_string),
            features,
        }
    }

    pub fn empty(layer: Option<&str>) -> Self {
        Self::new(layer, Vec::new())
    }

    /// Normalize any upstream JSON body into the canonical shape.
    pub fn from_json(value: Value, layer: Option<&str>) -> Self {
        RawPayload::classify(value).normalize(layer)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Shape of an upstream body, decided once at the normalization boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Empty,
    List(Vec<Value>),
    Collection(Vec<Value>),
}

impl RawPayload {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => RawPayload::List(items),
            Value::Object(mut object) => {
                let is_feature =
                    object.get("type").and_then(Value::as_str) == Some("Feature");
                match object.remove("features") {
                    Some(Value::Array(features)) => RawPayload::Collection(features),
                    Some(_) => RawPayload::Empty,
                    None if is_feature => RawPayload::List(vec![Value::Object(object)]),
                    None => RawPayload::Empty,
                }
            }
            _ => RawPayload::Empty,
        }
    }

    pub fn normalize(self, layer: Option<&str>) -> FeatureCollection {
        let items = match self {
            RawPayload::Empty => return FeatureCollection::empty(layer),
            RawPayload::List(items) | RawPayload::Collection(items) => items,
        };
        let features = items.iter().filter_map(Feature::from_value).collect();
        FeatureCollection::new(layer, features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "poste.1",
                    "geometry": { "type": "Point", "coordinates": [2.35, 48.85] },
                    "properties": { "nom": "Poste A" }
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": null
                }
            ]
        })
    }

    #[test]
    fn null_and_garbage_become_empty_collections() {
        for payload in [Value::Null, json!("oops"), json!(42), json!({ "error": "x" })] {
            let collection = FeatureCollection::from_json(payload, Some("gpu:test"));
            assert!(collection.is_empty());
            assert_eq!(collection.layer.as_deref(), Some("gpu:test"));
        }
    }

    #[test]
    fn bare_list_is_wrapped() {
        let payload = json!([
            { "type": "Feature", "geometry": null, "properties": { "a": 1 } },
            "not a feature"
        ]);
        let collection = FeatureCollection::from_json(payload, None);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features[0].f64_property("a"), Some(1.0));
    }

    #[test]
    fn canonical_shape_on_serialization() {
        let collection = FeatureCollection::from_json(sample_collection(), None);
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][1]["properties"], json!({}));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = FeatureCollection::from_json(sample_collection(), Some("gpu:poste"));
        let twice =
            FeatureCollection::from_json(serde_json::to_value(&once).unwrap(), Some("gpu:poste"));
        assert_eq!(once, twice);
    }

    #[test]
    fn identity_prefers_source_id() {
        let collection = FeatureCollection::from_json(sample_collection(), None);
        assert_eq!(
            collection.features[0].identity("gpu:poste"),
            FeatureIdentity::Source {
                layer: "gpu:poste".to_string(),
                id: "poste.1".to_string()
            }
        );
        assert!(matches!(
            collection.features[1].identity("gpu:poste"),
            FeatureIdentity::Structural(_)
        ));
    }

    #[test]
    fn location_rejects_points_outside_envelope() {
        assert!(Location::new(48.85, 2.35).is_ok());
        assert_eq!(
            Location::new(40.7, -74.0),
            Err(CoreError::OutOfEnvelope { lat: 40.7, lon: -74.0 })
        );
        assert_eq!(Location::new(f64::NAN, 2.0), Err(CoreError::InvalidCoordinates));
    }

    #[test]
    fn numeric_strings_parse_as_numbers() {
        let feature = Feature::from_properties(json!({ "surface": "1 234", "ha": "2,5" }));
        assert_eq!(feature.f64_property("ha"), Some(2.5));
        assert_eq!(feature.f64_property("surface"), None);
    }
}
