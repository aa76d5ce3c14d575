//! Standalone Leaflet maps written to the static map directory.

use crate::config::Config;
use agri_core::nearest::DISTANCE_KEY;
use agri_core::spatial::coordinates_finite;
use agri_core::text::fold_key;
use agri_core::{CommuneReport, Feature, FeatureCollection, LayerKind, Location};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

const POPUP_KEY: &str = "_popup";
const MAX_SLUG_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("map page serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One toggleable layer on the map.
#[derive(Debug, Clone)]
pub struct MapOverlay {
    pub name: String,
    pub color: &'static str,
    pub collection: FeatureCollection,
    /// Draw point features as circle markers with popups.
    pub markers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapArtifact {
    pub file_name: String,
    /// Path relative to the static root, e.g. `cartes/carte_tulle_….html`.
    pub relative_path: String,
}

#[derive(Debug, Clone)]
pub struct MapRenderer {
    dir: PathBuf,
    url_prefix: String,
}

impl MapRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.map_dir.clone(),
            url_prefix: config.map_url_prefix.trim_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn render(
        &self,
        location: &Location,
        title: &str,
        overlays: &[MapOverlay],
    ) -> Result<MapArtifact, MapError> {
        let layers: Vec<Value> = overlays.iter().filter_map(overlay_json).collect();
        let html = render_page(location, title, &layers)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!(
            "carte_{}_{}_{}.html",
            slug(title),
            Utc::now().format("%Y%m%d_%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        tokio::fs::write(self.dir.join(&file_name), html).await?;
        tracing::info!(
            "Rendered map {} with {}/{} overlays",
            file_name,
            layers.len(),
            overlays.len()
        );

        let relative_path = if self.url_prefix.is_empty() {
            file_name.clone()
        } else {
            format!("{}/{}", self.url_prefix, file_name)
        };
        Ok(MapArtifact {
            file_name,
            relative_path,
        })
    }

    /// Delete every rendered page. A missing directory counts as empty.
    pub async fn purge(&self) -> Result<usize, MapError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("html") {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        tracing::info!("Purged {} rendered maps from {}", removed, self.dir.display());
        Ok(removed)
    }
}

/// Overlays for a finished report, in drawing order.
pub fn report_overlays(report: &CommuneReport) -> Vec<MapOverlay> {
    let layer = |kind: LayerKind, name: &str, color: &'static str, markers: bool| MapOverlay {
        name: name.to_string(),
        color,
        collection: report
            .layers
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| FeatureCollection::empty(Some(kind.as_str()))),
        markers,
    };

    let mut overlays = vec![
        layer(LayerKind::Cadastre, "Cadastre", "#7f8c8d", false),
        layer(LayerKind::Zoning, "Zonage PLU", "#8e44ad", false),
        layer(LayerKind::Rpg, "Parcelles RPG", "#27ae60", false),
        layer(LayerKind::Parkings, "Parkings", "#34495e", false),
        layer(LayerKind::DerelictLand, "Friches", "#d35400", false),
        layer(LayerKind::SolarPotential, "Potentiel solaire", "#f1c40f", false),
        layer(LayerKind::Livestock, "Éleveurs", "#16a085", true),
        layer(LayerKind::GridCapacity, "Capacités d'accueil", "#e67e22", true),
        layer(LayerKind::AccelerationZones, "Zones d'accélération (ZAER)", "#2ecc71", false),
    ];
    overlays.push(MapOverlay {
        name: "Postes BT".to_string(),
        color: "#2980b9",
        collection: FeatureCollection::new(Some(LayerKind::BtSubstations.as_str()), report.nearest_bt.clone()),
        markers: true,
    });
    overlays.push(MapOverlay {
        name: "Postes HTA".to_string(),
        color: "#c0392b",
        collection: FeatureCollection::new(Some(LayerKind::HtaSubstations.as_str()), report.nearest_hta.clone()),
        markers: true,
    });
    overlays
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn popup(feature: &Feature) -> Option<String> {
    let name = feature.first_text(&["nom", "name", "NOM", "libelle", "denomination"]);
    let distance = feature
        .f64_property(DISTANCE_KEY)
        .map(|meters| format!("{meters:.0} m"));
    match (name, distance) {
        (None, None) => None,
        (Some(name), None) => Some(escape_html(&name)),
        (None, Some(distance)) => Some(distance),
        (Some(name), Some(distance)) => Some(format!("{}<br>{}", escape_html(&name), distance)),
    }
}

/// GeoJSON for one overlay, or `None` when it cannot be drawn.
fn overlay_json(overlay: &MapOverlay) -> Option<Value> {
    let mut features = Vec::with_capacity(overlay.collection.len());
    for feature in &overlay.collection.features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        if !coordinates_finite(geometry) {
            tracing::warn!("Skipping map overlay '{}': non-finite coordinates", overlay.name);
            return None;
        }
        let mut drawn = feature.clone();
        if let Some(text) = popup(feature) {
            drawn.set_property(POPUP_KEY, text);
        }
        features.push(drawn);
    }

    let data = match serde_json::to_value(FeatureCollection::new(overlay.collection.layer.as_deref(), features)) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!("Skipping map overlay '{}': {}", overlay.name, err);
            return None;
        }
    };
    Some(json!({
        "name": overlay.name,
        "color": overlay.color,
        "markers": overlay.markers,
        "data": data,
    }))
}

fn slug(title: &str) -> String {
    let mut slug = String::new();
    for c in fold_key(title).chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug: String = slug.trim_matches('_').chars().take(MAX_SLUG_LEN).collect();
    if slug.is_empty() {
        "point".to_string()
    } else {
        slug
    }
}

fn render_page(location: &Location, title: &str, layers: &[Value]) -> Result<String, MapError> {
    let layers = script_json(layers)?;
    let centre = serde_json::to_string(&[location.lat, location.lon])?;
    let label = script_json(&escape_html(location.address.as_deref().unwrap_or(title)))?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var centre = {centre};
var map = L.map('map').setView(centre, 14);
var osm = L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  maxZoom: 19, attribution: '&copy; OpenStreetMap'
}}).addTo(map);
var satellite = L.tileLayer('https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{{z}}/{{y}}/{{x}}', {{
  maxZoom: 19, attribution: 'Esri World Imagery'
}});
var overlays = {{}};
var layers = {layers};
layers.forEach(function (layer) {{
  var group = L.geoJSON(layer.data, {{
    style: function () {{ return {{ color: layer.color, weight: 2, fillOpacity: 0.25 }}; }},
    pointToLayer: function (feature, latlng) {{
      return L.circleMarker(latlng, {{ radius: layer.markers ? 7 : 4, color: layer.color, fillOpacity: 0.8 }});
    }},
    onEachFeature: function (feature, item) {{
      if (feature.properties && feature.properties._popup) {{
        item.bindPopup(feature.properties._popup);
      }}
    }}
  }});
  group.addTo(map);
  overlays[layer.name] = group;
}});
L.marker(centre).addTo(map).bindPopup({label}).openPopup();
L.control.layers({{ 'OpenStreetMap': osm, 'Satellite': satellite }}, overlays).addTo(map);
</script>
</body>
</html>
"#,
        title = escape_html(title),
        centre = centre,
        layers = layers,
        label = label,
    ))
}

/// JSON safe to embed in a `<script>` block: no `<` survives, so neither
/// `</script>` nor `<!--` can appear.
fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, MapError> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}
