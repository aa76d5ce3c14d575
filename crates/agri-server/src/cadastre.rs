//! Cadastral plot references from API Carto.

use crate::config::Config;
use crate::http::{FetchError, HttpClient};
use agri_core::spatial::centroid;
use agri_core::Feature;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

/// Attribute written on enriched parcels.
pub const PLOT_NUMBER_KEY: &str = "numero_parcelle";
const UNKNOWN_PLOT: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotReference {
    pub commune_code: Option<String>,
    pub absorbed_code: Option<String>,
    pub section: Option<String>,
    pub number: Option<String>,
    pub commune_name: Option<String>,
}

impl PlotReference {
    /// Human-readable plot id, e.g. `19272 000 AB 42`.
    pub fn label(&self) -> Option<String> {
        let section = self.section.as_deref()?;
        let number = self.number.as_deref()?;
        let commune = self.commune_code.as_deref().unwrap_or("");
        let absorbed = self.absorbed_code.as_deref().unwrap_or("000");
        Some(format!("{commune} {absorbed} {section} {number}").trim().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CadastreClient {
    http: HttpClient,
    endpoint: String,
    concurrency: usize,
}

impl CadastreClient {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            endpoint: format!("{}/parcelle", config.cadastre_api_url),
            concurrency: config.cadastre_concurrency.max(1),
        }
    }

    /// Plot containing a point.
    pub async fn plot_at(&self, lat: f64, lon: f64) -> Result<Option<PlotReference>, FetchError> {
        let geom = json!({ "type": "Point", "coordinates": [lon, lat] }).to_string();
        let body = self
            .http
            .get_json(
                &self.endpoint,
                &[
                    ("geom", geom),
                    ("_limit", "1".to_string()),
                    ("source_ign", "PCI".to_string()),
                ],
            )
            .await?;
        let Some(properties) = body.pointer("/features/0/properties") else {
            return Ok(None);
        };
        let text = |key: &str| {
            properties
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Ok(Some(PlotReference {
            commune_code: text("code_com"),
            absorbed_code: text("com_abs"),
            section: text("section"),
            number: text("numero"),
            commune_name: text("nom_com"),
        }))
    }

    /// Attach the cadastral plot number to each parcel, "N/A" when unknown.
    /// Existing section/number attributes are kept. At most `concurrency`
    /// lookups are in flight.
    pub async fn enrich(&self, parcels: &mut [Feature]) {
        let centroids: Vec<Option<(f64, f64)>> = parcels
            .iter()
            .map(|parcel| parcel.geometry.as_ref().and_then(centroid))
            .collect();
        let plots: Vec<Option<PlotReference>> = stream::iter(centroids)
            .map(|point| async move {
                let (lat, lon) = point?;
                match self.plot_at(lat, lon).await {
                    Ok(plot) => plot,
                    Err(err) => {
                        tracing::warn!("Cadastre lookup failed at ({}, {}): {}", lat, lon, err);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (parcel, plot) in parcels.iter_mut().zip(plots) {
            let label = plot.as_ref().and_then(PlotReference::label);
            parcel.set_property(PLOT_NUMBER_KEY, label.unwrap_or_else(|| UNKNOWN_PLOT.to_string()));
            let Some(plot) = plot else { continue };
            let fields = [
                ("code_com", plot.commune_code),
                ("com_abs", plot.absorbed_code),
                ("section", plot.section),
                ("numero", plot.number),
                ("nom_com", plot.commune_name),
            ];
            for (key, value) in fields {
                let Some(value) = value else { continue };
                if parcel.property(key).is_none() {
                    parcel.set_property(key, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_upstream, test_config};
    use axum::{extract::Query, routing::get, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn parcel_at(lat: f64, lon: f64) -> Feature {
        Feature::point(lat, lon, serde_json::Map::new())
    }

    #[tokio::test]
    async fn enrich_sets_plot_numbers() {
        let app = Router::new().route(
            "/cadastre/parcelle",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let geom: Value = serde_json::from_str(q.get("geom").map(String::as_str).unwrap_or("null"))
                    .unwrap_or(Value::Null);
                if geom["coordinates"][1].as_f64() == Some(45.0) {
                    Json(json!({ "features": [{ "properties": {
                        "code_com": "272", "com_abs": "000", "section": "AB", "numero": "0042", "nom_com": "Tulle"
                    }}]}))
                } else {
                    Json(json!({ "features": [] }))
                }
            }),
        );
        let base = spawn_upstream(app).await;
        let config = test_config(&base);
        let cadastre = CadastreClient::new(HttpClient::new(&config).unwrap(), &config);

        let mut parcels = vec![parcel_at(45.0, 1.0), parcel_at(46.0, 1.0), Feature::from_properties(json!({}))];
        cadastre.enrich(&mut parcels).await;

        assert_eq!(parcels[0].str_property(PLOT_NUMBER_KEY), Some("272 000 AB 0042"));
        assert_eq!(parcels[0].str_property("section"), Some("AB"));
        assert_eq!(parcels[1].str_property(PLOT_NUMBER_KEY), Some("N/A"));
        assert_eq!(parcels[2].str_property(PLOT_NUMBER_KEY), Some("N/A"));
    }

    #[tokio::test]
    async fn enrich_bounds_lookups_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (current, max) = (in_flight.clone(), peak.clone());
        let app = Router::new().route(
            "/cadastre/parcelle",
            get(move || {
                let (current, max) = (current.clone(), max.clone());
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Json(json!({ "features": [] }))
                }
            }),
        );
        let base = spawn_upstream(app).await;
        let config = test_config(&base);
        let cadastre = CadastreClient::new(HttpClient::new(&config).unwrap(), &config);

        let mut parcels: Vec<Feature> = (0..12).map(|i| parcel_at(45.0 + i as f64 * 0.01, 1.0)).collect();
        cadastre.enrich(&mut parcels).await;

        assert!(parcels.iter().all(|p| p.str_property(PLOT_NUMBER_KEY) == Some("N/A")));
        assert!(peak.load(Ordering::SeqCst) <= config.cadastre_concurrency);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
