//! WFS spatial query layer.
//!
//! Every call returns a normalized [`FeatureCollection`]; upstream failures
//! degrade to an empty collection for that layer only.

use crate::config::Config;
use crate::http::HttpClient;
use agri_core::{BoundingBox, FeatureCollection, LayerKind};
use futures::future::join_all;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct WfsClient {
    http: HttpClient,
    endpoint: String,
    layer_names: BTreeMap<LayerKind, String>,
}

impl WfsClient {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        let layer_names = LayerKind::ALL
            .into_iter()
            .map(|kind| (kind, config.layer_name(kind).to_string()))
            .collect();
        Self {
            http,
            endpoint: format!("{}/wfs", config.geoserver_url),
            layer_names,
        }
    }

    pub fn layer_name(&self, kind: LayerKind) -> &str {
        self.layer_names
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.as_str())
    }

    /// Fetch one configured layer around a point.
    pub async fn fetch_layer(&self, kind: LayerKind, lat: f64, lon: f64, radius_m: f64) -> FeatureCollection {
        self.fetch_named(self.layer_name(kind), &BoundingBox::around(lat, lon, radius_m))
            .await
    }

    /// Fetch a WFS type name inside `bbox`.
    pub async fn fetch_named(&self, type_name: &str, bbox: &BoundingBox) -> FeatureCollection {
        let query = [
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", type_name.to_string()),
            ("outputFormat", "application/json".to_string()),
            ("srsname", "EPSG:4326".to_string()),
            ("bbox", bbox.to_wfs_param()),
        ];

        match self.http.get_json(&self.endpoint, &query).await {
            Ok(body) => {
                let collection = FeatureCollection::from_json(body, Some(type_name));
                tracing::debug!("WFS {} returned {} features", type_name, collection.len());
                collection
            }
            Err(err) => {
                tracing::warn!("WFS {} failed, using empty layer: {}", type_name, err);
                FeatureCollection::empty(Some(type_name))
            }
        }
    }

    /// Fetch several layers concurrently, each in its own window; results
    /// follow request order.
    pub async fn fetch_layers(&self, requests: &[(LayerKind, BoundingBox)]) -> Vec<(LayerKind, FeatureCollection)> {
        let fetches = requests.iter().map(|(kind, bbox)| async move {
            (*kind, self.fetch_named(self.layer_name(*kind), bbox).await)
        });
        join_all(fetches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_upstream, test_config};
    use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn mock_geoserver(Query(q): Query<HashMap<String, String>>) -> axum::response::Response {
        let type_name = q.get("typeName").cloned().unwrap_or_default();
        match type_name.as_str() {
            "gpu:poste_elec_shapefile" => {
                assert!(q.get("bbox").is_some_and(|b| b.ends_with("EPSG:4326")));
                Json(json!({
                    "type": "FeatureCollection",
                    "features": [{
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": [1.0, 45.0] },
                        "properties": { "nom": "Poste" }
                    }]
                }))
                .into_response()
            }
            "gpu:gpu1" => (
                [(axum::http::header::CONTENT_TYPE, "text/xml")],
                "<ExceptionReport/>",
            )
                .into_response(),
            "gpu:friches-standard" => Json(json!([{ "type": "Feature", "geometry": null, "properties": {} }]))
                .into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    async fn client() -> WfsClient {
        let app = Router::new().route("/geoserver/wfs", get(mock_geoserver));
        let base = spawn_upstream(app).await;
        let config = test_config(&base);
        WfsClient::new(HttpClient::new(&config).unwrap(), &config)
    }

    #[tokio::test]
    async fn feature_collection_passes_through() {
        let wfs = client().await;
        let layer = wfs.fetch_layer(LayerKind::BtSubstations, 45.0, 1.0, 1_000.0).await;
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.layer.as_deref(), Some("gpu:poste_elec_shapefile"));
    }

    #[tokio::test]
    async fn failures_degrade_to_empty_layers() {
        let wfs = client().await;
        let xml = wfs.fetch_layer(LayerKind::Zoning, 45.0, 1.0, 1_000.0).await;
        let server_error = wfs.fetch_layer(LayerKind::Rpg, 45.0, 1.0, 1_000.0).await;
        assert!(xml.is_empty());
        assert!(server_error.is_empty());
        assert_eq!(server_error.layer.as_deref(), Some("gpu:PARCELLES_GRAPHIQUES"));
    }

    #[tokio::test]
    async fn concurrent_fetch_keeps_request_order() {
        let wfs = client().await;
        let window = |radius_m| BoundingBox::around(45.0, 1.0, radius_m);
        let layers = wfs
            .fetch_layers(&[
                (LayerKind::DerelictLand, window(3_000.0)),
                (LayerKind::Zoning, window(3_000.0)),
                (LayerKind::BtSubstations, window(11_000.0)),
            ])
            .await;
        let kinds: Vec<_> = layers.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![LayerKind::DerelictLand, LayerKind::Zoning, LayerKind::BtSubstations]
        );
        let sizes: Vec<_> = layers.iter().map(|(_, layer)| layer.len()).collect();
        assert_eq!(sizes, vec![1, 0, 1]);
    }
}
