use axum::{
    body::Body,
    extract::{Path, Query},
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use crate::{
    api,
    state::AppState,
    test_support::{spawn_upstream, test_config},
};

fn square(lon: f64, lat: f64, d: f64) -> Value {
    json!({ "type": "Polygon", "coordinates": [[
        [lon, lat], [lon + d, lat], [lon + d, lat + d], [lon, lat + d], [lon, lat]
    ]]})
}

fn wfs_features(type_name: &str) -> Vec<Value> {
    match type_name {
        "gpu:PARCELLES_GRAPHIQUES" => vec![
            // ~0.8 ha of winter barley next to the BT substation
            json!({ "type": "Feature", "id": "rpg.1", "geometry": square(1.7700, 45.2650, 0.001),
                    "properties": { "ID_PARCEL": "1", "CODE_CULTU": "ORH" } }),
            // ~0.008 ha of maize
            json!({ "type": "Feature", "id": "rpg.2", "geometry": square(1.7750, 45.2600, 0.0001),
                    "properties": { "ID_PARCEL": "2", "CODE_CULTU": "MIS" } }),
        ],
        "gpu:poste_elec_shapefile" => vec![
            json!({ "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.7710, 45.2665] },
                    "properties": { "nom": "Poste Centre" } }),
            json!({ "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.7900, 45.2800] },
                    "properties": { "nom": "Poste Nord" } }),
        ],
        "gpu:etablissements_eleveurs" => vec![
            json!({ "type": "Feature", "geometry": { "type": "Point", "coordinates": [1.7720, 45.2670] },
                    "properties": { "nomUniteLe": "DUPONT", "siret": "12345678900011", "libelleCom": "TULLE" } }),
        ],
        _ => Vec::new(),
    }
}

fn upstream() -> Router {
    Router::new()
        .route(
            "/geoserver/wfs",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let type_name = q.get("typeName").cloned().unwrap_or_default();
                Json(json!({ "type": "FeatureCollection", "features": wfs_features(&type_name) }))
            }),
        )
        .route(
            "/ban/search/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let features = if q.get("q").is_some_and(|q| q.contains("Tulle")) {
                    json!([{ "geometry": { "type": "Point", "coordinates": [1.7708, 45.2658] } }])
                } else {
                    json!([])
                };
                Json(json!({ "features": features }))
            }),
        )
        .route("/nominatim/search", get(|| async { Json(json!([])) }))
        .route(
            "/georisques/*endpoint",
            get(|Path(endpoint): Path<String>| async move {
                if endpoint == "radon" {
                    Json(json!({ "data": [{ "classe_potentiel": "3", "latitude": 45.2658, "longitude": 1.7708 }] }))
                } else {
                    Json(json!({ "data": [] }))
                }
            }),
        )
        .route(
            "/pvgis/PVcalc",
            get(|| async { Json(json!({ "outputs": { "totals": { "fixed": { "E_y": 1234.5 } } } })) }),
        )
        .route(
            "/geo/communes",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if q.get("nom").is_some_and(|n| n == "Tulle") {
                    Json(json!([{ "nom": "Tulle", "code": "19272",
                                  "centre": { "type": "Point", "coordinates": [1.7708, 45.2658] } }]))
                } else {
                    Json(json!([]))
                }
            }),
        )
}

async fn setup_app() -> (Router, Arc<AppState>, tempfile::TempDir) {
    let base = spawn_upstream(upstream()).await;
    let maps = tempfile::tempdir().expect("map dir");
    let mut config = test_config(&base);
    config.map_dir = maps.path().join("cartes");

    let state = Arc::new(AppState::new(config.clone()).expect("state"));
    let app = api::routes(&config).with_state(state.clone());
    (app, state, maps)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn point_report_collects_layers_and_nearest_substations() {
    let (app, _state, _maps) = setup_app().await;

    let res = app
        .clone()
        .oneshot(get_request("/v1/reports/point?lat=45.2658&lon=1.7708"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;

    let parcels = body["layers"]["rpg"]["features"].as_array().unwrap();
    assert_eq!(parcels.len(), 2);
    assert_eq!(parcels[0]["properties"]["culture"], "Orge d'hiver");
    assert!(parcels[0]["properties"]["distance_bt"].as_f64().unwrap() > 0.0);

    let nearest_bt = body["nearest_bt"].as_array().unwrap();
    assert_eq!(nearest_bt.len(), 2);
    assert_eq!(nearest_bt[0]["properties"]["nom"], "Poste Centre");
    assert!(
        nearest_bt[0]["properties"]["distance"].as_f64().unwrap()
            <= nearest_bt[1]["properties"]["distance"].as_f64().unwrap()
    );

    assert_eq!(body["risks"]["categories"].as_object().unwrap().len(), 14);
    assert_eq!(body["risks"]["categories"]["radon"]["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["solar_yield_kwh_per_kwp"], 1234.5);
    assert_eq!(body["layers"]["livestock"]["features"][0]["properties"]["nom"], "DUPONT");
}

#[tokio::test]
async fn filters_apply_after_fetch() {
    let (app, _state, _maps) = setup_app().await;

    let res = app
        .clone()
        .oneshot(get_request(
            "/v1/reports/point?lat=45.2658&lon=1.7708&min_area_ha=0.5&include_livestock=false",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;

    let parcels = body["layers"]["rpg"]["features"].as_array().unwrap();
    assert_eq!(parcels.len(), 1);
    assert_eq!(parcels[0]["properties"]["ID_PARCEL"], "1");
    assert_eq!(body["diagnostics"]["rpg"], json!({ "fetched": 2, "kept": 1 }));
    assert!(body["layers"].get("livestock").is_none());
}

#[tokio::test]
async fn point_report_rejects_bad_input() {
    let (app, _state, _maps) = setup_app().await;

    let missing = app.clone().oneshot(get_request("/v1/reports/point?lat=45.0")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(missing).await["error"].as_str().unwrap().contains("lon"));

    let garbage = app
        .clone()
        .oneshot(get_request("/v1/reports/point?lat=abc&lon=1.0"))
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);

    let abroad = app
        .clone()
        .oneshot(get_request("/v1/reports/point?lat=40.4&lon=-3.7"))
        .await
        .unwrap();
    assert_eq!(abroad.status(), StatusCode::BAD_REQUEST);

    let network = app
        .clone()
        .oneshot(get_request("/v1/reports/point?lat=45.2&lon=1.7&networks=BT,XYZ"))
        .await
        .unwrap();
    assert_eq!(network.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_address_is_structured_not_found() {
    let (app, _state, _maps) = setup_app().await;

    let res = app
        .clone()
        .oneshot(get_request("/v1/reports/address?address=Nulle%20Part"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = read_json(res).await;
    assert_eq!(body["geocode"]["reason"], "not_found");

    let empty = app
        .clone()
        .oneshot(get_request("/v1/reports/address?address=%20"))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn address_report_renders_map_on_request() {
    let (app, state, _maps) = setup_app().await;

    let res = app
        .clone()
        .oneshot(get_request("/v1/reports/address?address=Place%20de%20Tulle&render_map=true"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["location"]["source"], "ban_adresse");

    let map_path = body["map_path"].as_str().unwrap();
    assert!(map_path.starts_with("cartes/carte_place_de_tulle_"));
    let file_name = map_path.trim_start_matches("cartes/");
    assert!(state.maps.dir().join(file_name).exists());
}

#[tokio::test]
async fn commune_report_uses_directory_centre() {
    let (app, _state, _maps) = setup_app().await;

    let res = app
        .clone()
        .oneshot(get_request("/v1/reports/commune?commune=Tulle"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["commune"]["insee_code"], "19272");
    assert_eq!(body["location"]["source"], "commune_centre");

    let missing = app
        .clone()
        .oneshot(get_request("/v1/reports/commune?commune=Atlantide"))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn synthesis_merges_posted_reports() {
    let (app, _state, _maps) = setup_app().await;

    let report = read_json(
        app.clone()
            .oneshot(get_request("/v1/reports/point?lat=45.2658&lon=1.7708"))
            .await
            .unwrap(),
    )
    .await;

    let req = Request::builder()
        .method("POST")
        .uri("/v1/synthesis")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "reports": [report.clone(), report] }).to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["generated_from"], 2);
    assert_eq!(body["total_parcels"], 4);
    assert_eq!(body["distinct_parcels"], 2);
    assert_eq!(body["distinct_establishments"], 1);

    let bad = Request::builder()
        .method("POST")
        .uri("/v1/synthesis")
        .header("content-type", "application/json")
        .body(Body::from("{\"reports\": 3}"))
        .unwrap();
    let res = app.clone().oneshot(bad).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn risks_endpoint_returns_every_category() {
    let (app, _state, _maps) = setup_app().await;

    let res = app
        .clone()
        .oneshot(get_request("/v1/risks?lat=45.2658&lon=1.7708"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let categories = body["categories"].as_object().unwrap();
    assert_eq!(categories.len(), 14);
    assert!(categories.values().all(|slot| slot.get("error").is_none()));
}

#[tokio::test]
async fn purge_requires_admin_token() {
    let (app, state, _maps) = setup_app().await;
    std::fs::create_dir_all(state.maps.dir()).unwrap();
    std::fs::write(state.maps.dir().join("carte_old.html"), "<html></html>").unwrap();

    let anonymous = Request::builder()
        .method("POST")
        .uri("/v1/maps/purge")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .method("POST")
        .uri("/v1/maps/purge")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin = Request::builder()
        .method("POST")
        .uri("/v1/maps/purge")
        .header("authorization", "Bearer test-admin-token")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(admin).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["removed"], 1);
}
