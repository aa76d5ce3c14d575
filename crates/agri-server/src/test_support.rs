//! In-process upstream stand-ins for tests.

use crate::config::Config;
use axum::Router;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Configuration with every upstream rooted under `base` and fast retries.
pub fn test_config(base: &str) -> Config {
    let mut config = Config::from_env();
    config.geoserver_url = format!("{base}/geoserver");
    config.georisques_url = format!("{base}/georisques");
    config.ban_url = format!("{base}/ban");
    config.nominatim_url = format!("{base}/nominatim");
    config.pvgis_url = format!("{base}/pvgis");
    config.geo_api_url = format!("{base}/geo");
    config.cadastre_api_url = format!("{base}/cadastre");
    config.http_timeout_ms = 2_000;
    config.http_max_retries = 2;
    config.http_backoff_base_ms = 1;
    config.http_backoff_max_ms = 5;
    config.geocode_fallback_delay_ms = 0;
    config.department_concurrency = 2;
    config.cadastre_concurrency = 2;
    config.map_dir = std::env::temp_dir().join(format!("agri-maps-{}", uuid::Uuid::new_v4()));
    config.admin_token = Some("test-admin-token".to_string());
    config
}
