//! Server configuration from environment.

use agri_core::{LayerKind, DEFAULT_DISTANCE_SENTINEL_M, DEFAULT_TOP_N};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,

    pub geoserver_url: String,
    pub georisques_url: String,
    pub ban_url: String,
    pub nominatim_url: String,
    pub pvgis_url: String,
    pub geo_api_url: String,
    pub cadastre_api_url: String,
    pub user_agent: String,
    /// WFS type name per layer.
    pub layer_names: BTreeMap<LayerKind, String>,

    pub http_timeout_ms: u64,
    pub http_max_retries: u32,
    pub http_backoff_base_ms: u64,
    pub http_backoff_max_ms: u64,

    pub geocode_fallback_delay_ms: u64,
    pub geocode_cache_max_entries: usize,
    pub geocode_cache_ttl_s: u64,

    pub nearest_count: usize,
    pub distance_sentinel_m: f64,
    pub top_n: usize,
    /// Query half-width for RPG and livestock layers in commune reports.
    pub commune_radius_m: f64,
    pub department_concurrency: usize,
    /// Plot lookups in flight at once during cadastre enrichment.
    pub cadastre_concurrency: usize,

    pub map_dir: PathBuf,
    pub map_url_prefix: String,
    pub admin_token: Option<String>,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Published GeoServer type names.
pub fn default_layer_name(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Cadastre => "gpu:prefixes_sections",
        LayerKind::Rpg => "gpu:PARCELLES_GRAPHIQUES",
        LayerKind::BtSubstations => "gpu:poste_elec_shapefile",
        LayerKind::HtaSubstations => "gpu:postes-electriques-rte",
        LayerKind::Zoning => "gpu:gpu1",
        LayerKind::Parkings => "gpu:parkings_sup500m2",
        LayerKind::DerelictLand => "gpu:friches-standard",
        LayerKind::SolarPotential => "gpu:POTENTIEL_SOLAIRE_FRICHE_BDD_PSF_LAMB93",
        LayerKind::Livestock => "gpu:etablissements_eleveurs",
        LayerKind::GridCapacity => "gpu:CapacitesDAccueil",
        LayerKind::AccelerationZones => "gpu:ZAER_ARRETE_SHP_FRA",
    }
}

impl Config {
    pub fn from_env() -> Self {
        let layer_names = LayerKind::ALL
            .into_iter()
            .map(|kind| {
                let key = format!("AGRI_LAYER_{}", kind.as_str().to_ascii_uppercase());
                (kind, env_string(&key, default_layer_name(kind)))
            })
            .collect();

        Self {
            server_port: env_parse("AGRI_PORT", 5000),

            geoserver_url: env_string("AGRI_GEOSERVER_URL", "http://localhost:8080/geoserver"),
            georisques_url: env_string(
                "AGRI_GEORISQUES_URL",
                "https://www.georisques.gouv.fr/api/v1",
            ),
            ban_url: env_string("AGRI_BAN_URL", "https://api-adresse.data.gouv.fr"),
            nominatim_url: env_string(
                "AGRI_NOMINATIM_URL",
                "https://nominatim.openstreetmap.org",
            ),
            pvgis_url: env_string("AGRI_PVGIS_URL", "https://re.jrc.ec.europa.eu/api/v5_2"),
            geo_api_url: env_string("AGRI_GEO_API_URL", "https://geo.api.gouv.fr"),
            cadastre_api_url: env_string(
                "AGRI_CADASTRE_API_URL",
                "https://apicarto.ign.fr/api/cadastre",
            ),
            user_agent: env_string("AGRI_USER_AGENT", "agriweb/0.2"),
            layer_names,

            http_timeout_ms: env_parse("AGRI_HTTP_TIMEOUT_MS", 8_000),
            http_max_retries: env_parse("AGRI_HTTP_MAX_RETRIES", 3),
            http_backoff_base_ms: env_parse("AGRI_HTTP_BACKOFF_BASE_MS", 500),
            http_backoff_max_ms: env_parse("AGRI_HTTP_BACKOFF_MAX_MS", 8_000),

            geocode_fallback_delay_ms: env_parse("AGRI_GEOCODE_FALLBACK_DELAY_MS", 1_000),
            geocode_cache_max_entries: env_parse("AGRI_GEOCODE_CACHE_MAX_ENTRIES", 1_024),
            geocode_cache_ttl_s: env_parse("AGRI_GEOCODE_CACHE_TTL_S", 86_400),

            nearest_count: env_parse("AGRI_NEAREST_COUNT", 3),
            distance_sentinel_m: env_parse("AGRI_DISTANCE_SENTINEL_M", DEFAULT_DISTANCE_SENTINEL_M),
            top_n: env_parse("AGRI_TOP_N", DEFAULT_TOP_N),
            commune_radius_m: env_parse("AGRI_COMMUNE_RADIUS_M", 5_000.0),
            department_concurrency: env_parse("AGRI_DEPARTMENT_CONCURRENCY", 4),
            cadastre_concurrency: env_parse("AGRI_CADASTRE_CONCURRENCY", 4),

            map_dir: PathBuf::from(env_string("AGRI_MAP_DIR", "static/cartes")),
            map_url_prefix: env_string("AGRI_MAP_URL_PREFIX", "cartes"),
            admin_token: env::var("AGRI_ADMIN_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn layer_name(&self, kind: LayerKind) -> &str {
        self.layer_names
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_layer_name(kind))
    }
}
