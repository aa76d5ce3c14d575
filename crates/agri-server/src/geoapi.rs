//! Commune directory lookups against the Géo API.

use crate::config::Config;
use crate::http::{FetchError, HttpClient};
use agri_core::{CommuneInfo, GeocodeSource, Location};
use serde::Deserialize;
use serde_json::Value;

const COMMUNE_FIELDS: &str = "nom,code,centre,contour,population,surface";

#[derive(Debug, Deserialize)]
struct CommuneRecord {
    nom: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    centre: Option<Value>,
    #[serde(default)]
    contour: Option<Value>,
    #[serde(default)]
    population: Option<u64>,
    #[serde(default)]
    surface: Option<f64>,
}

impl CommuneRecord {
    fn into_info(self) -> CommuneInfo {
        let centre = self
            .centre
            .as_ref()
            .and_then(|c| c.get("coordinates"))
            .and_then(Value::as_array)
            .and_then(|c| Some((c.get(1)?.as_f64()?, c.first()?.as_f64()?)))
            .and_then(|(lat, lon)| Location::new(lat, lon).ok())
            .map(|location| location.with_address(self.nom.clone(), GeocodeSource::CommuneCentre));
        // A contour that does not parse leaves the commune searchable by centre.
        let contour = self
            .contour
            .and_then(|value| serde_json::from_value::<geojson::Geometry>(value).ok());
        CommuneInfo {
            name: self.nom,
            insee_code: self.code,
            population: self.population,
            surface_ha: self.surface,
            centre,
            contour,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommuneDirectory {
    http: HttpClient,
    base_url: String,
}

impl CommuneDirectory {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            base_url: config.geo_api_url.clone(),
        }
    }

    /// Best match for a commune name, most populated first.
    pub async fn lookup(&self, name: &str) -> Result<Option<CommuneInfo>, FetchError> {
        let url = format!("{}/communes", self.base_url);
        let body = self
            .http
            .get_json(
                &url,
                &[
                    ("nom", name.trim().to_string()),
                    ("fields", COMMUNE_FIELDS.to_string()),
                    ("boost", "population".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(parse_records(body).into_iter().next())
    }

    /// Every commune of a department.
    pub async fn department_communes(&self, code: &str) -> Result<Vec<CommuneInfo>, FetchError> {
        let url = format!("{}/departements/{}/communes", self.base_url, code.trim());
        let body = self
            .http
            .get_json(&url, &[("fields", COMMUNE_FIELDS.to_string())])
            .await?;
        Ok(parse_records(body))
    }
}

fn parse_records(body: Value) -> Vec<CommuneInfo> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<CommuneRecord>(item).ok())
            .map(CommuneRecord::into_info)
            .collect(),
        _ => Vec::new(),
    }
}
