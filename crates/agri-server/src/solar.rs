//! Solar yield estimates from PVGIS.

use crate::config::Config;
use crate::http::HttpClient;
use serde_json::Value;

/// Panel setup used for the annual yield estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSetup {
    pub peak_power_kwp: f64,
    pub system_loss_pct: f64,
    pub tilt_deg: f64,
    /// Compass azimuth, 180 = facing south.
    pub azimuth_deg: f64,
}

impl Default for PanelSetup {
    fn default() -> Self {
        Self {
            peak_power_kwp: 1.0,
            system_loss_pct: 14.0,
            tilt_deg: 30.0,
            azimuth_deg: 180.0,
        }
    }
}

impl PanelSetup {
    /// PVGIS measures aspect from south, positive westwards.
    pub fn pvgis_aspect(&self) -> f64 {
        180.0 - self.azimuth_deg
    }
}

#[derive(Debug, Clone)]
pub struct SolarClient {
    http: HttpClient,
    endpoint: String,
}

impl SolarClient {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            endpoint: format!("{}/PVcalc", config.pvgis_url),
        }
    }

    /// Annual production in kWh for the given setup, `None` on any failure.
    pub async fn annual_yield(&self, lat: f64, lon: f64, setup: PanelSetup) -> Option<f64> {
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("peakpower", setup.peak_power_kwp.to_string()),
            ("loss", setup.system_loss_pct.to_string()),
            ("angle", setup.tilt_deg.to_string()),
            ("aspect", setup.pvgis_aspect().to_string()),
            ("outputformat", "json".to_string()),
        ];
        match self.http.get_json(&self.endpoint, &query).await {
            Ok(body) => {
                let value = body
                    .pointer("/outputs/totals/fixed/E_y")
                    .and_then(Value::as_f64);
                if value.is_none() {
                    tracing::warn!("PVGIS response without annual total");
                }
                value
            }
            Err(err) => {
                tracing::warn!("PVGIS request failed: {}", err);
                None
            }
        }
    }
}
