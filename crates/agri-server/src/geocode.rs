//! Address geocoding with a fallback service and an in-process cache.

use crate::cache::{self, CacheEntry};
use crate::config::Config;
use crate::http::{FetchError, HttpClient};
use agri_core::text::normalize_text;
use agri_core::{GeocodeFailure, GeocodeSource, Location};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone)]
struct GeocodeCacheEntry {
    fetched_at: Instant,
    location: Location,
}

impl CacheEntry for GeocodeCacheEntry {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: HttpClient,
    ban_url: String,
    nominatim_url: String,
    fallback_delay: Duration,
    cache: Arc<DashMap<String, GeocodeCacheEntry>>,
    cache_max_entries: usize,
    cache_ttl: Duration,
}

impl Geocoder {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            http,
            ban_url: config.ban_url.clone(),
            nominatim_url: config.nominatim_url.clone(),
            fallback_delay: Duration::from_millis(config.geocode_fallback_delay_ms),
            cache: Arc::new(DashMap::new()),
            cache_max_entries: config.geocode_cache_max_entries.max(1),
            cache_ttl: Duration::from_secs(config.geocode_cache_ttl_s),
        }
    }

    /// Resolve a free-text address.
    ///
    /// The national address base is asked first; on an empty answer, an
    /// error or a point outside the national envelope, Nominatim is asked
    /// after a short courtesy pause.
    pub async fn resolve(&self, address: &str) -> Result<Location, GeocodeFailure> {
        let normalized = normalize_text(address);
        if normalized.is_empty() {
            return Err(GeocodeFailure::EmptyAddress);
        }
        let key = normalized.to_ascii_lowercase();
        if let Some(entry) = cache::fresh(&self.cache, &key, self.cache_ttl) {
            tracing::debug!("Geocode cache hit for '{}'", normalized);
            return Ok(entry.location);
        }

        let mut rejected: Option<(f64, f64)> = None;
        let sources = [GeocodeSource::BanAdresse, GeocodeSource::Nominatim];
        for (index, source) in sources.into_iter().enumerate() {
            if index > 0 && !self.fallback_delay.is_zero() {
                sleep(self.fallback_delay).await;
            }

            let outcome = match source {
                GeocodeSource::Nominatim => self.query_nominatim(&normalized).await,
                _ => self.query_ban(&normalized).await,
            };

            match outcome {
                Ok(Some((lat, lon))) => match Location::new(lat, lon) {
                    Ok(location) => {
                        let location = location.with_address(normalized.clone(), source);
                        self.remember(key, &location);
                        return Ok(location);
                    }
                    Err(err) => {
                        tracing::warn!("Geocoder {:?} result for '{}' rejected: {}", source, normalized, err);
                        rejected.get_or_insert((lat, lon));
                    }
                },
                Ok(None) => tracing::debug!("Geocoder {:?} found nothing for '{}'", source, normalized),
                Err(err) => tracing::warn!("Geocoder {:?} failed for '{}': {}", source, normalized, err),
            }
        }

        match rejected {
            Some((lat, lon)) => Err(GeocodeFailure::OutOfBounds {
                address: normalized,
                lat,
                lon,
            }),
            None => Err(GeocodeFailure::NotFound {
                address: normalized,
            }),
        }
    }

    fn remember(&self, key: String, location: &Location) {
        self.cache.insert(
            key,
            GeocodeCacheEntry {
                fetched_at: Instant::now(),
                location: location.clone(),
            },
        );
        cache::prune_cache(&self.cache, self.cache_max_entries, self.cache_ttl);
    }

    async fn query_ban(&self, address: &str) -> Result<Option<(f64, f64)>, FetchError> {
        let url = format!("{}/search/", self.ban_url);
        let body = self
            .http
            .get_json(&url, &[("q", address.to_string()), ("limit", "1".to_string())])
            .await?;
        let coordinates = body
            .pointer("/features/0/geometry/coordinates")
            .and_then(Value::as_array);
        Ok(coordinates.and_then(|c| {
            let lon = c.first()?.as_f64()?;
            let lat = c.get(1)?.as_f64()?;
            Some((lat, lon))
        }))
    }

    async fn query_nominatim(&self, address: &str) -> Result<Option<(f64, f64)>, FetchError> {
        let url = format!("{}/search", self.nominatim_url);
        let body = self
            .http
            .get_json(
                &url,
                &[
                    ("q", address.to_string()),
                    ("format", "json".to_string()),
                    ("limit", "1".to_string()),
                    ("countrycodes", "fr".to_string()),
                ],
            )
            .await?;
        let Some(first) = body.get(0) else {
            return Ok(None);
        };
        Ok(number(first.get("lat")).zip(number(first.get("lon"))))
    }
}

/// Nominatim sends coordinates as strings.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
