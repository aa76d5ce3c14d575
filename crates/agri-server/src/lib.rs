//! AgriWeb report service: upstream clients, report assembly and HTTP API.

pub mod api;
pub mod backoff;
pub mod cache;
pub mod cadastre;
pub mod commune;
pub mod config;
pub mod department;
pub mod geoapi;
pub mod geocode;
pub mod georisques;
pub mod http;
pub mod map;
pub mod solar;
pub mod state;
pub mod wfs;

#[cfg(test)]
pub mod test_support;
