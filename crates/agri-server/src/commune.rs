//! Commune report builder.
//!
//! Resolves where to look, fetches every layer, the risk registry and the
//! solar estimate concurrently, then annotates and filters what came back.

use crate::config::Config;
use crate::geoapi::CommuneDirectory;
use crate::geocode::Geocoder;
use crate::georisques::RiskAggregator;
use crate::http::HttpClient;
use crate::solar::{PanelSetup, SolarClient};
use crate::wfs::WfsClient;
use agri_core::livestock::describe_establishment;
use agri_core::rpg::annotate_parcel;
use agri_core::spatial::geometries_intersect;
use agri_core::{
    nearest, BoundingBox, CommuneInfo, CommuneReport, CoreError, DistanceKeys, Feature,
    FeatureCollection, GeocodeFailure, LayerKind, Location, ReportFilters,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// What a report is built around.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportTarget {
    Point { lat: f64, lon: f64 },
    Address(String),
    Commune(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Geocode(#[from] GeocodeFailure),
    #[error(transparent)]
    Location(#[from] CoreError),
    #[error("commune '{0}' not found")]
    CommuneNotFound(String),
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    geocoder: Geocoder,
    wfs: WfsClient,
    risks: RiskAggregator,
    solar: SolarClient,
    directory: CommuneDirectory,
    nearest_count: usize,
    distance_sentinel_m: f64,
    commune_radius_m: f64,
}

impl ReportBuilder {
    pub fn new(http: HttpClient, config: &Config) -> Self {
        Self {
            geocoder: Geocoder::new(http.clone(), config),
            wfs: WfsClient::new(http.clone(), config),
            risks: RiskAggregator::new(http.clone(), config),
            solar: SolarClient::new(http.clone(), config),
            directory: CommuneDirectory::new(http, config),
            nearest_count: config.nearest_count.max(1),
            distance_sentinel_m: config.distance_sentinel_m,
            commune_radius_m: config.commune_radius_m,
        }
    }

    pub fn directory(&self) -> &CommuneDirectory {
        &self.directory
    }

    pub fn risks(&self) -> &RiskAggregator {
        &self.risks
    }

    pub async fn build(
        &self,
        target: ReportTarget,
        filters: &ReportFilters,
    ) -> Result<CommuneReport, ReportError> {
        let (location, commune) = self.locate(target).await?;
        Ok(self.build_at(location, commune, filters).await)
    }

    /// Report for a directory entry; `None` when the entry has no centre.
    pub async fn build_for_commune(
        &self,
        info: CommuneInfo,
        filters: &ReportFilters,
    ) -> Option<CommuneReport> {
        let location = info.centre.clone()?;
        Some(self.build_at(location, Some(info), filters).await)
    }

    async fn locate(
        &self,
        target: ReportTarget,
    ) -> Result<(Location, Option<CommuneInfo>), ReportError> {
        match target {
            ReportTarget::Point { lat, lon } => Ok((Location::new(lat, lon)?, None)),
            ReportTarget::Address(address) => Ok((self.geocoder.resolve(&address).await?, None)),
            ReportTarget::Commune(name) => match self.directory.lookup(&name).await {
                Ok(Some(info)) => {
                    let location = match info.centre.clone() {
                        Some(centre) => centre,
                        None => self.geocoder.resolve(&info.name).await?,
                    };
                    Ok((location, Some(info)))
                }
                Ok(None) => Err(ReportError::CommuneNotFound(name)),
                Err(err) => {
                    tracing::warn!("Commune directory unavailable for '{}': {}", name, err);
                    Ok((self.geocoder.resolve(&name).await?, None))
                }
            },
        }
    }

    fn radius_for(&self, kind: LayerKind, commune_scope: bool) -> f64 {
        match kind {
            LayerKind::Rpg | LayerKind::Livestock if commune_scope => self.commune_radius_m,
            _ => kind.default_radius_m(),
        }
    }

    /// Query window per layer. Commune-scoped layers cover the commune
    /// outline when one is known.
    fn windows(
        &self,
        location: &Location,
        commune: Option<&CommuneInfo>,
        filters: &ReportFilters,
    ) -> Vec<(LayerKind, BoundingBox)> {
        let outline = commune
            .and_then(|info| info.contour.as_ref())
            .and_then(BoundingBox::of_geometry);
        LayerKind::ALL
            .into_iter()
            .filter(|kind| filters.include_livestock || *kind != LayerKind::Livestock)
            .map(|kind| {
                let bbox = match outline {
                    Some(outline) if clipped_to_commune(kind) => outline,
                    _ => BoundingBox::around(
                        location.lat,
                        location.lon,
                        self.radius_for(kind, commune.is_some()),
                    ),
                };
                (kind, bbox)
            })
            .collect()
    }

    async fn build_at(
        &self,
        location: Location,
        commune: Option<CommuneInfo>,
        filters: &ReportFilters,
    ) -> CommuneReport {
        let (lat, lon) = (location.lat, location.lon);
        let requests = self.windows(&location, commune.as_ref(), filters);

        let (layers, risks, solar) = tokio::join!(
            self.wfs.fetch_layers(&requests),
            self.risks.aggregate(lat, lon),
            self.solar.annual_yield(lat, lon, PanelSetup::default()),
        );
        let contour = commune.as_ref().and_then(|info| info.contour.as_ref());
        let layers: BTreeMap<LayerKind, FeatureCollection> = layers
            .into_iter()
            .map(|(kind, collection)| match contour {
                Some(area) if clipped_to_commune(kind) => (kind, clip_to(collection, area)),
                _ => (kind, collection),
            })
            .collect();

        let substations = |kind: LayerKind| -> Vec<Feature> {
            layers
                .get(&kind)
                .map(|collection| collection.features.clone())
                .unwrap_or_default()
        };
        let bt = substations(LayerKind::BtSubstations);
        let hta = substations(LayerKind::HtaSubstations);

        let mut report = CommuneReport::new(location);
        report.commune = commune;
        report.risks = risks;
        report.solar_yield_kwh_per_kwp = solar;

        let legacy_keys = DistanceKeys::default();
        report.nearest_bt = nearest(&bt, lat, lon, self.nearest_count, &legacy_keys, self.distance_sentinel_m);
        report.nearest_hta = nearest(&hta, lat, lon, self.nearest_count, &legacy_keys, self.distance_sentinel_m);

        for (kind, collection) in layers {
            let fetched = collection.len();
            let FeatureCollection { layer, features, .. } = collection;
            let kept = match kind {
                LayerKind::Rpg => filters.filter_parcels(
                    features
                        .iter()
                        .map(|parcel| annotate_parcel(parcel, &bt, &hta))
                        .collect(),
                ),
                LayerKind::Parkings => filters.filter_parkings(features),
                LayerKind::DerelictLand => filters.filter_derelict_land(features),
                LayerKind::Zoning => filters.filter_zones(features),
                LayerKind::Livestock => features.iter().map(describe_establishment).collect(),
                LayerKind::GridCapacity => nearest(
                    &features,
                    lat,
                    lon,
                    features.len(),
                    &legacy_keys,
                    self.distance_sentinel_m,
                ),
                _ => features,
            };
            report.set_layer(kind, fetched, FeatureCollection::new(layer.as_deref(), kept));
        }

        tracing::info!(
            "Report at ({:.5}, {:.5}): {} parcels kept, {} risk records, {} failed risk categories",
            lat,
            lon,
            report.features(LayerKind::Rpg).len(),
            report.risks.total_count(),
            report.risks.failed_categories().len()
        );
        report
    }
}

/// Layers whose features must lie in the commune when its outline is known.
fn clipped_to_commune(kind: LayerKind) -> bool {
    matches!(kind, LayerKind::Rpg | LayerKind::Livestock | LayerKind::GridCapacity)
}

/// Keep features intersecting `area`. Features without geometry are dropped.
fn clip_to(collection: FeatureCollection, area: &geojson::Geometry) -> FeatureCollection {
    let FeatureCollection { layer, features, .. } = collection;
    let inside: Vec<Feature> = features
        .into_iter()
        .filter(|feature| {
            feature
                .geometry
                .as_ref()
                .is_some_and(|geometry| geometries_intersect(geometry, area))
        })
        .collect();
    FeatureCollection::new(layer.as_deref(), inside)
}
