//! Spatial math for query windows, distances and areas.

use geo::{BoundingRect, Centroid, Closest, ClosestPoint, Contains, GeodesicArea, Intersects, Point};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by [`haversine_distance`].
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

// Latitude-aware meter/degree scaling.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lat(ref_lat_deg).max(1e-9)
}

/// Convert an east/west offset in meters to degrees longitude.
/// Requires the reference latitude for proper scaling.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lon(ref_lat_deg).max(1e-9)
}

/// Axis-aligned WGS84 query window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Square window of half-width `radius_m` centred on a point.
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        let radius_m = radius_m.max(0.0);
        let dlat = meters_to_lat(radius_m, lat);
        let dlon = meters_to_lon(radius_m, lat);
        Self {
            min_lon: lon - dlon,
            min_lat: lat - dlat,
            max_lon: lon + dlon,
            max_lat: lat + dlat,
        }
    }

    /// Bounds of a geometry, `None` for empty or non-finite geometries.
    pub fn of_geometry(geometry: &geojson::Geometry) -> Option<Self> {
        if !coordinates_finite(geometry) {
            return None;
        }
        let rect = to_geo(geometry)?.bounding_rect()?;
        Some(Self {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        })
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// `minlon,minlat,maxlon,maxlat,EPSG:4326` as WFS 2.0 expects it.
    pub fn to_wfs_param(&self) -> String {
        format!(
            "{},{},{},{},EPSG:4326",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

fn to_geo(geometry: &geojson::Geometry) -> Option<geo::Geometry<f64>> {
    geometry.try_into().ok()
}

/// Distance in meters from a point to a geometry.
///
/// Polygons containing the point are at distance 0; otherwise the distance
/// is measured to the closest point of the geometry. Returns `None` when the
/// geometry cannot be interpreted.
pub fn distance_to_geometry_m(lat: f64, lon: f64, geometry: &geojson::Geometry) -> Option<f64> {
    if !lat.is_finite() || !lon.is_finite() || !coordinates_finite(geometry) {
        return None;
    }
    let geom = to_geo(geometry)?;
    let point = Point::new(lon, lat);

    let inside = match &geom {
        geo::Geometry::Polygon(polygon) => polygon.contains(&point),
        geo::Geometry::MultiPolygon(polygons) => polygons.contains(&point),
        _ => false,
    };
    if inside {
        return Some(0.0);
    }

    let closest = match geom.closest_point(&point) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => return None,
    };
    let distance = haversine_distance(lat, lon, closest.y(), closest.x());
    distance.is_finite().then_some(distance)
}

/// True when two geometries share at least one point. Uninterpretable
/// geometries never intersect anything.
pub fn geometries_intersect(a: &geojson::Geometry, b: &geojson::Geometry) -> bool {
    if !coordinates_finite(a) || !coordinates_finite(b) {
        return false;
    }
    match (to_geo(a), to_geo(b)) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}

/// Geodesic area of polygonal geometries in square meters.
pub fn geodesic_area_m2(geometry: &geojson::Geometry) -> Option<f64> {
    if !coordinates_finite(geometry) {
        return None;
    }
    match to_geo(geometry)? {
        geo::Geometry::Polygon(polygon) => Some(polygon.geodesic_area_unsigned()),
        geo::Geometry::MultiPolygon(polygons) => Some(polygons.geodesic_area_unsigned()),
        _ => None,
    }
}

/// Centroid as `(lat, lon)`.
pub fn centroid(geometry: &geojson::Geometry) -> Option<(f64, f64)> {
    if !coordinates_finite(geometry) {
        return None;
    }
    let point = to_geo(geometry)?.centroid()?;
    Some((point.y(), point.x()))
}

/// True when every coordinate of the geometry is a finite number.
pub fn coordinates_finite(geometry: &geojson::Geometry) -> bool {
    fn position_ok(position: &[f64]) -> bool {
        position.len() >= 2 && position.iter().all(|c| c.is_finite())
    }
    fn ring_ok(ring: &[Vec<f64>]) -> bool {
        ring.iter().all(|p| position_ok(p))
    }

    match &geometry.value {
        geojson::Value::Point(p) => position_ok(p),
        geojson::Value::MultiPoint(points) | geojson::Value::LineString(points) => ring_ok(points),
        geojson::Value::MultiLineString(rings) | geojson::Value::Polygon(rings) => {
            rings.iter().all(|ring| ring_ok(ring))
        }
        geojson::Value::MultiPolygon(polygons) => polygons
            .iter()
            .all(|rings| rings.iter().all(|ring| ring_ok(ring))),
        geojson::Value::GeometryCollection(geometries) => {
            geometries.iter().all(coordinates_finite)
        }
    }
}

/// Round a distance to centimeters for display and comparisons.
pub fn round_cm(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lat: f64, lon: f64, half: f64) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![lon - half, lat - half],
            vec![lon + half, lat - half],
            vec![lon + half, lat + half],
            vec![lon - half, lat + half],
            vec![lon - half, lat - half],
        ]]))
    }

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(48.8566, 2.3522, 48.8566, 2.3522);
        assert!(dist < 0.001);
    }

    #[test]
    fn bbox_half_width_matches_radius() {
        let bbox = BoundingBox::around(45.0, 1.0, 1_000.0);
        let north = haversine_distance(45.0, 1.0, bbox.max_lat, 1.0);
        let east = haversine_distance(45.0, 1.0, 45.0, bbox.max_lon);
        assert!((north - 1_000.0).abs() < 5.0);
        assert!((east - 1_000.0).abs() < 5.0);
        assert!(bbox.contains(45.0, 1.0));
    }

    #[test]
    fn bbox_wfs_param_order() {
        let bbox = BoundingBox {
            min_lon: 1.0,
            min_lat: 2.0,
            max_lon: 3.0,
            max_lat: 4.0,
        };
        assert_eq!(bbox.to_wfs_param(), "1,2,3,4,EPSG:4326");
    }

    #[test]
    fn bbox_of_polygon_is_its_bounds() {
        let bbox = BoundingBox::of_geometry(&square(45.0, 1.0, 0.01)).unwrap();
        assert!((bbox.min_lat - 44.99).abs() < 1e-9);
        assert!((bbox.max_lon - 1.01).abs() < 1e-9);
        let broken = geojson::Geometry::new(geojson::Value::Point(vec![f64::NAN, 45.0]));
        assert!(BoundingBox::of_geometry(&broken).is_none());
    }

    #[test]
    fn intersection_with_an_area() {
        let area = square(45.0, 1.0, 0.01);
        let overlapping = square(45.0, 1.015, 0.01);
        let outside = geojson::Geometry::new(geojson::Value::Point(vec![1.05, 45.0]));
        assert!(geometries_intersect(&overlapping, &area));
        assert!(!geometries_intersect(&outside, &area));
    }

    #[test]
    fn point_inside_polygon_is_zero() {
        let polygon = square(45.0, 1.0, 0.01);
        assert_eq!(distance_to_geometry_m(45.0, 1.0, &polygon), Some(0.0));
    }

    #[test]
    fn point_outside_polygon_measures_to_edge() {
        let polygon = square(45.0, 1.0, 0.01);
        let distance = distance_to_geometry_m(45.02, 1.0, &polygon).unwrap();
        let expected = haversine_distance(45.02, 1.0, 45.01, 1.0);
        assert!((distance - expected).abs() < 1.0);
    }

    #[test]
    fn point_to_point_uses_haversine() {
        let target = geojson::Geometry::new(geojson::Value::Point(vec![1.01, 45.0]));
        let distance = distance_to_geometry_m(45.0, 1.0, &target).unwrap();
        assert!((distance - haversine_distance(45.0, 1.0, 45.0, 1.01)).abs() < 0.01);
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let broken = geojson::Geometry::new(geojson::Value::Point(vec![f64::NAN, 45.0]));
        assert!(!coordinates_finite(&broken));
        assert_eq!(distance_to_geometry_m(45.0, 1.0, &broken), None);
    }

    #[test]
    fn area_of_one_hectare_square() {
        let half_lat = meters_to_lat(50.0, 45.0);
        let half_lon = meters_to_lon(50.0, 45.0);
        let polygon = geojson::Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![1.0 - half_lon, 45.0 - half_lat],
            vec![1.0 + half_lon, 45.0 - half_lat],
            vec![1.0 + half_lon, 45.0 + half_lat],
            vec![1.0 - half_lon, 45.0 + half_lat],
            vec![1.0 - half_lon, 45.0 - half_lat],
        ]]));
        let area = geodesic_area_m2(&polygon).unwrap();
        assert!((area - 10_000.0).abs() < 100.0, "area was {area}");
    }

    #[test]
    fn centroid_of_square_is_its_centre() {
        let (lat, lon) = centroid(&square(45.0, 1.0, 0.01)).unwrap();
        assert!((lat - 45.0).abs() < 1e-9);
        assert!((lon - 1.0).abs() < 1e-9);
    }
}
