//! Spherical distance helpers

use crate::models::GeoPoint;

/// Meters per degree of longitude used when offsetting points
pub const METERS_PER_DEGREE_LON: f64 = 111_320.0;

/// Meters per degree of latitude used when offsetting points
pub const METERS_PER_DEGREE_LAT: f64 = 110_540.0;

/// Great-circle (haversine) distance in meters
#[must_use]
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: lat1,
            longitude: lon1,
        },
        haversine::Location {
            latitude: lat2,
            longitude: lon2,
        },
        haversine::Units::Kilometers,
    ) * 1000.0
}

/// Distance between two points in meters
#[must_use]
pub fn distance_between(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_m(a.lat, a.lon, b.lat, b.lon)
}

/// Move `origin` by `distance_m` along `bearing_rad` (0 = east, counter-clockwise)
/// using the flat degree scales above.
#[must_use]
pub fn offset_point(origin: GeoPoint, bearing_rad: f64, distance_m: f64) -> GeoPoint {
    let dlon = distance_m / METERS_PER_DEGREE_LON * bearing_rad.cos();
    let dlat = distance_m / METERS_PER_DEGREE_LAT * bearing_rad.sin();
    GeoPoint::new(origin.lat + dlat, origin.lon + dlon)
}

/// Smallest distance from `origin` to any of `points`, starting from `ceiling`
#[must_use]
pub fn nearest_distance<I>(origin: GeoPoint, points: I, ceiling: f64) -> f64
where
    I: IntoIterator<Item = GeoPoint>,
{
    points
        .into_iter()
        .map(|point| distance_between(origin, point))
        .fold(ceiling, f64::min)
}
