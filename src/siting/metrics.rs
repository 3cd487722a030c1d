//! Metric fetchers
//!
//! Each fetcher measures one signal around a candidate point and returns a
//! [`MetricReading`]. Failures never propagate: the caller substitutes the
//! value from the defaults below.
//!
//! | signal              | radius | default                  |
//! |---------------------|--------|--------------------------|
//! | population proxy    | 500 m  | 20 buildings             |
//! | nearest road        | 2000 m | 2000 m                   |
//! | nearest water       | 2000 m | 2000 m, not near         |
//! | green cover         | 500 m  | 10 %                     |
//! | air quality         |        | AQI 3, no PM2.5          |
//! | same-type facility  | 3000 m | 3000 m                   |

use std::sync::Arc;
use tracing::warn;

use crate::geodata::{AirQuality, AirQualitySource, AreaQuery, GeoElement, GeodataSource, Layer};
use crate::models::{GeoPoint, InfraType};

use super::geo::nearest_distance;

pub const POPULATION_RADIUS_M: u32 = 500;
pub const ROAD_RADIUS_M: u32 = 2000;
pub const WATER_RADIUS_M: u32 = 2000;
pub const GREEN_RADIUS_M: u32 = 500;
pub const SAME_INFRA_RADIUS_M: u32 = 3000;

/// A water body closer than this counts as a flood risk
pub const WATER_NEAR_M: f64 = 300.0;

pub const DEFAULT_POPULATION: f64 = 20.0;
pub const DEFAULT_ROAD_DISTANCE_M: f64 = ROAD_RADIUS_M as f64;
pub const DEFAULT_WATER: WaterProximity = WaterProximity {
    distance_m: WATER_RADIUS_M as f64,
    near: false,
};
pub const DEFAULT_GREEN_PCT: f64 = 10.0;
pub const DEFAULT_AIR_QUALITY: AirQuality = AirQuality { aqi: 3, pm25: None };
pub const DEFAULT_SAME_INFRA_DISTANCE_M: f64 = SAME_INFRA_RADIUS_M as f64;

/// Outcome of a single metric fetch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricReading<T> {
    Measured(T),
    Unavailable,
}

impl<T> MetricReading<T> {
    /// The measured value, or `default` (logged) when unavailable
    pub fn or_default(self, default: T, metric: &str, point: GeoPoint) -> T {
        match self {
            MetricReading::Measured(value) => value,
            MetricReading::Unavailable => {
                warn!(
                    metric,
                    lat = point.lat,
                    lon = point.lon,
                    "Metric unavailable, using default"
                );
                default
            }
        }
    }
}

/// Distance to the closest water body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterProximity {
    pub distance_m: f64,
    pub near: bool,
}

/// Green cover percentage from a count of green areas: ten or more areas
/// within the radius saturate at 80 %.
#[must_use]
pub fn green_percentage(area_count: usize) -> f64 {
    (area_count as f64 / 10.0 * 80.0).min(80.0)
}

fn centres(elements: &[GeoElement]) -> impl Iterator<Item = GeoPoint> + '_ {
    elements.iter().filter_map(|element| element.centre)
}

/// Runs the individual metric queries against the injected data sources
#[derive(Clone)]
pub struct MetricFetcher {
    geodata: Arc<dyn GeodataSource>,
    air: Arc<dyn AirQualitySource>,
}

impl MetricFetcher {
    #[must_use]
    pub fn new(geodata: Arc<dyn GeodataSource>, air: Arc<dyn AirQualitySource>) -> Self {
        Self { geodata, air }
    }

    async fn elements(&self, point: GeoPoint, radius_m: u32, layer: Layer) -> Option<Vec<GeoElement>> {
        self.geodata
            .query(&AreaQuery::new(point, radius_m, layer))
            .await
            .ok()
    }

    /// Number of buildings within 500 m
    pub async fn population_proxy(&self, point: GeoPoint) -> MetricReading<f64> {
        match self.elements(point, POPULATION_RADIUS_M, Layer::Buildings).await {
            Some(elements) => MetricReading::Measured(elements.len() as f64),
            None => MetricReading::Unavailable,
        }
    }

    /// Distance to the nearest road centre, capped at 2000 m
    pub async fn nearest_road(&self, point: GeoPoint) -> MetricReading<f64> {
        match self.elements(point, ROAD_RADIUS_M, Layer::Roads).await {
            Some(elements) => MetricReading::Measured(nearest_distance(
                point,
                centres(&elements),
                f64::from(ROAD_RADIUS_M),
            )),
            None => MetricReading::Unavailable,
        }
    }

    /// Distance to the nearest water body, capped at 2000 m
    pub async fn water_proximity(&self, point: GeoPoint) -> MetricReading<WaterProximity> {
        match self.elements(point, WATER_RADIUS_M, Layer::Water).await {
            Some(elements) => {
                let distance_m =
                    nearest_distance(point, centres(&elements), f64::from(WATER_RADIUS_M));
                MetricReading::Measured(WaterProximity {
                    distance_m,
                    near: distance_m <= WATER_NEAR_M,
                })
            }
            None => MetricReading::Unavailable,
        }
    }

    /// Estimated green cover percentage within 500 m
    pub async fn green_cover(&self, point: GeoPoint) -> MetricReading<f64> {
        match self.elements(point, GREEN_RADIUS_M, Layer::GreenCover).await {
            Some(elements) => MetricReading::Measured(green_percentage(elements.len())),
            None => MetricReading::Unavailable,
        }
    }

    /// Current air quality at the point
    pub async fn air_quality(&self, point: GeoPoint) -> MetricReading<AirQuality> {
        match self.air.air_quality(point).await {
            Ok(Some(reading)) => MetricReading::Measured(reading),
            Ok(None) | Err(_) => MetricReading::Unavailable,
        }
    }

    /// Distance to the nearest existing facility of the same type, capped at 3000 m
    pub async fn nearest_same_facility(&self, point: GeoPoint, infra: &InfraType) -> MetricReading<f64> {
        let layer = Layer::Amenity(infra.amenity_tag().to_string());
        match self.elements(point, SAME_INFRA_RADIUS_M, layer).await {
            Some(elements) => MetricReading::Measured(nearest_distance(
                point,
                centres(&elements),
                f64::from(SAME_INFRA_RADIUS_M),
            )),
            None => MetricReading::Unavailable,
        }
    }
}
