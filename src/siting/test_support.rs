//! In-memory fakes of the geodata services for unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::geodata::{
    AirQuality, AirQualitySource, AreaQuery, GeoElement, GeodataError, GeodataSource, Layer,
    Result,
};
use crate::models::GeoPoint;
use crate::siting::geo::distance_between;

/// Serves fixed elements per layer and records every query it receives
#[derive(Default)]
pub(crate) struct FakeGeodata {
    layers: HashMap<Layer, Vec<GeoElement>>,
    failing: HashSet<Layer>,
    fail_all: bool,
    blocked: Vec<GeoPoint>,
    block_everything: bool,
    queries: Mutex<Vec<AreaQuery>>,
}

impl FakeGeodata {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_layer(mut self, layer: Layer, elements: Vec<GeoElement>) -> Self {
        self.layers.insert(layer, elements);
        self
    }

    pub(crate) fn with_failing_layer(mut self, layer: Layer) -> Self {
        self.failing.insert(layer);
        self
    }

    /// Obstruction checks near `point` report a building
    pub(crate) fn with_blocked_point(mut self, point: GeoPoint) -> Self {
        self.blocked.push(point);
        self
    }

    /// Every obstruction check reports a building
    pub(crate) fn blocking_everything(mut self) -> Self {
        self.block_everything = true;
        self
    }

    /// `count` untagged elements sitting on `centre`
    pub(crate) fn scatter(centre: GeoPoint, count: usize) -> Vec<GeoElement> {
        (0..count as u64).map(|id| GeoElement::at(id, centre)).collect()
    }

    pub(crate) fn queries_for(&self, layer: &Layer) -> Vec<AreaQuery> {
        self.queries
            .lock()
            .map(|queries| queries.iter().filter(|q| &q.layer == layer).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GeodataSource for FakeGeodata {
    async fn query(&self, query: &AreaQuery) -> Result<Vec<GeoElement>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        if self.fail_all || self.failing.contains(&query.layer) {
            return Err(GeodataError::NetworkError("fake outage".to_string()));
        }

        if query.layer == Layer::Obstructions {
            let blocked = self.block_everything
                || self
                    .blocked
                    .iter()
                    .any(|p| distance_between(*p, query.centre) <= f64::from(query.radius_m));
            return Ok(if blocked {
                vec![GeoElement::at(0, query.centre).with_tag("building", "yes")]
            } else {
                Vec::new()
            });
        }

        Ok(self.layers.get(&query.layer).cloned().unwrap_or_default())
    }
}

/// Returns one fixed air quality outcome for every point
pub(crate) struct FakeAir {
    outcome: Option<Option<AirQuality>>,
}

impl FakeAir {
    pub(crate) fn reading(aqi: u8, pm25: Option<f64>) -> Self {
        Self {
            outcome: Some(Some(AirQuality { aqi, pm25 })),
        }
    }

    /// Provider answers without a reading
    pub(crate) fn empty() -> Self {
        Self {
            outcome: Some(None),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { outcome: None }
    }
}

#[async_trait]
impl AirQualitySource for FakeAir {
    async fn air_quality(&self, _point: GeoPoint) -> Result<Option<AirQuality>> {
        self.outcome
            .ok_or_else(|| GeodataError::ApiError("fake outage".to_string()))
    }
}
