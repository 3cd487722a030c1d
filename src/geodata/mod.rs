//! Geodata module
//!
//! Interfaces to the open geodata services the siting pipeline depends on:
//! - Area queries against OpenStreetMap data (Overpass)
//! - Air quality readings (OpenWeather)
//! - Place name geocoding and search suggestions (Nominatim, Photon)
//!
//! The pipeline only sees the traits defined here, so every service can be
//! replaced by an in-memory fake in tests.

pub mod error;
pub mod geocoding;
pub mod openweather;
pub mod overpass;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{GeoPoint, Location};

pub use error::{GeodataError, Result};
pub use geocoding::{NominatimClient, PhotonClient, PlaceSuggestion};
pub use openweather::OpenWeatherClient;
pub use overpass::OverpassClient;

/// Thematic layer of map features an area query selects
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Open land (brownfield, greenfield, farmland, grass, meadow, scrub, heath)
    EmptyLand,
    /// Buildings and roads that make a point unusable
    Obstructions,
    /// Buildings as ways and nodes
    Buildings,
    /// Highways of any class
    Roads,
    /// Lakes, rivers and other water bodies
    Water,
    /// Forest, meadow and grass landuse plus parks and gardens
    GreenCover,
    /// Existing facilities tagged `amenity=<value>`
    Amenity(String),
}

impl Layer {
    /// Short name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Layer::EmptyLand => "empty_land",
            Layer::Obstructions => "obstructions",
            Layer::Buildings => "buildings",
            Layer::Roads => "roads",
            Layer::Water => "water",
            Layer::GreenCover => "green_cover",
            Layer::Amenity(value) => value,
        }
    }
}

/// A circular area query for one layer
#[derive(Debug, Clone, PartialEq)]
pub struct AreaQuery {
    pub centre: GeoPoint,
    pub radius_m: u32,
    pub layer: Layer,
}

impl AreaQuery {
    #[must_use]
    pub fn new(centre: GeoPoint, radius_m: u32, layer: Layer) -> Self {
        Self {
            centre,
            radius_m,
            layer,
        }
    }
}

/// One map feature returned by an area query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoElement {
    pub id: u64,
    /// Representative point: node position or way/relation centre
    pub centre: Option<GeoPoint>,
    pub tags: HashMap<String, String>,
}

impl GeoElement {
    #[must_use]
    pub fn at(id: u64, centre: GeoPoint) -> Self {
        Self {
            id,
            centre: Some(centre),
            tags: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }
}

/// Air quality reading at a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// Ordinal index, 1 (good) to 5 (very poor)
    pub aqi: u8,
    /// PM2.5 concentration in µg/m³
    pub pm25: Option<f64>,
}

/// Source of map features
#[async_trait]
pub trait GeodataSource: Send + Sync {
    async fn query(&self, query: &AreaQuery) -> Result<Vec<GeoElement>>;
}

/// Source of air quality readings. `Ok(None)` means the provider answered
/// but had no reading for the point.
#[async_trait]
pub trait AirQualitySource: Send + Sync {
    async fn air_quality(&self, point: GeoPoint) -> Result<Option<AirQuality>>;
}

/// Forward geocoding of place names
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for a place name, `None` when nothing matches
    async fn lookup(&self, name: &str) -> Result<Option<Location>>;

    /// Up to `limit` candidate places for a partial name
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<PlaceSuggestion>>;
}
