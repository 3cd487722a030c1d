//! Location Resolution Module
//!
//! This module handles resolving location inputs (coordinates or place names)
//! into the search origin of a recommendation request.

use tracing::{debug, warn};

use crate::geodata::Geocoder;
use crate::models::{GeoPoint, Location};
use crate::{Result, UrbanSiteError};

/// A search origin as supplied by the user
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Location name (city, neighbourhood, address, ...)
    Name(String),
}

impl LocationInput {
    /// Parse free text. `"lat,lon"` or `"lat lon"` become coordinates,
    /// anything else is a place name.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(UrbanSiteError::validation("Location cannot be empty"));
        }

        if let Some((lat, lon)) = Self::parse_coordinates(input) {
            Self::validate_coordinates(lat, lon)?;
            return Ok(LocationInput::Coordinates(lat, lon));
        }

        Ok(LocationInput::Name(input.to_string()))
    }

    /// Build from request parameters. Explicit coordinates win over a place name.
    pub fn from_query(place: Option<&str>, lat: Option<&str>, lon: Option<&str>) -> Result<Self> {
        fn non_empty(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }

        match (non_empty(lat), non_empty(lon)) {
            (Some(lat), Some(lon)) => {
                let lat = lat
                    .parse::<f64>()
                    .map_err(|_| UrbanSiteError::validation(format!("Invalid latitude: {lat}")))?;
                let lon = lon
                    .parse::<f64>()
                    .map_err(|_| UrbanSiteError::validation(format!("Invalid longitude: {lon}")))?;
                Self::validate_coordinates(lat, lon)?;
                Ok(LocationInput::Coordinates(lat, lon))
            }
            _ => match non_empty(place) {
                Some(place) => Self::parse(place),
                None => Err(UrbanSiteError::validation(
                    "Either 'place' or both 'lat' and 'lon' are required",
                )),
            },
        }
    }

    fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        match parts.as_slice() {
            [lat, lon] => Some((lat.parse().ok()?, lon.parse().ok()?)),
            _ => None,
        }
    }

    fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
        if !GeoPoint::new(lat, lon).is_valid() {
            return Err(UrbanSiteError::validation(format!(
                "Coordinates out of range: {lat}, {lon}"
            )));
        }
        Ok(())
    }
}

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a location input into a structured Location
    pub async fn resolve_location(
        geocoder: &dyn Geocoder,
        location_input: LocationInput,
    ) -> Result<Location> {
        debug!("Resolving location input: {:?}", location_input);

        let location = match location_input {
            LocationInput::Coordinates(lat, lon) => Location::from_coordinates(lat, lon),
            LocationInput::Name(name) => Self::resolve_name(geocoder, name).await?,
        };

        debug!(
            "Resolved location: {} at ({}, {})",
            location.name, location.latitude, location.longitude
        );

        Ok(location)
    }

    /// Resolve a location name to coordinates via geocoding
    async fn resolve_name(geocoder: &dyn Geocoder, name: String) -> Result<Location> {
        debug!("Geocoding location name: {}", name);

        match geocoder.lookup(&name).await {
            Ok(Some(location)) => Ok(location),
            Ok(None) => Err(UrbanSiteError::place_not_found(name)),
            Err(e) => {
                warn!("Geocoding '{}' failed: {}", name, e);
                Err(UrbanSiteError::place_not_found(name))
            }
        }
    }
}
