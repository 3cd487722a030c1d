//! Nominatim and Photon geocoding clients

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{GeodataError, Geocoder, Result};
use crate::config::GeocodingConfig;
use crate::models::Location;

/// A search suggestion shown while the user types a place name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
}

fn http_client(config: &GeocodingConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
        .user_agent(format!("UrbanSite/{}", crate::VERSION))
        .build()
        .map_err(|e| GeodataError::NetworkError(format!("Failed to create HTTP client: {e}")))
}

fn status_error(service: &str, status: reqwest::StatusCode, body: String) -> GeodataError {
    match status.as_u16() {
        429 => GeodataError::RateLimitError(format!("{service} rate limit exceeded")),
        _ => GeodataError::ApiError(format!("{service} error {status}: {body}")),
    }
}

/// Region hint in lower case, if one is configured
fn normalized_hint(config: &GeocodingConfig) -> Option<String> {
    config
        .region_hint
        .as_ref()
        .map(|hint| hint.trim().to_lowercase())
        .filter(|hint| !hint.is_empty())
}

/// Nominatim search result
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: HashMap<String, String>,
}

impl NominatimPlace {
    fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.lat.parse::<f64>().ok()?;
        let lon = self.lon.parse::<f64>().ok()?;
        Some((lat, lon))
    }

    fn mentions(&self, hint: &str) -> bool {
        self.display_name.to_lowercase().contains(hint)
            || ["city", "county", "state", "state_district"]
                .iter()
                .filter_map(|key| self.address.get(*key))
                .any(|value| value.to_lowercase().contains(hint))
    }
}

/// Nominatim (OpenStreetMap) geocoding client
pub struct NominatimClient {
    client: Client,
    base_url: String,
    country_codes: Option<String>,
    region_hint: Option<String>,
    retry_region: Option<String>,
}

impl NominatimClient {
    /// Create a new client
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
            country_codes: config.country_codes.clone(),
            region_hint: normalized_hint(config),
            retry_region: config
                .retry_region
                .as_ref()
                .map(|region| region.trim().to_string())
                .filter(|region| !region.is_empty()),
        })
    }

    /// Parameters of the first, region-restricted suggestion search
    fn suggest_params(&self, query: &str, limit: usize) -> Vec<(&'static str, String)> {
        let search_text = match &self.region_hint {
            Some(hint) if !query.to_lowercase().contains(hint.as_str()) => {
                format!("{query}, {hint}")
            }
            _ => query.to_string(),
        };

        let mut params = vec![
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", (limit * 3).to_string()),
            ("q", search_text),
        ];
        if let Some(codes) = &self.country_codes {
            params.push(("countrycodes", codes.clone()));
        }
        params
    }

    /// Parameters of the looser retry: no country filter, wider region text.
    /// `None` without a region hint.
    fn retry_params(&self, query: &str, limit: usize) -> Option<Vec<(&'static str, String)>> {
        let hint = self.region_hint.as_deref()?;
        let region = self.retry_region.as_deref().unwrap_or(hint);
        Some(vec![
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", limit.to_string()),
            ("q", format!("{query}, {region}")),
        ])
    }

    fn to_suggestions(&self, places: Vec<NominatimPlace>) -> Vec<PlaceSuggestion> {
        places
            .into_iter()
            .filter(|place| {
                self.region_hint
                    .as_deref()
                    .is_none_or(|hint| place.mentions(hint))
            })
            .filter_map(|place| {
                place.coordinates().map(|(lat, lon)| PlaceSuggestion {
                    display_name: place.display_name.clone(),
                    lat,
                    lon,
                })
            })
            .collect()
    }

    async fn search(&self, params: &[(&str, String)]) -> Result<Vec<NominatimPlace>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| GeodataError::NetworkError(format!("Nominatim request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error("Nominatim", status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| GeodataError::ParseError(format!("Failed to parse Nominatim response: {e}")))
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[tracing::instrument(name = "nominatim_lookup", level = "debug", skip(self))]
    async fn lookup(&self, name: &str) -> Result<Option<Location>> {
        let places = self
            .search(&[
                ("format", "jsonv2".to_string()),
                ("limit", "1".to_string()),
                ("q", name.to_string()),
            ])
            .await?;

        let location = places.into_iter().find_map(|place| {
            place
                .coordinates()
                .map(|(lat, lon)| Location::new(lat, lon, place.display_name.clone()))
        });
        debug!("Lookup of '{}' resolved to {:?}", name, location);
        Ok(location)
    }

    #[tracing::instrument(name = "nominatim_suggest", level = "debug", skip(self))]
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<PlaceSuggestion>> {
        let places = self.search(&self.suggest_params(query, limit)).await?;
        let suggestions = self.to_suggestions(places);
        if !suggestions.is_empty() {
            return Ok(suggestions);
        }

        let Some(params) = self.retry_params(query, limit) else {
            return Ok(suggestions);
        };
        debug!("No suggestions for '{}', retrying with a looser search", query);
        let places = self.search(&params).await?;
        Ok(self.to_suggestions(places))
    }
}

/// Photon GeoJSON response
#[derive(Debug, Deserialize)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    #[serde(default)]
    properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PhotonGeometry {
    /// GeoJSON order: longitude, latitude
    coordinates: Vec<f64>,
}

impl PhotonFeature {
    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(serde_json::Value::as_str)
    }

    fn mentions(&self, hint: &str) -> bool {
        ["name", "city", "county", "state"]
            .iter()
            .filter_map(|key| self.property(key))
            .any(|value| value.to_lowercase().contains(hint))
    }

    fn into_suggestion(self) -> Option<PlaceSuggestion> {
        let (lon, lat) = match self.geometry.coordinates.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => return None,
        };
        let mut display_name = self.property("name")?.to_string();
        for key in ["street", "city"] {
            if let Some(value) = self.property(key) {
                display_name.push_str(", ");
                display_name.push_str(value);
            }
        }
        Some(PlaceSuggestion {
            display_name,
            lat,
            lon,
        })
    }
}

/// Photon (komoot) search client, used as the autocomplete fallback
pub struct PhotonClient {
    client: Client,
    base_url: String,
    region_hint: Option<String>,
}

impl PhotonClient {
    /// Create a new client
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.photon_url.clone(),
            region_hint: normalized_hint(config),
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PhotonFeature>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| GeodataError::NetworkError(format!("Photon request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error("Photon", status, error_text));
        }

        let body: PhotonResponse = response
            .json()
            .await
            .map_err(|e| GeodataError::ParseError(format!("Failed to parse Photon response: {e}")))?;
        Ok(body.features)
    }
}

#[async_trait]
impl Geocoder for PhotonClient {
    #[tracing::instrument(name = "photon_lookup", level = "debug", skip(self))]
    async fn lookup(&self, name: &str) -> Result<Option<Location>> {
        let features = self.search(name, 1).await?;
        Ok(features
            .into_iter()
            .find_map(PhotonFeature::into_suggestion)
            .map(|s| Location::new(s.lat, s.lon, s.display_name)))
    }

    #[tracing::instrument(name = "photon_suggest", level = "debug", skip(self))]
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<PlaceSuggestion>> {
        let search_text = match &self.region_hint {
            Some(hint) if !query.to_lowercase().contains(hint.as_str()) => {
                format!("{query} {hint}")
            }
            _ => query.to_string(),
        };

        let features = self.search(&search_text, 20).await?;
        Ok(features
            .into_iter()
            .filter(|feature| {
                self.region_hint
                    .as_deref()
                    .is_none_or(|hint| feature.mentions(hint))
            })
            .filter_map(PhotonFeature::into_suggestion)
            .take(limit.max(1) * 3)
            .collect())
    }
}
