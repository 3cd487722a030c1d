use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AreaQuery, GeoElement, GeodataError, GeodataSource, Layer, Result};
use crate::config::OverpassConfig;
use crate::models::GeoPoint;

/// Overpass API client
pub struct OverpassClient {
    client: Client,
    base_url: String,
}

/// Overpass API response element
#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    center: Option<OverpassCenter>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

/// Overpass API response
#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

impl From<OverpassElement> for GeoElement {
    fn from(element: OverpassElement) -> Self {
        let centre = match (element.center, element.lat, element.lon) {
            (Some(center), _, _) => Some(GeoPoint::new(center.lat, center.lon)),
            (None, Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        GeoElement {
            id: element.id,
            centre,
            tags: element.tags,
        }
    }
}

/// Server-side and client-side timeouts for a layer, in seconds
fn layer_timeouts(layer: &Layer) -> (u32, u64) {
    match layer {
        Layer::EmptyLand => (20, 60),
        Layer::Obstructions => (3, 4),
        Layer::Buildings => (15, 30),
        Layer::Roads => (15, 20),
        Layer::Water => (20, 20),
        Layer::GreenCover => (20, 20),
        Layer::Amenity(_) => (15, 25),
    }
}

/// Quote a tag value for use inside an Overpass QL filter
fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Render an area query as Overpass QL
fn build_query(query: &AreaQuery) -> String {
    let (ql_timeout, _) = layer_timeouts(&query.layer);
    let around = format!(
        "(around:{},{},{})",
        query.radius_m, query.centre.lat, query.centre.lon
    );

    let (statements, output) = match &query.layer {
        Layer::EmptyLand => (
            vec![
                format!("way{around}[\"landuse\"~\"brownfield|greenfield|farmland|grass|meadow\"];"),
                format!("way{around}[\"natural\"~\"scrub|heath\"];"),
            ],
            "out center;",
        ),
        Layer::Obstructions => (
            vec![
                format!("way{around}[\"building\"];"),
                format!("way{around}[\"highway\"];"),
            ],
            "out ids;",
        ),
        Layer::Buildings => (
            vec![
                format!("way{around}[\"building\"];"),
                format!("node{around}[\"building\"];"),
            ],
            "out ids;",
        ),
        Layer::Roads => (vec![format!("way{around}[\"highway\"];")], "out center;"),
        Layer::Water => (
            vec![
                format!("way{around}[\"natural\"=\"water\"];"),
                format!("way{around}[\"water\"];"),
                format!("relation{around}[\"water\"];"),
            ],
            "out center;",
        ),
        Layer::GreenCover => (
            vec![
                format!("way{around}[\"landuse\"~\"forest|meadow|grass\"];"),
                format!("way{around}[\"leisure\"~\"park|garden\"];"),
            ],
            "out ids;",
        ),
        Layer::Amenity(value) => {
            let value = quote_value(value);
            (
                vec![
                    format!("node{around}[\"amenity\"={value}];"),
                    format!("way{around}[\"amenity\"={value}];"),
                    format!("relation{around}[\"amenity\"={value}];"),
                ],
                "out center;",
            )
        }
    };

    format!(
        "[out:json][timeout:{ql_timeout}];({});{output}",
        statements.join("")
    )
}

impl OverpassClient {
    /// Create a new client
    pub fn new(config: &OverpassConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeodataError::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Execute a raw Overpass QL query
    async fn execute(&self, ql: String, timeout: Duration) -> Result<Vec<GeoElement>> {
        let response = self
            .client
            .post(&self.base_url)
            .timeout(timeout)
            .form(&[("data", ql)])
            .send()
            .await
            .map_err(|e| GeodataError::NetworkError(format!("Overpass request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                429 => Err(GeodataError::RateLimitError(
                    "Overpass API rate limit exceeded".to_string(),
                )),
                _ => Err(GeodataError::ApiError(format!(
                    "Overpass API error {status}: {error_text}"
                ))),
            };
        }

        let overpass_response: OverpassResponse = response.json().await.map_err(|e| {
            GeodataError::ParseError(format!("Failed to parse Overpass response: {e}"))
        })?;

        Ok(overpass_response
            .elements
            .into_iter()
            .map(GeoElement::from)
            .collect())
    }
}

#[async_trait]
impl GeodataSource for OverpassClient {
    #[tracing::instrument(
        name = "overpass_query",
        level = "debug",
        skip(self, query),
        fields(layer = %query.layer.name(), radius_m = query.radius_m)
    )]
    async fn query(&self, query: &AreaQuery) -> Result<Vec<GeoElement>> {
        let (_, http_timeout) = layer_timeouts(&query.layer);
        let ql = build_query(query);

        match self.execute(ql, Duration::from_secs(http_timeout)).await {
            Ok(elements) => {
                debug!("Overpass returned {} elements", elements.len());
                Ok(elements)
            }
            Err(e) => {
                warn!("Overpass query failed: {}", e);
                Err(e)
            }
        }
    }
}
