use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{AirQuality, AirQualitySource, GeodataError, Result};
use crate::config::AirQualityConfig;
use crate::models::GeoPoint;

/// OpenWeather air pollution API client
pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: AirPollutionMain,
    #[serde(default)]
    components: AirPollutionComponents,
}

#[derive(Debug, Deserialize)]
struct AirPollutionMain {
    aqi: u8,
}

#[derive(Debug, Default, Deserialize)]
struct AirPollutionComponents {
    pm2_5: Option<f64>,
}

impl AirPollutionResponse {
    fn into_reading(self) -> Option<AirQuality> {
        self.list.into_iter().next().map(|entry| AirQuality {
            aqi: entry.main.aqi,
            pm25: entry.components.pm2_5,
        })
    }
}

impl OpenWeatherClient {
    /// Create a new client
    pub fn new(config: &AirQualityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .user_agent(format!("UrbanSite/{}", crate::VERSION))
            .build()
            .map_err(|e| GeodataError::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        if config.api_key.is_none() {
            info!("No OpenWeather API key configured, air quality will use defaults");
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl AirQualitySource for OpenWeatherClient {
    #[tracing::instrument(name = "air_quality", level = "debug", skip(self))]
    async fn air_quality(&self, point: GeoPoint) -> Result<Option<AirQuality>> {
        let Some(api_key) = &self.api_key else {
            return Err(GeodataError::AuthenticationError(
                "OpenWeather API key not configured".to_string(),
            ));
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("appid", api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| GeodataError::NetworkError(format!("OpenWeather request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                401 => Err(GeodataError::AuthenticationError(
                    "Invalid OpenWeather API key".to_string(),
                )),
                429 => Err(GeodataError::RateLimitError(
                    "OpenWeather API rate limit exceeded".to_string(),
                )),
                _ => Err(GeodataError::ApiError(format!(
                    "OpenWeather API error {status}: {error_text}"
                ))),
            };
        }

        let body: AirPollutionResponse = response.json().await.map_err(|e| {
            GeodataError::ParseError(format!("Failed to parse OpenWeather response: {e}"))
        })?;

        let reading = body.into_reading();
        debug!("Air quality reading: {:?}", reading);
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading() {
        let json = r#"{
            "coord": {"lon": 77.59, "lat": 12.97},
            "list": [{
                "main": {"aqi": 4},
                "components": {"co": 400.5, "pm2_5": 61.2, "pm10": 90.1},
                "dt": 1700000000
            }]
        }"#;
        let response: AirPollutionResponse = serde_json::from_str(json).unwrap();
        let reading = response.into_reading().unwrap();
        assert_eq!(reading.aqi, 4);
        assert_eq!(reading.pm25, Some(61.2));
    }

    #[test]
    fn test_parse_reading_without_pm25() {
        let json = r#"{"list": [{"main": {"aqi": 2}, "components": {}}]}"#;
        let response: AirPollutionResponse = serde_json::from_str(json).unwrap();
        let reading = response.into_reading().unwrap();
        assert_eq!(reading.aqi, 2);
        assert_eq!(reading.pm25, None);
    }

    #[test]
    fn test_empty_list_has_no_reading() {
        let response: AirPollutionResponse = serde_json::from_str(r#"{"list": []}"#).unwrap();
        assert!(response.into_reading().is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let client = OpenWeatherClient::new(&AirQualityConfig::default()).unwrap();
        let result = client.air_quality(GeoPoint::new(0.0, 0.0)).await;
        assert!(matches!(result, Err(GeodataError::AuthenticationError(_))));
    }
}
