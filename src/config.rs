//! Configuration management for the `UrbanSite` service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::UrbanSiteError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `UrbanSite` service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrbanSiteConfig {
    /// Overpass (OpenStreetMap) endpoint settings
    #[serde(default)]
    pub overpass: OverpassConfig,
    /// Air quality provider settings
    #[serde(default)]
    pub air_quality: AirQualityConfig,
    /// Geocoding and autocomplete settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Result cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Recommendation search defaults
    #[serde(default)]
    pub search: SearchConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Overpass API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter endpoint
    #[serde(default = "default_overpass_url")]
    pub base_url: String,
    /// User agent sent with every request (required by the OSM usage policy)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Air quality API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityConfig {
    /// Air pollution endpoint
    #[serde(default = "default_air_quality_url")]
    pub base_url: String,
    /// OpenWeather API key. Without one every air quality reading is unavailable.
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_air_quality_timeout")]
    pub timeout_seconds: u32,
}

/// Geocoding configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim base URL
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    /// Photon search endpoint, used as autocomplete fallback
    #[serde(default = "default_photon_url")]
    pub photon_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u32,
    /// Region name appended to autocomplete queries (e.g. a city)
    pub region_hint: Option<String>,
    /// Comma separated ISO country codes for Nominatim searches
    pub country_codes: Option<String>,
    /// Qualifier for the looser autocomplete retry (e.g. "Bangalore, Karnataka").
    /// Defaults to the region hint.
    pub retry_region: Option<String>,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u32,
    /// SQLite file holding cached recommendations
    #[serde(default = "default_cache_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Recommendation search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search radius in meters when the request omits one
    #[serde(default = "default_radius_m")]
    pub default_radius_m: u32,
    /// Infrastructure type when the request omits one
    #[serde(default = "default_infra")]
    pub default_infra: String,
    /// Maximum number of candidates taken from the empty-land query
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Number of points the fallback generator tries to produce
    #[serde(default = "default_fallback_count")]
    pub fallback_count: usize,
    /// Number of candidates enriched concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Size of the "good" short-list
    #[serde(default = "default_good_count")]
    pub good_count: usize,
    /// Size of the "danger" list
    #[serde(default = "default_danger_count")]
    pub danger_count: usize,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_user_agent() -> String {
    format!("UrbanSite/{}", crate::VERSION)
}

fn default_air_quality_url() -> String {
    "https://api.openweathermap.org/data/2.5/air_pollution".to_string()
}

fn default_air_quality_timeout() -> u32 {
    5
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_photon_url() -> String {
    "https://photon.komoot.io/api/".to_string()
}

fn default_geocoding_timeout() -> u32 {
    10
}

fn default_cache_ttl() -> u32 {
    24
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("urbansite").join("search_cache.db"))
        .unwrap_or_else(|| PathBuf::from("search_cache.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_radius_m() -> u32 {
    2500
}

fn default_infra() -> String {
    "hospital".to_string()
}

fn default_max_candidates() -> usize {
    10
}

fn default_fallback_count() -> usize {
    8
}

fn default_concurrency() -> usize {
    4
}

fn default_good_count() -> usize {
    3
}

fn default_danger_count() -> usize {
    2
}

fn default_port() -> u16 {
    5000
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            base_url: default_overpass_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            base_url: default_air_quality_url(),
            api_key: None,
            timeout_seconds: default_air_quality_timeout(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            nominatim_url: default_nominatim_url(),
            photon_url: default_photon_url(),
            timeout_seconds: default_geocoding_timeout(),
            region_hint: None,
            country_codes: None,
            retry_region: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
            default_infra: default_infra(),
            max_candidates: default_max_candidates(),
            fallback_count: default_fallback_count(),
            concurrency: default_concurrency(),
            good_count: default_good_count(),
            danger_count: default_danger_count(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for UrbanSiteConfig {
    fn default() -> Self {
        Self {
            overpass: OverpassConfig::default(),
            air_quality: AirQualityConfig::default(),
            geocoding: GeocodingConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl UrbanSiteConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // URBANSITE_SEARCH__DEFAULT_RADIUS_M=3000 style overrides
        builder = builder.add_source(
            Environment::with_prefix("URBANSITE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: UrbanSiteConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("urbansite").join("config.toml"))
    }

    /// Apply default values to missing or zeroed configuration fields
    pub fn apply_defaults(&mut self) {
        if self.overpass.base_url.is_empty() {
            self.overpass.base_url = default_overpass_url();
        }
        if self.overpass.user_agent.is_empty() {
            self.overpass.user_agent = default_user_agent();
        }
        if self.air_quality.timeout_seconds == 0 {
            self.air_quality.timeout_seconds = default_air_quality_timeout();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.search.default_radius_m == 0 {
            self.search.default_radius_m = default_radius_m();
        }
        if self.search.default_infra.is_empty() {
            self.search.default_infra = default_infra();
        }
        if self.search.max_candidates == 0 {
            self.search.max_candidates = default_max_candidates();
        }
        if self.search.fallback_count == 0 {
            self.search.fallback_count = default_fallback_count();
        }
        if self.search.concurrency == 0 {
            self.search.concurrency = default_concurrency();
        }
        if self.server.port == 0 {
            self.server.port = default_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.search.default_radius_m > 50_000 {
            return Err(UrbanSiteError::config("Search radius cannot exceed 50000 m").into());
        }

        if self.search.max_candidates > 100 {
            return Err(UrbanSiteError::config("Maximum candidates cannot exceed 100").into());
        }

        if self.search.fallback_count > 100 {
            return Err(UrbanSiteError::config("Fallback count cannot exceed 100").into());
        }

        if self.search.concurrency > 32 {
            return Err(UrbanSiteError::config("Enrichment concurrency cannot exceed 32").into());
        }

        if self.cache.ttl_hours > 168 {
            return Err(
                UrbanSiteError::config("Cache TTL cannot exceed 168 hours (1 week)").into(),
            );
        }

        if self.air_quality.timeout_seconds > 300 || self.geocoding.timeout_seconds > 300 {
            return Err(UrbanSiteError::config("Request timeout cannot exceed 300 seconds").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(UrbanSiteError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(UrbanSiteError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("Overpass", &self.overpass.base_url),
            ("Air quality", &self.air_quality.base_url),
            ("Nominatim", &self.geocoding.nominatim_url),
            ("Photon", &self.geocoding.photon_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(UrbanSiteError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if let Some(api_key) = &self.air_quality.api_key {
            if api_key.is_empty() {
                return Err(UrbanSiteError::config(
                    "Air quality API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = UrbanSiteConfig::default();
        assert_eq!(
            config.overpass.base_url,
            "https://overpass-api.de/api/interpreter"
        );
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.search.default_radius_m, 2500);
        assert_eq!(config.search.max_candidates, 10);
        assert_eq!(config.search.fallback_count, 8);
        assert_eq!(config.server.port, 5000);
        assert!(config.air_quality.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = UrbanSiteConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = UrbanSiteConfig::default();
        config.search.concurrency = 64;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("concurrency"));
    }

    #[test]
    fn test_config_validation_empty_api_key() {
        let mut config = UrbanSiteConfig::default();
        config.air_quality.api_key = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_replaces_zeroes() {
        let mut config = UrbanSiteConfig::default();
        config.search.concurrency = 0;
        config.cache.ttl_hours = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.search.concurrency, 4);
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[search]\ndefault_radius_m = 4000\nconcurrency = 2\n\n[server]\nport = 8080"
        )
        .unwrap();

        let config = UrbanSiteConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.search.default_radius_m, 4000);
        assert_eq!(config.search.concurrency, 2);
        assert_eq!(config.search.max_candidates, 10);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = UrbanSiteConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("urbansite"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
