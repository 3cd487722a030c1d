//! Recommendation service
//!
//! Resolves the search origin, consults the result cache and runs the siting
//! pipeline on a miss.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use crate::autocomplete::Autocompleter;
use crate::cache::{ResultCache, SearchCacheKey};
use crate::config::UrbanSiteConfig;
use crate::geodata::{
    AirQualitySource, GeodataSource, Geocoder, NominatimClient, OpenWeatherClient, OverpassClient,
    PhotonClient, PlaceSuggestion,
};
use crate::location_resolver::{LocationInput, LocationResolver};
use crate::models::{InfraType, Recommendation};
use crate::siting::{Recommender, RecommenderSettings};
use crate::{Result, UrbanSiteError};

/// Largest accepted search radius in meters
pub const MAX_RADIUS_M: u32 = 50_000;

/// A validated recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendRequest {
    pub location: LocationInput,
    pub infra: InfraType,
    pub radius_m: u32,
}

impl RecommendRequest {
    pub fn new(location: LocationInput, infra: InfraType, radius_m: u32) -> Result<Self> {
        if radius_m == 0 || radius_m > MAX_RADIUS_M {
            return Err(UrbanSiteError::validation(format!(
                "Radius must be between 1 and {MAX_RADIUS_M} meters, got {radius_m}"
            )));
        }
        Ok(Self {
            location,
            infra,
            radius_m,
        })
    }
}

pub struct SiteService {
    recommender: Recommender,
    geocoder: Arc<dyn Geocoder>,
    autocompleter: Autocompleter,
    cache: Arc<dyn ResultCache>,
}

impl SiteService {
    #[must_use]
    pub fn new(
        recommender: Recommender,
        geocoder: Arc<dyn Geocoder>,
        autocompleter: Autocompleter,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            recommender,
            geocoder,
            autocompleter,
            cache,
        }
    }

    /// Wire up the production HTTP clients from configuration
    pub fn from_config(config: &UrbanSiteConfig, cache: Arc<dyn ResultCache>) -> anyhow::Result<Self> {
        let overpass: Arc<dyn GeodataSource> = Arc::new(
            OverpassClient::new(&config.overpass).context("Failed to create Overpass client")?,
        );
        let air: Arc<dyn AirQualitySource> = Arc::new(
            OpenWeatherClient::new(&config.air_quality)
                .context("Failed to create OpenWeather client")?,
        );
        let nominatim: Arc<dyn Geocoder> = Arc::new(
            NominatimClient::new(&config.geocoding).context("Failed to create Nominatim client")?,
        );
        let photon: Arc<dyn Geocoder> = Arc::new(
            PhotonClient::new(&config.geocoding).context("Failed to create Photon client")?,
        );

        let recommender = Recommender::new(
            overpass,
            air,
            RecommenderSettings::from(&config.search),
        );
        let autocompleter = Autocompleter::new(nominatim.clone(), photon);

        Ok(Self::new(recommender, nominatim, autocompleter, cache))
    }

    /// Resolve the origin and return a (possibly cached) recommendation
    pub async fn recommend(&self, request: RecommendRequest) -> Result<Recommendation> {
        let origin = LocationResolver::resolve_location(self.geocoder.as_ref(), request.location)
            .await?
            .point();
        let key = SearchCacheKey::new(origin, &request.infra, request.radius_m);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                info!("Returning cached recommendation for {}", key);
                return Ok(cached);
            }
            Ok(None) => info!("Computing fresh recommendation for {}", key),
            Err(e) => warn!("Cache lookup failed, computing fresh result: {:#}", e),
        }

        let recommendation = self
            .recommender
            .recommend(origin, &request.infra, request.radius_m)
            .await;

        if let Err(e) = self.cache.put(&key, &recommendation).await {
            warn!("Failed to cache recommendation: {:#}", e);
        }

        Ok(recommendation)
    }

    /// Place name suggestions for a partial query
    pub async fn autocomplete(&self, query: &str, limit: usize) -> Vec<PlaceSuggestion> {
        self.autocompleter.complete(query, limit).await
    }

    /// Drop every cached recommendation
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache
            .clear()
            .await
            .map_err(|e| UrbanSiteError::cache(format!("{e:#}")))
    }

    /// Drop expired cached recommendations
    pub async fn evict_expired(&self) -> Result<usize> {
        self.cache
            .evict_expired()
            .await
            .map_err(|e| UrbanSiteError::cache(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::geodata::{GeoElement, Layer};
    use crate::models::{GeoPoint, Location};
    use crate::siting::test_support::{FakeAir, FakeGeodata};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn lookup(&self, name: &str) -> crate::geodata::Result<Option<Location>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((name == "Indiranagar")
                .then(|| Location::new(12.9784, 77.6408, "Indiranagar".to_string())))
        }

        async fn suggest(
            &self,
            _query: &str,
            _limit: usize,
        ) -> crate::geodata::Result<Vec<PlaceSuggestion>> {
            Ok(Vec::new())
        }
    }

    fn service(geodata: Arc<FakeGeodata>, cache: Arc<dyn ResultCache>) -> (SiteService, Arc<CountingGeocoder>) {
        let geocoder = Arc::new(CountingGeocoder {
            lookups: AtomicUsize::new(0),
        });
        let recommender = Recommender::new(
            geodata,
            Arc::new(FakeAir::reading(1, None)),
            RecommenderSettings::default(),
        );
        let autocompleter = Autocompleter::new(geocoder.clone(), geocoder.clone());
        (
            SiteService::new(recommender, geocoder.clone(), autocompleter, cache),
            geocoder,
        )
    }

    fn open_land() -> Arc<FakeGeodata> {
        let elements = (0..4)
            .map(|i| {
                GeoElement::at(i, GeoPoint::new(12.98 + 0.002 * i as f64, 77.64))
                    .with_tag("landuse", "brownfield")
            })
            .collect();
        Arc::new(FakeGeodata::new().with_layer(Layer::EmptyLand, elements))
    }

    #[test]
    fn test_request_radius_validation() {
        let location = LocationInput::Coordinates(1.0, 1.0);
        assert!(RecommendRequest::new(location.clone(), InfraType::Hospital, 0).is_err());
        assert!(RecommendRequest::new(location.clone(), InfraType::Hospital, 50_001).is_err());
        assert!(RecommendRequest::new(location, InfraType::Hospital, 2500).is_ok());
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let geodata = open_land();
        let (service, _) = service(geodata.clone(), Arc::new(MemoryCache::default()));
        let request = RecommendRequest::new(
            LocationInput::Coordinates(12.9784, 77.6408),
            InfraType::Hospital,
            2500,
        )
        .unwrap();

        let first = service.recommend(request.clone()).await.unwrap();
        let queries_after_first = geodata.queries_for(&Layer::EmptyLand).len();
        let second = service.recommend(request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.good.len(), 3);
        assert_eq!(queries_after_first, 1);
        assert_eq!(geodata.queries_for(&Layer::EmptyLand).len(), 1);
    }

    #[tokio::test]
    async fn test_place_not_found_skips_pipeline() {
        let geodata = open_land();
        let (service, geocoder) = service(geodata.clone(), Arc::new(MemoryCache::default()));
        let request = RecommendRequest::new(
            LocationInput::Name("Atlantis".to_string()),
            InfraType::School,
            2500,
        )
        .unwrap();

        let result = service.recommend(request).await;
        assert!(matches!(result, Err(UrbanSiteError::PlaceNotFound { .. })));
        assert_eq!(geocoder.lookups.load(Ordering::SeqCst), 1);
        assert!(geodata.queries_for(&Layer::EmptyLand).is_empty());
    }

    #[tokio::test]
    async fn test_named_place_is_geocoded() {
        let (service, geocoder) = service(open_land(), Arc::new(MemoryCache::default()));
        let request = RecommendRequest::new(
            LocationInput::Name("Indiranagar".to_string()),
            InfraType::Park,
            2500,
        )
        .unwrap();

        let recommendation = service.recommend(request).await.unwrap();
        assert_eq!(geocoder.lookups.load(Ordering::SeqCst), 1);
        assert!(!recommendation.good.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_recompute() {
        let geodata = open_land();
        let (service, _) = service(geodata.clone(), Arc::new(MemoryCache::default()));
        let request = RecommendRequest::new(
            LocationInput::Coordinates(12.9784, 77.6408),
            InfraType::Clinic,
            2500,
        )
        .unwrap();

        service.recommend(request.clone()).await.unwrap();
        service.clear_cache().await.unwrap();
        service.recommend(request).await.unwrap();
        assert_eq!(geodata.queries_for(&Layer::EmptyLand).len(), 2);
        assert_eq!(service.evict_expired().await.unwrap(), 0);
    }
}
