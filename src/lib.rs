//! `UrbanSite` - Siting recommendations for urban infrastructure
//!
//! This library queries open geodata around a search origin, scores
//! candidate sites on six weighted criteria and returns a ranked short-list
//! together with the sites most exposed to flooding.

pub mod api;
pub mod autocomplete;
pub mod cache;
pub mod config;
pub mod error;
pub mod geodata;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod service;
pub mod siting;
pub mod web;

// Re-export core types for public API
pub use cache::{MemoryCache, PersistentCache, ResultCache, SearchCacheKey};
pub use config::UrbanSiteConfig;
pub use error::UrbanSiteError;
pub use location_resolver::{LocationInput, LocationResolver};
pub use models::{EnrichedCandidate, GeoPoint, InfraType, Location, RankedCandidate, Recommendation};
pub use service::{RecommendRequest, SiteService};
pub use siting::{Recommender, RecommenderSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, UrbanSiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
