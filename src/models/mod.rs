//! Data models for the `UrbanSite` service
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and resolved search origins
//! - Infra: Facility categories and their OpenStreetMap tags
//! - Candidate: Candidate sites, their metrics, scores and rankings

pub mod candidate;
pub mod infra;
pub mod location;

// Re-export all public types for convenient access
pub use candidate::{
    Candidate, CandidateKind, EnrichedCandidate, RankedCandidate, RawScores, Recommendation,
    SiteMetrics,
};
pub use infra::InfraType;
pub use location::{GeoPoint, Location};
