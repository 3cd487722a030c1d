//! Siting module
//!
//! The candidate scoring and ranking pipeline:
//! - Spherical distance helpers
//! - Metric fetchers with explicit defaults
//! - Candidate generation (mapped open land, random fallback)
//! - Metrics enrichment and per-type score adjustments
//! - Min-max normalization, weighting and ranking

pub mod candidates;
pub mod enrichment;
pub mod geo;
pub mod metrics;
pub mod ranking;
pub mod recommender;

#[cfg(test)]
pub(crate) mod test_support;

pub use candidates::CandidateGenerator;
pub use enrichment::{Enricher, adjustment_for, base_scores, raw_scores, reason_text};
pub use geo::{distance_between, distance_m, offset_point};
pub use metrics::{MetricFetcher, MetricReading, WaterProximity};
pub use ranking::{WEIGHTS, blended_score, normalize, rank};
pub use recommender::{Recommender, RecommenderSettings, danger_score, select_danger};
