//! Candidate sites and the data attached to them as they move through
//! enrichment and ranking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::location::GeoPoint;

/// How a candidate point was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    /// Centre of a mapped open-land area
    #[serde(rename = "verified_empty_land")]
    VerifiedEmptyLand,
    /// Randomly generated point that passed the emptiness check
    #[serde(rename = "verified_empty_space")]
    VerifiedEmptySpace,
}

/// A point proposed as a possible site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub lat: f64,
    pub lon: f64,
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub kind: CandidateKind,
}

impl Candidate {
    #[must_use]
    pub fn new(point: GeoPoint, tags: BTreeMap<String, String>, kind: CandidateKind) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
            tags,
            kind,
        }
    }

    #[must_use]
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Measured (or defaulted) signals for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteMetrics {
    /// Building count within 500 m, used as a population proxy
    pub pop: f64,
    /// Distance from the search origin in meters
    pub dist_m: f64,
    pub dist_road_m: f64,
    pub near_lake: bool,
    pub lake_dist_m: f64,
    /// Green cover estimate in percent (0..=80)
    pub green_pct: f64,
    /// Ordinal air quality index, 1 (good) to 5 (very poor)
    pub aqi: u8,
    /// PM2.5 concentration in µg/m³
    pub pm25: Option<f64>,
    pub dist_to_same_infra_m: f64,
}

/// Per-criterion scores, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawScores {
    pub accessibility: f64,
    pub population_need: f64,
    pub lake_protection: f64,
    pub green_balance: f64,
    pub pollution_risk: f64,
    pub redundancy: f64,
}

impl RawScores {
    /// Number of scoring dimensions
    pub const DIMENSIONS: usize = 6;

    /// Values in weight-table order
    #[must_use]
    pub fn to_array(&self) -> [f64; Self::DIMENSIONS] {
        [
            self.accessibility,
            self.population_need,
            self.lake_protection,
            self.green_balance,
            self.pollution_risk,
            self.redundancy,
        ]
    }

    #[must_use]
    pub fn from_array(values: [f64; Self::DIMENSIONS]) -> Self {
        let [
            accessibility,
            population_need,
            lake_protection,
            green_balance,
            pollution_risk,
            redundancy,
        ] = values;
        Self {
            accessibility,
            population_need,
            lake_protection,
            green_balance,
            pollution_risk,
            redundancy,
        }
    }

    /// Replace non-finite values with 0.0 and clamp everything into `[0, 1]`
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self::from_array(self.to_array().map(|v| {
            if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }))
    }
}

/// A candidate with its metrics, raw scores and a human-readable justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCandidate {
    pub candidate: Candidate,
    pub metrics: SiteMetrics,
    pub raw: RawScores,
    pub reason: String,
}

/// An enriched candidate placed in the final ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Weighted score in `[0, 100]`
    pub score: f64,
    /// 1-based position
    pub rank: usize,
    pub site: EnrichedCandidate,
}

/// Response of a recommendation request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recommendation {
    pub good: Vec<RankedCandidate>,
    pub danger: Vec<EnrichedCandidate>,
}
