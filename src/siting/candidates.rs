//! Candidate generation
//!
//! Candidates come from mapped open land around the origin. When the map has
//! none, points are sampled at random inside the search radius and kept if
//! nothing is built on them.

use rand::{Rng, RngExt};
use std::collections::{BTreeMap, HashSet};
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::geodata::{AreaQuery, GeodataSource, Layer};
use crate::models::{Candidate, CandidateKind, GeoPoint};

use super::geo::offset_point;

/// Radius of the "nothing built here" check
pub const EMPTINESS_RADIUS_M: u32 = 20;

/// Only the first elements of the open-land query are considered
pub const MAX_SCANNED_ELEMENTS: usize = 15;

/// Only the first accepted elements are confirmed with an emptiness check
pub const MAX_VERIFIED: usize = 5;

/// Fallback points are drawn from this band of the search radius
pub const FALLBACK_MIN_FRACTION: f64 = 0.3;
pub const FALLBACK_MAX_FRACTION: f64 = 0.8;

const EXCLUDED_TAGS: [&str; 3] = ["building", "highway", "amenity"];

pub struct CandidateGenerator {
    geodata: Arc<dyn GeodataSource>,
    max_candidates: usize,
    fallback_count: usize,
}

impl CandidateGenerator {
    #[must_use]
    pub fn new(geodata: Arc<dyn GeodataSource>, max_candidates: usize, fallback_count: usize) -> Self {
        Self {
            geodata,
            max_candidates,
            fallback_count,
        }
    }

    /// True when no building or road lies within 20 m of `point`.
    /// A failed check counts as empty.
    pub async fn is_point_empty(&self, point: GeoPoint) -> bool {
        let query = AreaQuery::new(point, EMPTINESS_RADIUS_M, Layer::Obstructions);
        match self.geodata.query(&query).await {
            Ok(elements) => elements.is_empty(),
            Err(e) => {
                debug!("Emptiness check failed, treating point as empty: {}", e);
                true
            }
        }
    }

    /// Centres of open-land areas within `radius_m` of `origin`
    pub async fn empty_land(&self, origin: GeoPoint, radius_m: u32) -> Vec<Candidate> {
        let query = AreaQuery::new(origin, radius_m, Layer::EmptyLand);
        let elements = match self.geodata.query(&query).await {
            Ok(elements) => elements,
            Err(e) => {
                warn!("Open land query failed: {}", e);
                return Vec::new();
            }
        };

        debug!("Open land query returned {} elements", elements.len());

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();

        for element in elements.into_iter().take(MAX_SCANNED_ELEMENTS) {
            if candidates.len() >= self.max_candidates {
                break;
            }

            let Some(centre) = element.centre else {
                continue;
            };

            let (lat, lon) = centre.rounded(5);
            if !seen.insert((lat.to_bits(), lon.to_bits())) {
                continue;
            }

            if EXCLUDED_TAGS.iter().any(|tag| element.tags.contains_key(*tag)) {
                continue;
            }

            if candidates.len() < MAX_VERIFIED && !self.is_point_empty(centre).await {
                debug!("Rejected {:.5},{:.5}: obstructed", centre.lat, centre.lon);
                continue;
            }

            let tags: BTreeMap<String, String> = element.tags.into_iter().collect();
            candidates.push(Candidate::new(centre, tags, CandidateKind::VerifiedEmptyLand));
        }

        info!("Found {} open land candidates", candidates.len());
        candidates
    }

    /// Random points in the 30–80 % band of the radius that pass the
    /// emptiness check. Gives up after twice the target number of attempts.
    pub async fn fallback<R>(&self, origin: GeoPoint, radius_m: u32, rng: &mut R) -> Vec<Candidate>
    where
        R: Rng + Send + ?Sized,
    {
        let radius = f64::from(radius_m);
        let max_attempts = self.fallback_count * 2;
        let mut candidates = Vec::new();
        let mut attempts = 0;

        while candidates.len() < self.fallback_count && attempts < max_attempts {
            attempts += 1;

            let bearing = rng.random_range(0.0..TAU);
            let distance =
                rng.random_range(FALLBACK_MIN_FRACTION * radius..=FALLBACK_MAX_FRACTION * radius);
            let point = offset_point(origin, bearing, distance);

            if self.is_point_empty(point).await {
                let tags = BTreeMap::from([(
                    "fallback".to_string(),
                    "generated_vacant_plot".to_string(),
                )]);
                candidates.push(Candidate::new(point, tags, CandidateKind::VerifiedEmptySpace));
            }
        }

        info!(
            "Generated {} fallback candidates in {} attempts",
            candidates.len(),
            attempts
        );
        candidates
    }
}
