//! The recommendation pipeline: candidates, enrichment, ranking and the
//! good / danger selection.

use futures::{StreamExt, stream};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::info;

use crate::config::SearchConfig;
use crate::geodata::{AirQualitySource, GeodataSource};
use crate::models::{Candidate, EnrichedCandidate, GeoPoint, InfraType, Recommendation};

use super::candidates::CandidateGenerator;
use super::enrichment::Enricher;
use super::metrics::MetricFetcher;
use super::ranking::rank;

/// Tunables of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderSettings {
    pub max_candidates: usize,
    pub fallback_count: usize,
    /// Candidates enriched at the same time
    pub concurrency: usize,
    pub good_count: usize,
    pub danger_count: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for RecommenderSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_candidates: config.max_candidates,
            fallback_count: config.fallback_count,
            concurrency: config.concurrency.max(1),
            good_count: config.good_count,
            danger_count: config.danger_count,
        }
    }
}

/// Risk used to order the danger list: exposure to flooding
#[must_use]
pub fn danger_score(candidate: &EnrichedCandidate) -> f64 {
    1.0 - candidate.raw.lake_protection
}

/// The `count` riskiest candidates, most dangerous first. Ties keep their
/// original order.
#[must_use]
pub fn select_danger(candidates: &[EnrichedCandidate], count: usize) -> Vec<EnrichedCandidate> {
    let mut sorted: Vec<&EnrichedCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| danger_score(b).total_cmp(&danger_score(a)));
    sorted.into_iter().take(count).cloned().collect()
}

pub struct Recommender {
    generator: CandidateGenerator,
    enricher: Enricher,
    settings: RecommenderSettings,
}

impl Recommender {
    #[must_use]
    pub fn new(
        geodata: Arc<dyn GeodataSource>,
        air: Arc<dyn AirQualitySource>,
        settings: RecommenderSettings,
    ) -> Self {
        let generator = CandidateGenerator::new(
            geodata.clone(),
            settings.max_candidates,
            settings.fallback_count,
        );
        let enricher = Enricher::new(MetricFetcher::new(geodata, air));
        Self {
            generator,
            enricher,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    /// Open-land candidates, or random vacant points when there are none
    pub async fn candidates<R>(&self, origin: GeoPoint, radius_m: u32, rng: &mut R) -> Vec<Candidate>
    where
        R: Rng + Send + ?Sized,
    {
        let candidates = self.generator.empty_land(origin, radius_m).await;
        if !candidates.is_empty() {
            return candidates;
        }
        info!("No open land found, generating fallback candidates");
        self.generator.fallback(origin, radius_m, rng).await
    }

    /// Enrich all candidates, preserving their order
    pub async fn enrich_all(
        &self,
        candidates: Vec<Candidate>,
        origin: GeoPoint,
        infra: &InfraType,
    ) -> Vec<EnrichedCandidate> {
        stream::iter(candidates)
            .map(|candidate| self.enricher.enrich(candidate, origin, infra))
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await
    }

    /// Full pipeline with an entropy-seeded random source
    pub async fn recommend(&self, origin: GeoPoint, infra: &InfraType, radius_m: u32) -> Recommendation {
        let mut rng: StdRng = rand::make_rng();
        self.recommend_with_rng(origin, infra, radius_m, &mut rng).await
    }

    /// Full pipeline with a caller-supplied random source
    #[tracing::instrument(name = "recommend", level = "info", skip(self, infra, rng), fields(infra = %infra))]
    pub async fn recommend_with_rng<R>(
        &self,
        origin: GeoPoint,
        infra: &InfraType,
        radius_m: u32,
        rng: &mut R,
    ) -> Recommendation
    where
        R: Rng + Send + ?Sized,
    {
        let candidates = self.candidates(origin, radius_m, rng).await;
        if candidates.is_empty() {
            info!("No candidates found");
            return Recommendation::default();
        }

        info!("Enriching {} candidates", candidates.len());
        let enriched = self.enrich_all(candidates, origin, infra).await;

        let danger = select_danger(&enriched, self.settings.danger_count);
        let mut good = rank(enriched, None);
        good.truncate(self.settings.good_count);

        info!(
            "Recommendation ready: {} good, {} danger",
            good.len(),
            danger.len()
        );
        Recommendation { good, danger }
    }
}
