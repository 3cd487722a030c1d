//! Metrics enrichment
//!
//! Turns a bare candidate into an [`EnrichedCandidate`]: the six metrics are
//! fetched concurrently, converted to raw scores, adjusted for the facility
//! type and explained in a short reason text.

use tracing::debug;

use crate::models::{Candidate, EnrichedCandidate, GeoPoint, InfraType, RawScores, SiteMetrics};

use super::geo::distance_between;
use super::metrics::{
    DEFAULT_AIR_QUALITY, DEFAULT_GREEN_PCT, DEFAULT_POPULATION, DEFAULT_ROAD_DISTANCE_M,
    DEFAULT_SAME_INFRA_DISTANCE_M, DEFAULT_WATER, MetricFetcher,
};

/// Type-specific adjustment applied on top of the base scores
pub type Adjustment = fn(&mut RawScores, &SiteMetrics);

fn adjust_medical(scores: &mut RawScores, metrics: &SiteMetrics) {
    let close_road = (1.0 - metrics.dist_road_m / 1500.0).clamp(0.0, 1.0);
    scores.accessibility = scores.accessibility.max(close_road);
    if metrics.aqi >= 4 {
        scores.pollution_risk = 0.0;
    }
    if metrics.near_lake {
        scores.lake_protection = 0.0;
    }
}

fn adjust_school(scores: &mut RawScores, metrics: &SiteMetrics) {
    scores.population_need = (metrics.pop / 120.0).clamp(0.0, 1.0);
    if metrics.aqi >= 4 {
        scores.pollution_risk = 0.0;
    }
    if metrics.dist_road_m < 40.0 {
        scores.accessibility *= 0.6;
    }
}

fn adjust_park(scores: &mut RawScores, metrics: &SiteMetrics) {
    scores.green_balance = (metrics.green_pct / 20.0).clamp(0.0, 1.0);
    if metrics.aqi >= 4 {
        scores.pollution_risk = 0.0;
    }
}

/// Scoring adjustment for a facility type; `None` keeps the base scores
#[must_use]
pub fn adjustment_for(infra: &InfraType) -> Option<Adjustment> {
    match infra {
        medical if medical.is_medical() => Some(adjust_medical),
        InfraType::School => Some(adjust_school),
        InfraType::Park => Some(adjust_park),
        _ => None,
    }
}

/// Raw scores before any type-specific adjustment
#[must_use]
pub fn base_scores(metrics: &SiteMetrics) -> RawScores {
    RawScores {
        accessibility: (1.0 - metrics.dist_road_m / 2000.0).clamp(0.0, 1.0),
        population_need: (metrics.pop / 200.0).clamp(0.0, 1.0),
        lake_protection: if metrics.near_lake { 0.0 } else { 1.0 },
        green_balance: (metrics.green_pct / 40.0).clamp(0.0, 1.0),
        pollution_risk: match metrics.aqi {
            0..=2 => 1.0,
            3 => 0.5,
            _ => 0.0,
        },
        redundancy: (1.0 - metrics.dist_to_same_infra_m / 3000.0).clamp(0.0, 1.0),
    }
}

/// Final raw scores for a facility type, always finite and within `[0, 1]`
#[must_use]
pub fn raw_scores(metrics: &SiteMetrics, infra: &InfraType) -> RawScores {
    let mut scores = base_scores(metrics);
    if let Some(adjust) = adjustment_for(infra) {
        adjust(&mut scores, metrics);
    }
    scores.sanitized()
}

fn aqi_label(aqi: u8) -> &'static str {
    match aqi {
        1 => "Good",
        2 => "Fair",
        3 => "Moderate",
        4 => "Poor",
        5 => "Very Poor",
        _ => "Unknown",
    }
}

/// Human-readable justification of the metrics
#[must_use]
pub fn reason_text(metrics: &SiteMetrics, infra: &InfraType) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(
        if metrics.pop > 120.0 {
            "High building density nearby (strong demand)"
        } else if metrics.pop > 50.0 {
            "Moderate building density nearby"
        } else {
            "Low building density nearby"
        }
        .to_string(),
    );

    parts.push(
        if metrics.dist_road_m < 100.0 {
            "Excellent road access"
        } else if metrics.dist_road_m < 500.0 {
            "Good road connectivity"
        } else {
            "Limited road access"
        }
        .to_string(),
    );

    parts.push(if metrics.near_lake {
        format!(
            "Close to water body ({}m) - flood risk",
            metrics.lake_dist_m as i64
        )
    } else {
        "Safe from flood zones".to_string()
    });

    parts.push(
        if metrics.green_pct < 15.0 {
            "Low green cover"
        } else if metrics.green_pct < 40.0 {
            "Moderate green cover"
        } else {
            "Good green cover"
        }
        .to_string(),
    );

    let label = aqi_label(metrics.aqi);
    parts.push(match metrics.pm25 {
        Some(pm25) => format!(
            "Air quality: {label} (AQI: {}, PM2.5: {pm25:.0} µg/m³)",
            metrics.aqi
        ),
        None => format!("Air quality: {label} (AQI: {})", metrics.aqi),
    });

    parts.push(if metrics.dist_to_same_infra_m < 800.0 {
        format!(
            "Similar facility {}m away - redundancy risk",
            metrics.dist_to_same_infra_m as i64
        )
    } else {
        "No similar facility nearby".to_string()
    });

    match infra {
        InfraType::Hospital => {
            parts.push("Hospitals require high accessibility and good air quality".to_string());
        }
        InfraType::School => {
            parts.push("Schools prefer residential proximity and good air quality".to_string());
        }
        InfraType::Park => {
            parts.push("Parks should have high green cover and low pollution".to_string());
        }
        _ => {}
    }

    format!("{}.", parts.join(". "))
}

/// Attaches metrics, raw scores and a reason to candidates
#[derive(Clone)]
pub struct Enricher {
    fetcher: MetricFetcher,
}

impl Enricher {
    #[must_use]
    pub fn new(fetcher: MetricFetcher) -> Self {
        Self { fetcher }
    }

    /// Measure a candidate. Unavailable metrics fall back to their defaults.
    pub async fn enrich(
        &self,
        candidate: Candidate,
        origin: GeoPoint,
        infra: &InfraType,
    ) -> EnrichedCandidate {
        let point = candidate.point();

        let (pop, road, water, green, air, same) = tokio::join!(
            self.fetcher.population_proxy(point),
            self.fetcher.nearest_road(point),
            self.fetcher.water_proximity(point),
            self.fetcher.green_cover(point),
            self.fetcher.air_quality(point),
            self.fetcher.nearest_same_facility(point, infra),
        );

        let water = water.or_default(DEFAULT_WATER, "water_proximity", point);
        let air = air.or_default(DEFAULT_AIR_QUALITY, "air_quality", point);

        let metrics = SiteMetrics {
            pop: pop.or_default(DEFAULT_POPULATION, "population_proxy", point),
            dist_m: distance_between(origin, point),
            dist_road_m: road.or_default(DEFAULT_ROAD_DISTANCE_M, "nearest_road", point),
            near_lake: water.near,
            lake_dist_m: water.distance_m,
            green_pct: green.or_default(DEFAULT_GREEN_PCT, "green_cover", point),
            aqi: air.aqi,
            pm25: air.pm25,
            dist_to_same_infra_m: same.or_default(
                DEFAULT_SAME_INFRA_DISTANCE_M,
                "nearest_same_facility",
                point,
            ),
        };

        let raw = raw_scores(&metrics, infra);
        let reason = reason_text(&metrics, infra);
        debug!(
            lat = point.lat,
            lon = point.lon,
            "Enriched candidate: {:?}",
            raw
        );

        EnrichedCandidate {
            candidate,
            metrics,
            raw,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodata::{GeoElement, Layer};
    use crate::models::CandidateKind;
    use crate::siting::test_support::{FakeAir, FakeGeodata};
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn metrics() -> SiteMetrics {
        SiteMetrics {
            pop: 100.0,
            dist_m: 1000.0,
            dist_road_m: 500.0,
            near_lake: false,
            lake_dist_m: 2000.0,
            green_pct: 20.0,
            aqi: 3,
            pm25: None,
            dist_to_same_infra_m: 1500.0,
        }
    }

    #[test]
    fn test_base_scores() {
        let scores = base_scores(&metrics());
        assert_eq!(scores.accessibility, 0.75);
        assert_eq!(scores.population_need, 0.5);
        assert_eq!(scores.lake_protection, 1.0);
        assert_eq!(scores.green_balance, 0.5);
        assert_eq!(scores.pollution_risk, 0.5);
        assert_eq!(scores.redundancy, 0.5);
    }

    #[rstest]
    #[case(1, 1.0)]
    #[case(2, 1.0)]
    #[case(3, 0.5)]
    #[case(4, 0.0)]
    #[case(5, 0.0)]
    fn test_pollution_risk_by_aqi(#[case] aqi: u8, #[case] expected: f64) {
        let metrics = SiteMetrics { aqi, ..metrics() };
        assert_eq!(base_scores(&metrics).pollution_risk, expected);
    }

    #[test]
    fn test_base_scores_clamp() {
        let metrics = SiteMetrics {
            pop: 900.0,
            dist_road_m: 5000.0,
            green_pct: 80.0,
            dist_to_same_infra_m: 3000.0,
            ..metrics()
        };
        let scores = base_scores(&metrics);
        assert_eq!(scores.accessibility, 0.0);
        assert_eq!(scores.population_need, 1.0);
        assert_eq!(scores.green_balance, 1.0);
        assert_eq!(scores.redundancy, 0.0);
    }

    #[test]
    fn test_non_finite_metrics_become_zero() {
        let metrics = SiteMetrics {
            pop: f64::NAN,
            ..metrics()
        };
        let scores = raw_scores(&metrics, &InfraType::Other("library".to_string()));
        assert_eq!(scores.population_need, 0.0);
    }

    #[test]
    fn test_hospital_prefers_close_roads() {
        let metrics = SiteMetrics {
            dist_road_m: 300.0,
            ..metrics()
        };
        let scores = raw_scores(&metrics, &InfraType::Hospital);
        // max(1 - 300/2000, 1 - 300/1500) = 0.85
        assert!((scores.accessibility - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_school_road_penalty() {
        let metrics = SiteMetrics {
            dist_road_m: 20.0,
            ..metrics()
        };
        let base = base_scores(&metrics).accessibility;
        let school = raw_scores(&metrics, &InfraType::School).accessibility;
        assert!((school - base * 0.6).abs() < 1e-12);
        assert!((school - 0.594).abs() < 1e-12);
    }

    #[test]
    fn test_school_population_scale() {
        let scores = raw_scores(&metrics(), &InfraType::School);
        assert!((scores.population_need - 100.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_park_green_scale_and_poor_air() {
        let metrics = SiteMetrics {
            green_pct: 10.0,
            aqi: 4,
            ..metrics()
        };
        let scores = raw_scores(&metrics, &InfraType::Park);
        assert_eq!(scores.green_balance, 0.5);
        assert_eq!(scores.pollution_risk, 0.0);
    }

    #[rstest]
    #[case("hospital", true)]
    #[case("Clinic", true)]
    #[case(" pharmacy ", true)]
    #[case("school", true)]
    #[case("park", true)]
    #[case("library", false)]
    fn test_adjustment_lookup(#[case] infra: &str, #[case] adjusted: bool) {
        assert_eq!(adjustment_for(&InfraType::parse(infra)).is_some(), adjusted);
    }

    #[test]
    fn test_other_types_keep_base_scores() {
        let infra = InfraType::Other("library".to_string());
        assert!(adjustment_for(&infra).is_none());
        assert_eq!(raw_scores(&metrics(), &infra), base_scores(&metrics()));
    }

    #[test]
    fn test_reason_text_full() {
        let metrics = SiteMetrics {
            pop: 130.0,
            dist_road_m: 50.0,
            near_lake: true,
            lake_dist_m: 250.7,
            green_pct: 45.0,
            aqi: 2,
            pm25: Some(18.4),
            dist_to_same_infra_m: 640.9,
            ..metrics()
        };
        assert_eq!(
            reason_text(&metrics, &InfraType::Hospital),
            "High building density nearby (strong demand). Excellent road access. \
             Close to water body (250m) - flood risk. Good green cover. \
             Air quality: Fair (AQI: 2, PM2.5: 18 µg/m³). \
             Similar facility 640m away - redundancy risk. \
             Hospitals require high accessibility and good air quality."
        );
    }

    #[test]
    fn test_reason_text_without_guidance() {
        let text = reason_text(&metrics(), &InfraType::Pharmacy);
        assert_eq!(
            text,
            "Moderate building density nearby. Limited road access. Safe from flood zones. \
             Moderate green cover. Air quality: Moderate (AQI: 3). No similar facility nearby."
        );
    }

    #[rstest]
    #[case(0, "Unknown")]
    #[case(1, "Good")]
    #[case(5, "Very Poor")]
    #[case(9, "Unknown")]
    fn test_aqi_labels(#[case] aqi: u8, #[case] label: &str) {
        assert_eq!(aqi_label(aqi), label);
    }

    #[tokio::test]
    async fn test_enrich_with_air_quality_failure() {
        let candidate = Candidate::new(
            GeoPoint::new(12.98, 77.6),
            BTreeMap::new(),
            CandidateKind::VerifiedEmptySpace,
        );
        let geodata = FakeGeodata::new()
            .with_layer(Layer::Buildings, FakeGeodata::scatter(candidate.point(), 60))
            .with_layer(
                Layer::Roads,
                vec![GeoElement::at(1, GeoPoint::new(12.98, 77.601))],
            );
        let fetcher = MetricFetcher::new(Arc::new(geodata), Arc::new(FakeAir::failing()));
        let enricher = Enricher::new(fetcher);

        let enriched = enricher
            .enrich(candidate.clone(), GeoPoint::new(12.97, 77.6), &InfraType::Hospital)
            .await;

        assert_eq!(enriched.candidate, candidate);
        assert_eq!(enriched.metrics.aqi, 3);
        assert_eq!(enriched.metrics.pm25, None);
        assert_eq!(enriched.raw.pollution_risk, 0.5);
        assert_eq!(enriched.metrics.pop, 60.0);
        assert!(enriched.metrics.dist_road_m < 200.0);
        assert_eq!(enriched.metrics.lake_dist_m, 2000.0);
        assert!(!enriched.metrics.near_lake);
        assert_eq!(enriched.metrics.green_pct, 0.0);
        assert_eq!(enriched.metrics.dist_to_same_infra_m, 3000.0);
        assert!((enriched.metrics.dist_m - 1111.95).abs() < 1.0);
        assert!(enriched.reason.contains("Air quality: Moderate (AQI: 3)"));
    }

    #[tokio::test]
    async fn test_enrich_with_total_outage_uses_defaults() {
        let fetcher = MetricFetcher::new(Arc::new(FakeGeodata::failing()), Arc::new(FakeAir::failing()));
        let enricher = Enricher::new(fetcher);
        let candidate = Candidate::new(
            GeoPoint::new(1.0, 1.0),
            BTreeMap::new(),
            CandidateKind::VerifiedEmptySpace,
        );

        let enriched = enricher
            .enrich(candidate, GeoPoint::new(1.0, 1.0), &InfraType::School)
            .await;

        assert_eq!(enriched.metrics.pop, 20.0);
        assert_eq!(enriched.metrics.dist_road_m, 2000.0);
        assert_eq!(enriched.metrics.green_pct, 10.0);
        assert_eq!(enriched.metrics.dist_to_same_infra_m, 3000.0);
        assert_eq!(enriched.metrics.dist_m, 0.0);
        assert_eq!(enriched.raw.accessibility, 0.0);
        assert_eq!(enriched.raw.lake_protection, 1.0);
    }
}
