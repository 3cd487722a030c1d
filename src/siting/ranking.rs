//! Normalization and ranking

use crate::models::{EnrichedCandidate, RankedCandidate, RawScores};

/// Weight per criterion, in [`RawScores::to_array`] order
pub const WEIGHTS: [f64; RawScores::DIMENSIONS] = [
    0.16, // accessibility
    0.22, // population_need
    0.20, // lake_protection
    0.16, // green_balance
    0.14, // pollution_risk
    0.12, // redundancy
];

/// Ranges at or below this are treated as zero variance
const MIN_RANGE: f64 = 1e-9;

/// Min-max normalise every dimension across the candidate set.
/// Dimensions without variance keep their raw values.
#[must_use]
pub fn normalize(raw: &[RawScores]) -> Vec<RawScores> {
    let rows: Vec<[f64; RawScores::DIMENSIONS]> = raw.iter().map(RawScores::to_array).collect();

    let mut min = [f64::INFINITY; RawScores::DIMENSIONS];
    let mut max = [f64::NEG_INFINITY; RawScores::DIMENSIONS];
    for row in &rows {
        for (dim, value) in row.iter().enumerate() {
            min[dim] = min[dim].min(*value);
            max[dim] = max[dim].max(*value);
        }
    }

    rows.into_iter()
        .map(|row| {
            let mut normalized = row;
            for (dim, value) in normalized.iter_mut().enumerate() {
                let range = max[dim] - min[dim];
                if range > MIN_RANGE {
                    *value = (*value - min[dim]) / range;
                }
            }
            RawScores::from_array(normalized)
        })
        .collect()
}

/// Weighted blend of normalised scores on a 0–100 scale
#[must_use]
pub fn blended_score(normalized: &RawScores) -> f64 {
    normalized
        .to_array()
        .iter()
        .zip(WEIGHTS)
        .map(|(value, weight)| value * weight)
        .sum::<f64>()
        * 100.0
}

/// Score, sort (stable, descending) and rank candidates.
///
/// With `topk = None` every candidate is ranked and returned; otherwise only
/// the best `topk`.
#[must_use]
pub fn rank(candidates: Vec<EnrichedCandidate>, topk: Option<usize>) -> Vec<RankedCandidate> {
    let raw: Vec<RawScores> = candidates.iter().map(|c| c.raw).collect();
    let scores: Vec<f64> = normalize(&raw).iter().map(blended_score).collect();

    let mut scored: Vec<(f64, EnrichedCandidate)> = scores.into_iter().zip(candidates).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let take = topk.unwrap_or(scored.len());
    scored
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(i, (score, mut site))| {
            let rank = i + 1;
            site.reason = format!("Rank {rank} - Score: {score:.0}/100. {}", site.reason);
            RankedCandidate { score, rank, site }
        })
        .collect()
}
