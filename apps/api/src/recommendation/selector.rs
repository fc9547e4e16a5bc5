//! Recommendation Selector: turns ML suitability scores into a ranked shortlist.
//!
//! No service calls. Pure, deterministic, fully testable.

use crate::models::recommendation::{
    FacilityType, Recommendation, RecommendationMethod, ScoreMetadata,
};
use crate::recommendation::errors::RecommendError;
use crate::recommendation::scoring::{PredictedClass, SuitabilityScore};

#[derive(Debug, Clone)]
pub struct SelectionParams<'a> {
    pub district_name: &'a str,
    pub top_k: usize,
    /// Exclusive lower bound on probability.
    pub min_probability: f64,
}

/// Selects up to `top_k` built-up sites above the probability threshold.
///
/// Algorithm:
/// 1. Keep built-up scores with probability > min_probability
/// 2. Stable sort by descending probability (ties keep candidate order)
/// 3. Truncate to top_k
/// 4. Rank 0 → health_center, the rest → clinic
/// 5. Synthesise name and justification
pub fn select_recommendations(
    scores: &[SuitabilityScore],
    params: &SelectionParams<'_>,
) -> Result<Vec<Recommendation>, RecommendError> {
    let mut eligible: Vec<&SuitabilityScore> = scores
        .iter()
        .filter(|s| s.predicted_class == PredictedClass::BuiltUp)
        .filter(|s| s.probability > params.min_probability)
        .collect();

    if eligible.is_empty() {
        return Err(RecommendError::NoSuitableLocations {
            method: RecommendationMethod::Ml,
            reason: format!(
                "none of {} candidates is built-up with probability above {:.2}",
                scores.len(),
                params.min_probability
            ),
        });
    }

    // `sort_by` is stable, which keeps equal probabilities in candidate order.
    eligible.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    eligible.truncate(params.top_k);

    Ok(eligible
        .into_iter()
        .enumerate()
        .map(|(rank, score)| build_recommendation(rank, score, params.district_name))
        .collect())
}

fn facility_type_for_rank(rank: usize) -> FacilityType {
    if rank == 0 {
        FacilityType::HealthCenter
    } else {
        FacilityType::Clinic
    }
}

fn build_recommendation(rank: usize, score: &SuitabilityScore, district_name: &str) -> Recommendation {
    let facility_type = facility_type_for_rank(rank);
    let percent = score.probability * 100.0;

    Recommendation {
        name: format!("{} Proposed {} {}", district_name, facility_type.label(), rank + 1),
        latitude: score.candidate.latitude,
        longitude: score.candidate.longitude,
        facility_type,
        justification: format!(
            "Satellite imagery classifies this site as built-up with {percent:.1}% probability \
            ({} confidence), indicating an established settlement a new {} can serve.",
            score.confidence_tier.as_str(),
            facility_type.label().to_lowercase()
        ),
        method: RecommendationMethod::Ml,
        score_metadata: Some(ScoreMetadata {
            probability: score.probability,
            confidence_tier: score.confidence_tier,
        }),
    }
}
