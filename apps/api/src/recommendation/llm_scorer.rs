//! LLM recommender: holistic site proposals from district statistics.
//!
//! Used when the ML path fails or is disabled. Produces `Recommendation`s
//! directly; there is no per-candidate scoring on this path. A response that
//! cannot be parsed is surfaced, never patched up.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::llm_client::prompts::NO_FABRICATION_INSTRUCTION;
use crate::llm_client::{strip_json_fences, CompletionService};
use crate::models::district::{DistrictAnalysis, DistrictBounds};
use crate::models::recommendation::{FacilityType, Recommendation, RecommendationMethod};
use crate::recommendation::errors::RecommendError;
use crate::recommendation::prompts::{RECOMMEND_PROMPT_TEMPLATE, RECOMMEND_SYSTEM};

/// One site as the model is asked to return it.
#[derive(Debug, Deserialize)]
struct LlmSite {
    name: String,
    latitude: f64,
    longitude: f64,
    facility_type: FacilityType,
    justification: String,
}

pub struct LlmRecommender {
    service: Arc<dyn CompletionService>,
}

impl LlmRecommender {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Asks the model for up to `max_sites` sites and tags them with `method`.
    pub async fn recommend(
        &self,
        analysis: &DistrictAnalysis,
        max_sites: usize,
        method: RecommendationMethod,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let prompt = build_recommend_prompt(analysis, max_sites)?;

        let text = self
            .service
            .complete(&prompt, RECOMMEND_SYSTEM)
            .await
            .map_err(|e| RecommendError::LlmServiceUnavailable(e.to_string()))?;

        let mut recommendations = parse_recommendations(&text, &analysis.bounds, method)?;
        if recommendations.is_empty() {
            return Err(RecommendError::NoSuitableLocations {
                method,
                reason: format!(
                    "the model proposed no sites for {}",
                    analysis.district_name
                ),
            });
        }
        recommendations.truncate(max_sites);

        info!(
            "LLM proposed {} sites for district {} ({})",
            recommendations.len(),
            analysis.district_name,
            method
        );
        Ok(recommendations)
    }
}

/// Fills the prompt template with the district figures.
fn build_recommend_prompt(
    analysis: &DistrictAnalysis,
    max_sites: usize,
) -> Result<String, RecommendError> {
    let people_per_facility = analysis.population / analysis.facility_count.max(1);

    let analysis_json = serde_json::to_string_pretty(&serde_json::json!({
        "district": analysis.district_name,
        "population": analysis.population,
        "existing_facilities": analysis.facility_count,
        "people_per_facility": people_per_facility,
        "average_travel_time_minutes": analysis.avg_travel_time_minutes,
        "target_travel_time_minutes": analysis.target_travel_time_minutes,
    }))
    .map_err(|e| RecommendError::InvalidRequest(format!("Failed to serialize analysis: {e}")))?;

    let bounds_json = serde_json::to_string(&analysis.bounds)
        .map_err(|e| RecommendError::InvalidRequest(format!("Failed to serialize bounds: {e}")))?;

    Ok(RECOMMEND_PROMPT_TEMPLATE
        .replace("{no_fabrication_instruction}", NO_FABRICATION_INSTRUCTION)
        .replace("{analysis_json}", &analysis_json)
        .replace("{bounds_json}", &bounds_json)
        .replace("{max_sites}", &max_sites.to_string()))
}

/// Parses free-form model output into recommendations.
///
/// Any invalid entry rejects the whole response.
fn parse_recommendations(
    text: &str,
    bounds: &DistrictBounds,
    method: RecommendationMethod,
) -> Result<Vec<Recommendation>, RecommendError> {
    let array = extract_json_array(text).ok_or_else(|| {
        RecommendError::MalformedLlmResponse("expected a JSON array of sites".to_string())
    })?;

    let sites: Vec<LlmSite> = serde_json::from_str(array)
        .map_err(|e| RecommendError::MalformedLlmResponse(format!("invalid site list: {e}")))?;

    sites
        .into_iter()
        .enumerate()
        .map(|(index, site)| {
            if site.name.trim().is_empty() {
                return Err(RecommendError::MalformedLlmResponse(format!(
                    "site {index} has an empty name"
                )));
            }
            if site.justification.trim().is_empty() {
                return Err(RecommendError::MalformedLlmResponse(format!(
                    "site {index} has an empty justification"
                )));
            }
            if !bounds.contains(site.latitude, site.longitude) {
                return Err(RecommendError::MalformedLlmResponse(format!(
                    "site {index} ({}, {}) lies outside the district",
                    site.latitude, site.longitude
                )));
            }
            Ok(Recommendation {
                name: site.name.trim().to_string(),
                latitude: site.latitude,
                longitude: site.longitude,
                facility_type: site.facility_type,
                justification: site.justification.trim().to_string(),
                method,
                score_metadata: None,
            })
        })
        .collect()
}

/// Returns the first balanced top-level `[...]` in `text`, skipping brackets
/// inside string literals.
fn extract_json_array(text: &str) -> Option<&str> {
    let text = strip_json_fences(text);
    let start = text.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
