//! Recommendation Engine: orchestrates the scoring paths for one district.
//!
//! Flow: validate → generate_candidates → MlScorer.score → select_recommendations.
//! On `MlServiceUnavailable` the LLM recommender runs instead and its output is
//! tagged `llm-fallback`. A successful ML run with nothing above threshold is a
//! real answer and does not fall back.
//!
//! Dropping the future returned by `recommend` aborts in-flight predictions.

use std::sync::Arc;

use tracing::{info, warn};

use crate::llm_client::CompletionService;
use crate::ml_client::PredictionService;
use crate::models::district::DistrictAnalysis;
use crate::models::recommendation::{Recommendation, RecommendationMethod, RecommendationSet};
use crate::recommendation::candidates::generate_candidates;
use crate::recommendation::errors::RecommendError;
use crate::recommendation::llm_scorer::LlmRecommender;
use crate::recommendation::scoring::MlScorer;
use crate::recommendation::selector::{select_recommendations, SelectionParams};
use crate::recommendation::RecommendConfig;

/// Holds the two external capabilities. Stateless between requests.
#[derive(Clone)]
pub struct RecommendationEngine {
    predictor: Arc<dyn PredictionService>,
    completion: Arc<dyn CompletionService>,
}

impl RecommendationEngine {
    pub fn new(
        predictor: Arc<dyn PredictionService>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            predictor,
            completion,
        }
    }

    /// Produces the recommendation set for a district, or a typed error.
    pub async fn recommend(
        &self,
        analysis: &DistrictAnalysis,
        config: &RecommendConfig,
    ) -> Result<RecommendationSet, RecommendError> {
        config.validate()?;
        analysis
            .bounds
            .validate()
            .map_err(RecommendError::InvalidBounds)?;

        let llm = LlmRecommender::new(Arc::clone(&self.completion));

        if !config.ml_enabled {
            info!(
                "ML disabled; requesting LLM recommendations for district {}",
                analysis.district_name
            );
            let recommendations = llm
                .recommend(analysis, config.top_k, RecommendationMethod::Llm)
                .await?;
            return Ok(RecommendationSet {
                recommendations,
                method: RecommendationMethod::Llm,
            });
        }

        match self.run_ml_path(analysis, config).await {
            Ok(recommendations) => {
                info!(
                    "ML path selected {} sites for district {}",
                    recommendations.len(),
                    analysis.district_name
                );
                Ok(RecommendationSet {
                    recommendations,
                    method: RecommendationMethod::Ml,
                })
            }
            Err(RecommendError::MlServiceUnavailable(ml_reason)) => {
                warn!(
                    "ML path failed for district {}: {ml_reason}; falling back to LLM",
                    analysis.district_name
                );
                match llm
                    .recommend(analysis, config.top_k, RecommendationMethod::LlmFallback)
                    .await
                {
                    Ok(recommendations) => Ok(RecommendationSet {
                        recommendations,
                        method: RecommendationMethod::LlmFallback,
                    }),
                    Err(e @ RecommendError::NoSuitableLocations { .. }) => Err(e),
                    Err(llm_err) => Err(RecommendError::CombinedFailure {
                        ml: ml_reason,
                        llm: llm_err.to_string(),
                    }),
                }
            }
            Err(other) => Err(other),
        }
    }

    async fn run_ml_path(
        &self,
        analysis: &DistrictAnalysis,
        config: &RecommendConfig,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let candidates = generate_candidates(&analysis.bounds, config.candidate_count)?;
        let scores = MlScorer::new(Arc::clone(&self.predictor), config)
            .score(&candidates)
            .await?;

        select_recommendations(
            &scores,
            &SelectionParams {
                district_name: &analysis.district_name,
                top_k: config.top_k,
                min_probability: config.min_probability,
            },
        )
    }
}
