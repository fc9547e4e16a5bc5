// Candidate-site recommendation engine.
// Flow: candidates → ML scoring → selection, with the LLM recommender as fallback.
// All LLM calls go through llm_client and all predictions through ml_client.

use std::time::Duration;

pub mod candidates;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod llm_scorer;
pub mod prompts;
pub mod scoring;
pub mod selector;
pub mod store;

pub use engine::RecommendationEngine;
pub use errors::RecommendError;

/// Upper bound on candidates per run; each one is a separate prediction call.
pub const MAX_CANDIDATES: usize = 400;

/// Per-request engine settings. Built from `Config` at startup and passed
/// explicitly into every `recommend` call; handlers may override fields.
#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub ml_enabled: bool,
    pub candidate_count: usize,
    pub top_k: usize,
    /// Scores must be strictly above this to be recommended.
    pub min_probability: f64,
    pub patch_size: u32,
    pub call_timeout: Duration,
    pub max_concurrent_predictions: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            ml_enabled: true,
            candidate_count: 20,
            top_k: 3,
            min_probability: 0.6,
            patch_size: 64,
            call_timeout: Duration::from_secs(5),
            max_concurrent_predictions: 8,
        }
    }
}

impl RecommendConfig {
    pub fn validate(&self) -> Result<(), RecommendError> {
        if !(1..=MAX_CANDIDATES).contains(&self.candidate_count) {
            return Err(RecommendError::InvalidRequest(format!(
                "candidate_count must be between 1 and {MAX_CANDIDATES}, got {}",
                self.candidate_count
            )));
        }
        if !(1..=self.candidate_count).contains(&self.top_k) {
            return Err(RecommendError::InvalidRequest(format!(
                "top_k must be between 1 and candidate_count ({}), got {}",
                self.candidate_count, self.top_k
            )));
        }
        if !(0.0..1.0).contains(&self.min_probability) {
            return Err(RecommendError::InvalidRequest(format!(
                "min_probability must be within [0, 1), got {}",
                self.min_probability
            )));
        }
        if self.call_timeout.is_zero() {
            return Err(RecommendError::InvalidRequest(
                "call_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RecommendConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let config = RecommendConfig {
            top_k: 0,
            ..RecommendConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecommendError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_zero_candidates_rejected() {
        let config = RecommendConfig {
            candidate_count: 0,
            ..RecommendConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_candidate_count_is_capped() {
        let at_cap = RecommendConfig {
            candidate_count: MAX_CANDIDATES,
            ..RecommendConfig::default()
        };
        assert!(at_cap.validate().is_ok());

        for count in [MAX_CANDIDATES + 1, usize::MAX] {
            let config = RecommendConfig {
                candidate_count: count,
                ..RecommendConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(RecommendError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_top_k_above_candidate_count_rejected() {
        let config = RecommendConfig {
            candidate_count: 5,
            top_k: usize::MAX,
            ..RecommendConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
