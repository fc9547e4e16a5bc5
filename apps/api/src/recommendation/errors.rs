use thiserror::Error;

use crate::models::recommendation::RecommendationMethod;

/// Failure modes of a recommendation run.
///
/// `MlServiceUnavailable` is consumed by the engine to trigger the LLM
/// fallback; every other variant reaches the caller as-is.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Invalid district bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("ML service unavailable: {0}")]
    MlServiceUnavailable(String),

    #[error("LLM service unavailable: {0}")]
    LlmServiceUnavailable(String),

    #[error("Malformed LLM response: {0}")]
    MalformedLlmResponse(String),

    /// A successful run that found nothing worth recommending.
    #[error("No suitable locations found ({method}): {reason}")]
    NoSuitableLocations {
        method: RecommendationMethod,
        reason: String,
    },

    #[error("Both scoring paths failed. ML: {ml}. LLM: {llm}")]
    CombinedFailure { ml: String, llm: String },
}
