use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of facility proposed for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    HealthCenter,
    Clinic,
}

impl FacilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityType::HealthCenter => "health_center",
            FacilityType::Clinic => "clinic",
        }
    }

    /// Human-readable label used in synthesised site names.
    pub fn label(&self) -> &'static str {
        match self {
            FacilityType::HealthCenter => "Health Center",
            FacilityType::Clinic => "Clinic",
        }
    }
}

/// Which scoring path produced a recommendation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationMethod {
    #[serde(rename = "ml")]
    Ml,
    #[serde(rename = "llm")]
    Llm,
    #[serde(rename = "llm-fallback")]
    LlmFallback,
}

impl RecommendationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMethod::Ml => "ml",
            RecommendationMethod::Llm => "llm",
            RecommendationMethod::LlmFallback => "llm-fallback",
        }
    }
}

impl fmt::Display for RecommendationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse bucket derived from a model probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// high: p ≥ 0.8, medium: 0.6 ≤ p < 0.8, low otherwise.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.8 {
            ConfidenceTier::High
        } else if probability >= 0.6 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }
}

/// Model evidence attached to ML-derived recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub probability: f64,
    pub confidence_tier: ConfidenceTier,
}

/// A proposed facility site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub facility_type: FacilityType,
    pub justification: String,
    pub method: RecommendationMethod,
    /// Present only when `method` is `Ml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_metadata: Option<ScoreMetadata>,
}

/// Output of one `recommend` run.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub method: RecommendationMethod,
}

/// Persisted recommendation, one row per site.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecommendationRow {
    pub id: Uuid,
    pub district_id: i32,
    pub request_id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub facility_type: String,
    pub justification: String,
    pub method: String,
    pub probability: Option<f64>,
    pub confidence_tier: Option<String>,
    pub created_at: DateTime<Utc>,
}
