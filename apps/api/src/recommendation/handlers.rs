//! Axum route handlers for the Recommendation API.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::districts::{build_analysis, fetch_district_bounds, load_district_stats};
use crate::errors::AppError;
use crate::models::district::DistrictBounds;
use crate::models::recommendation::{Recommendation, RecommendationMethod, RecommendationRow};
use crate::recommendation::store::{list_recommendations, save_recommendations};
use crate::recommendation::{RecommendConfig, RecommendError};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Optional per-request overrides of the engine settings.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    pub candidate_count: Option<usize>,
    pub top_k: Option<usize>,
    pub use_ml: Option<bool>,
}

impl RecommendRequest {
    fn apply(&self, mut config: RecommendConfig) -> RecommendConfig {
        if let Some(count) = self.candidate_count {
            config.candidate_count = count;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        // A request may opt out of ML but cannot enable it when disabled globally.
        if let Some(use_ml) = self.use_ml {
            config.ml_enabled = config.ml_enabled && use_ml;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendOutcome {
    Recommended,
    NoSuitableLocations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsSource {
    District,
    CountryDefault,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub request_id: Uuid,
    pub district_id: i32,
    pub district_name: String,
    pub method: RecommendationMethod,
    pub outcome: RecommendOutcome,
    pub bounds_source: BoundsSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub district_id: i32,
    pub recommendations: Vec<RecommendationRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/districts/:id/recommendations
///
/// Looks up the district, runs the engine and stores the result.
/// The body is optional; a request without one uses the configured settings.
/// A run that finds nothing suitable returns 200 with an empty list and
/// `outcome = "no_suitable_locations"`; nothing is stored in that case.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Path(district_id): Path<i32>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, AppError> {
    let config = request_overrides(payload)?.apply(state.config.recommend_config());
    config.validate()?;

    let stats = load_district_stats(&state.db, district_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("District {district_id} not found")))?;

    let (bounds, bounds_source) = match fetch_district_bounds(&state.db, district_id).await {
        Ok(Some(bounds)) => (bounds, BoundsSource::District),
        Ok(None) => {
            warn!("District {district_id} has no geometry; using country bounds");
            (DistrictBounds::COUNTRY_DEFAULT, BoundsSource::CountryDefault)
        }
        Err(e) => {
            warn!("Bounds lookup failed for district {district_id}: {e:#}; using country bounds");
            (DistrictBounds::COUNTRY_DEFAULT, BoundsSource::CountryDefault)
        }
    };

    let analysis = build_analysis(stats, bounds);
    let request_id = Uuid::new_v4();

    info!(
        "Recommendation request {request_id} for district {} (ml_enabled={})",
        analysis.district_name, config.ml_enabled
    );

    match state.engine.recommend(&analysis, &config).await {
        Ok(set) => {
            save_recommendations(&state.db, district_id, request_id, &set).await?;
            Ok(Json(RecommendResponse {
                request_id,
                district_id,
                district_name: analysis.district_name,
                method: set.method,
                outcome: RecommendOutcome::Recommended,
                bounds_source,
                message: None,
                recommendations: set.recommendations,
            }))
        }
        Err(RecommendError::NoSuitableLocations { method, reason }) => {
            info!("Request {request_id}: no suitable locations ({method}): {reason}");
            Ok(Json(RecommendResponse {
                request_id,
                district_id,
                district_name: analysis.district_name,
                method,
                outcome: RecommendOutcome::NoSuitableLocations,
                bounds_source,
                message: Some(reason),
                recommendations: Vec::new(),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// A missing body (no JSON content type) means "no overrides"; a body that is
/// present but invalid is still rejected.
fn request_overrides(
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<RecommendRequest, AppError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(RecommendRequest::default()),
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    }
}

/// GET /api/v1/districts/:id/recommendations?limit=N
pub async fn handle_list_recommendations(
    State(state): State<AppState>,
    Path(district_id): Path<i32>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }

    let recommendations = list_recommendations(&state.db, district_id, limit).await?;
    Ok(Json(HistoryResponse {
        district_id,
        recommendations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_overrides_apply() {
        let request = RecommendRequest {
            candidate_count: Some(30),
            top_k: Some(5),
            use_ml: None,
        };
        let config = request.apply(RecommendConfig::default());
        assert_eq!(config.candidate_count, 30);
        assert_eq!(config.top_k, 5);
        assert!(config.ml_enabled);
    }

    #[test]
    fn test_request_cannot_enable_disabled_ml() {
        let request = RecommendRequest {
            use_ml: Some(true),
            ..RecommendRequest::default()
        };
        let base = RecommendConfig {
            ml_enabled: false,
            ..RecommendConfig::default()
        };
        assert!(!request.apply(base).ml_enabled);
    }

    #[test]
    fn test_oversized_candidate_count_fails_validation() {
        let request: RecommendRequest =
            serde_json::from_str(r#"{"candidate_count": 18446744073709551615}"#).unwrap();
        let config = request.apply(RecommendConfig::default());
        assert!(matches!(
            config.validate(),
            Err(RecommendError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_empty_body_deserializes() {
        let request: RecommendRequest = serde_json::from_str("{}").unwrap();
        assert!(request.candidate_count.is_none());
        assert!(request.use_ml.is_none());
    }

    #[test]
    fn test_no_suitable_response_shape() {
        let response = RecommendResponse {
            request_id: Uuid::nil(),
            district_id: 3,
            district_name: "Gasabo".to_string(),
            method: RecommendationMethod::Ml,
            outcome: RecommendOutcome::NoSuitableLocations,
            bounds_source: BoundsSource::District,
            message: Some("none of 20 candidates".to_string()),
            recommendations: Vec::new(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["outcome"], "no_suitable_locations");
        assert_eq!(value["method"], "ml");
        assert_eq!(value["recommendations"].as_array().unwrap().len(), 0);
    }
}
