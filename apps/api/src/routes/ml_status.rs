use axum::{extract::State, Json};
use serde::Serialize;
use tracing::warn;

use crate::ml_client::{MlHealth, ModelInfo};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MlStatusResponse {
    pub enabled: bool,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<MlHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/v1/ml/status
/// Reports whether the prediction service is reachable and which model it serves.
/// Always 200: an unreachable service is a status, not a failure of this endpoint.
pub async fn ml_status_handler(State(state): State<AppState>) -> Json<MlStatusResponse> {
    let enabled = state.config.ml_enabled;

    let health = match state.ml.health().await {
        Ok(health) => health,
        Err(e) => {
            warn!("ML service health check failed: {e}");
            return Json(MlStatusResponse {
                enabled,
                reachable: false,
                health: None,
                model: None,
                error: Some(e.to_string()),
            });
        }
    };

    let (model, error) = match state.ml.model_info().await {
        Ok(info) => (Some(info), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Json(MlStatusResponse {
        enabled,
        reachable: true,
        health: Some(health),
        model,
        error,
    })
}
