use sqlx::PgPool;

use crate::config::Config;
use crate::ml_client::MlClient;
use crate::recommendation::RecommendationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Direct handle for ML status reporting; scoring goes through `engine`.
    pub ml: MlClient,
    pub engine: RecommendationEngine,
}
