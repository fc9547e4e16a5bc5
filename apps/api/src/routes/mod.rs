pub mod health;
pub mod ml_status;

use axum::{
    routing::{get, post},
    Router,
};

use crate::recommendation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/ml/status", get(ml_status::ml_status_handler))
        .route(
            "/api/v1/districts/:id/recommendations",
            post(handlers::handle_recommend).get(handlers::handle_list_recommendations),
        )
        .with_state(state)
}
