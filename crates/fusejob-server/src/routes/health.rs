//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};

use fusejob_engine::health::check_health;
use fusejob_types::HealthReport;

use crate::state::AppState;

/// Tool and host health. Does not take the job gate.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let tool = state.dispatcher.harness().config().tool();
    Json(check_health(&tool).await)
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
