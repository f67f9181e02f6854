use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    routing::get,
};
use chrono::Utc;
use tracing::info;

use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::SweepResponse;

pub fn create_sweep_router() -> Router<Arc<AppState>> {
    Router::new().route("/check", get(run_sweep_check))
}

/// Trigger endpoint for external schedulers. When a sweep secret is
/// configured, the request must carry it as a bearer token.
#[axum::debug_handler]
async fn run_sweep_check(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, AppError> {
    if let Some(secret) = &state.config.cron_secret {
        let expected = format!("Bearer {secret}");
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(AppError::Unauthorized);
        }
    }

    let now = Utc::now();
    let stats = state.sweep_service.run_sweep(now).await;
    info!(
        checked = stats.checked,
        alerts_sent = stats.alerts_sent,
        errors = stats.errors,
        "Sweep trigger completed."
    );
    Ok(Json(SweepResponse {
        success: true,
        timestamp: now,
        checked: stats.checked,
        alerts_sent: stats.alerts_sent,
        errors: stats.errors,
    }))
}
