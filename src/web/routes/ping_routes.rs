use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use crate::services::PingOutcome;
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::PingAck;

pub fn create_ping_router() -> Router<Arc<AppState>> {
    // get() also answers HEAD with the body stripped, so GET, POST, and HEAD
    // share one handler and one paused policy.
    Router::new().route("/{slug}", get(receive_ping).post(receive_ping))
}

#[axum::debug_handler]
async fn receive_ping(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let source = client_source(&headers);
    let now = Utc::now();
    match state.ping_service.record_ping(&slug, &source, now).await? {
        PingOutcome::Paused => Ok(Json(json!({
            "status": "paused",
            "message": "Monitor is paused"
        }))
        .into_response()),
        PingOutcome::Accepted { monitor, recovered } => Ok(Json(PingAck {
            status: "ok",
            monitor: monitor.name,
            timestamp: now,
            recovered,
        })
        .into_response()),
    }
}

/// Best-effort client address from proxy headers. Advisory only; it is
/// stored with the ping and never used for authorization.
fn client_source(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    "unknown".to_string()
}
