use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::db::models::MonitorChanges;
use crate::services::NewMonitor;
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::{
    CreateMonitorRequest, DeleteMonitorQuery, MonitorDetailResponse, UpdateMonitorRequest,
};

pub fn create_monitor_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_monitor).get(list_monitors))
        .route(
            "/{id}",
            get(monitor_detail).put(update_monitor).delete(delete_monitor),
        )
}

#[axum::debug_handler]
async fn create_monitor(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMonitorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state
        .monitor_service
        .create(
            NewMonitor {
                name: payload.name.unwrap_or_default(),
                email: payload.email.unwrap_or_default(),
                schedule: payload.schedule,
                grace_period_seconds: payload.grace_period,
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
async fn list_monitors(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.monitor_service.list().await?))
}

#[axum::debug_handler]
async fn monitor_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.monitor_service.detail(id).await?;
    Ok(Json(MonitorDetailResponse::from(detail)))
}

#[axum::debug_handler]
async fn update_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMonitorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owner_email = payload.owner_email.unwrap_or_default();
    let changes = MonitorChanges {
        name: payload.name,
        email: payload.email,
        schedule: payload.schedule,
        grace_period_seconds: payload.grace_period,
        status: payload.status,
    };
    let updated = state
        .monitor_service
        .update(id, &owner_email, changes, Utc::now())
        .await?;
    Ok(Json(updated))
}

#[axum::debug_handler]
async fn delete_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteMonitorQuery>,
) -> Result<impl IntoResponse, AppError> {
    let owner_email = query.email.unwrap_or_default();
    state.monitor_service.delete(id, &owner_email).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
