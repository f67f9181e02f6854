use std::sync::Arc;

use axum::{Router, http::Method, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::alerting::sweep::SweepService;
use crate::server::config::ServerConfig;
use crate::services::{MonitorService, PingService};
use crate::web::routes::{monitor_routes, ping_routes, sweep_routes};

pub mod error;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub monitor_service: Arc<MonitorService>,
    pub ping_service: Arc<PingService>,
    pub sweep_service: Arc<SweepService>,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/monitors", monitor_routes::create_monitor_router())
        .nest("/api/ping", ping_routes::create_ping_router())
        .nest("/api/cron", sweep_routes::create_sweep_router())
        .with_state(app_state)
        .layer(cors)
}
