pub mod monitor_routes;
pub mod ping_routes;
pub mod sweep_routes;
