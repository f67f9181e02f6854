pub mod monitor_service;
pub mod ping_service;

pub use monitor_service::{MonitorDetail, MonitorService, MonitorServiceError, NewMonitor};
pub use ping_service::{PingError, PingOutcome, PingService};
