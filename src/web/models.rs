use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Alert, Monitor, MonitorStatus, Ping};
use crate::services::MonitorDetail;

/// Body of `POST /api/monitors`. Fields are optional so that a missing name
/// or email surfaces as the service's validation message rather than a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMonitorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub schedule: Option<String>,
    pub grace_period: Option<i32>,
}

/// Body of `PUT /api/monitors/{id}`. `owner_email` authorizes the change;
/// everything else is a partial update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMonitorRequest {
    pub owner_email: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub schedule: Option<String>,
    pub grace_period: Option<i32>,
    pub status: Option<MonitorStatus>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMonitorQuery {
    pub email: Option<String>,
}

/// Acknowledgement for an accepted ping. `monitor` carries the monitor's
/// display name.
#[derive(Debug, Serialize)]
pub struct PingAck {
    pub status: &'static str,
    pub monitor: String,
    pub timestamp: DateTime<Utc>,
    pub recovered: bool,
}

#[derive(Debug, Serialize)]
pub struct MonitorDetailResponse {
    #[serde(flatten)]
    pub monitor: Monitor,
    pub pings: Vec<Ping>,
    pub alerts: Vec<Alert>,
}

impl From<MonitorDetail> for MonitorDetailResponse {
    fn from(detail: MonitorDetail) -> Self {
        MonitorDetailResponse {
            monitor: detail.monitor,
            pings: detail.pings,
            alerts: detail.alerts,
        }
    }
}

/// Result of one sweep pass, as returned by the cron trigger endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub checked: u64,
    pub alerts_sent: u64,
    pub errors: u64,
}
