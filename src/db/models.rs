use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a monitor. Stored lowercase in the `status` column and
/// serialized the same way on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    /// Created but never pinged.
    New,
    /// Last ping arrived within the grace period.
    Up,
    /// The grace period elapsed without a ping.
    Down,
    /// Ignored by the sweep; pings are dropped.
    Paused,
}

impl MonitorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::New => "new",
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Paused => "paused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(MonitorStatus::New),
            "up" => Some(MonitorStatus::Up),
            "down" => Some(MonitorStatus::Down),
            "paused" => Some(MonitorStatus::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an alert: the monitor went down, or it came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Down,
    Up,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Down => "down",
            AlertKind::Up => "up",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "down" => Some(AlertKind::Down),
            "up" => Some(AlertKind::Up),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked cron job. Corresponds to the `monitors` table.
///
/// The slug is the unguessable ping address; possession of the owner email is
/// what authorizes updates and deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub email: String,
    /// Human-readable schedule, e.g. "*/5 * * * *". Informational only; the
    /// overdue calculation uses `last_ping` and the grace period alone.
    pub schedule: Option<String>,
    /// Seconds after `last_ping` before the monitor counts as overdue.
    #[serde(rename = "gracePeriod")]
    pub grace_period_seconds: i32,
    pub status: MonitorStatus,
    pub last_ping: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A received heartbeat. Corresponds to the `pings` table. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ping {
    pub id: Uuid,
    pub monitor_id: Uuid,
    pub received_at: DateTime<Utc>,
    /// Client address as reported by proxy headers; "unknown" when absent.
    pub source: String,
}

/// A record of an alert emitted for a status transition.
/// Corresponds to the `alerts` table. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub monitor_id: Uuid,
    pub kind: AlertKind,
    pub sent_at: DateTime<Utc>,
}

/// List view of a monitor together with its event counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorWithCounts {
    #[serde(flatten)]
    pub monitor: Monitor,
    pub ping_count: i64,
    pub alert_count: i64,
}

/// Partial update applied to a monitor. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub schedule: Option<String>,
    pub grace_period_seconds: Option<i32>,
    pub status: Option<MonitorStatus>,
}
