//! Pure decision logic for the monitor state machine.
//!
//! Nothing in here touches the store or the network; both the overdue sweep
//! and the ping handler call these functions on a snapshot of a record and
//! then commit the verdict through the store's compare-and-update.

use chrono::{DateTime, Duration, Utc};

use crate::db::models::{AlertKind, Monitor, MonitorStatus};

/// Verdict of the sweep for one monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub next_status: MonitorStatus,
    pub alert: Option<AlertKind>,
}

impl Decision {
    fn unchanged(status: MonitorStatus) -> Self {
        Decision {
            next_status: status,
            alert: None,
        }
    }
}

/// Decides whether a monitor is overdue at `now`.
///
/// A monitor is overdue when strictly more than its grace period has elapsed
/// since `last_ping`; an elapsed time of exactly the grace period is still on
/// time. Paused monitors are never flagged, `down` monitors stay down until a
/// ping arrives, and a `new` monitor without any ping is unstarted rather
/// than late. A `new` monitor that somehow carries a `last_ping` is judged
/// like an `up` one.
pub fn decide(monitor: &Monitor, now: DateTime<Utc>) -> Decision {
    match monitor.status {
        MonitorStatus::Paused | MonitorStatus::Down => Decision::unchanged(monitor.status),
        MonitorStatus::New | MonitorStatus::Up => {
            let Some(last_ping) = monitor.last_ping else {
                return Decision::unchanged(monitor.status);
            };
            let grace = Duration::seconds(i64::from(monitor.grace_period_seconds));
            if now.signed_duration_since(last_ping) > grace {
                Decision {
                    next_status: MonitorStatus::Down,
                    alert: Some(AlertKind::Down),
                }
            } else {
                Decision::unchanged(monitor.status)
            }
        }
    }
}

/// What the ping handler should do with an incoming ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingDisposition {
    /// Drop the ping entirely: no record, no status change, no alert.
    Paused,
    /// Record it; `recovered` marks a ping that ends a down episode.
    Accepted { recovered: bool },
}

/// Classifies a ping against the status the monitor held when it arrived.
/// The paused policy is uniform across every ingress method.
pub fn classify_ping(status: MonitorStatus) -> PingDisposition {
    match status {
        MonitorStatus::Paused => PingDisposition::Paused,
        MonitorStatus::Down => PingDisposition::Accepted { recovered: true },
        MonitorStatus::New | MonitorStatus::Up => PingDisposition::Accepted { recovered: false },
    }
}
