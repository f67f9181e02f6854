use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info};
use uuid::Uuid;

use crate::alerting::transition::{PingDisposition, classify_ping};
use crate::db::models::{Alert, AlertKind, Monitor, MonitorStatus, Ping};
use crate::db::store::{CasOutcome, MonitorStore, StoreError};
use crate::notifications::{AlertNotifier, format_downtime};

/// Commit attempts before a ping gives up. Each retry follows a lost race
/// against the sweep or another ping, so exhausting this many means the
/// record is pathologically hot.
const MAX_COMMIT_ATTEMPTS: usize = 8;

#[derive(Error, Debug)]
pub enum PingError {
    #[error("monitor not found")]
    UnknownSlug,
    #[error("monitor is changing too quickly; retry shortly")]
    Contended,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What became of an accepted ping.
#[derive(Debug, Clone, PartialEq)]
pub enum PingOutcome {
    /// The monitor is paused; the ping was dropped without a trace.
    Paused,
    /// The ping was recorded. `recovered` marks the one ping that ended a
    /// down episode.
    Accepted { monitor: Monitor, recovered: bool },
}

/// Ingress side of the state machine: turns an incoming ping into a
/// committed `(up, last_ping)` transition and, when the ping ends a down
/// episode, emits the recovery alert.
pub struct PingService {
    store: Arc<dyn MonitorStore>,
    notifier: Arc<dyn AlertNotifier>,
    notify_timeout: Duration,
}

impl PingService {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        notifier: Arc<dyn AlertNotifier>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            notify_timeout,
        }
    }

    /// Records a ping for the monitor behind `slug`.
    ///
    /// The pre-state that wins the commit decides `recovered`; a concurrent
    /// ping or sweep costs a retry against fresh state, never a duplicate
    /// recovery alert.
    pub async fn record_ping(
        &self,
        slug: &str,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<PingOutcome, PingError> {
        let Some(mut monitor) = self.store.monitor_by_slug(slug).await? else {
            return Err(PingError::UnknownSlug);
        };

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let recovered = match classify_ping(monitor.status) {
                PingDisposition::Paused => return Ok(PingOutcome::Paused),
                PingDisposition::Accepted { recovered } => recovered,
            };

            match self
                .store
                .compare_and_update_status(
                    monitor.id,
                    monitor.status,
                    monitor.last_ping,
                    MonitorStatus::Up,
                    Some(now),
                    now,
                )
                .await?
            {
                CasOutcome::Updated(updated) => {
                    // The transition is committed; history bookkeeping must
                    // not turn a healthy ping into a client-visible failure.
                    if let Err(e) = self
                        .store
                        .append_ping(Ping {
                            id: Uuid::new_v4(),
                            monitor_id: updated.id,
                            received_at: now,
                            source: source.to_string(),
                        })
                        .await
                    {
                        error!(slug = %updated.slug, error = %e, "Failed to record ping history.");
                    }

                    if recovered {
                        self.emit_recovery(&updated, now).await;
                    }

                    return Ok(PingOutcome::Accepted {
                        monitor: updated,
                        recovered,
                    });
                }
                CasOutcome::Conflict => match self.store.monitor_by_id(monitor.id).await? {
                    Some(fresh) => monitor = fresh,
                    None => return Err(PingError::UnknownSlug),
                },
                CasOutcome::Missing => return Err(PingError::UnknownSlug),
            }
        }

        Err(PingError::Contended)
    }

    async fn emit_recovery(&self, monitor: &Monitor, now: DateTime<Utc>) {
        let downtime = match self
            .store
            .latest_alert_of_kind(monitor.id, AlertKind::Down)
            .await
        {
            Ok(Some(down_alert)) => format_downtime(now.signed_duration_since(down_alert.sent_at)),
            Ok(None) => "an unknown duration".to_string(),
            Err(e) => {
                error!(slug = %monitor.slug, error = %e, "Failed to look up the down alert for downtime.");
                "an unknown duration".to_string()
            }
        };

        // Record first; a transition without its alert record would make the
        // history lie about what was attempted.
        if let Err(e) = self
            .store
            .append_alert(Alert {
                id: Uuid::new_v4(),
                monitor_id: monitor.id,
                kind: AlertKind::Up,
                sent_at: now,
            })
            .await
        {
            error!(slug = %monitor.slug, error = %e, "Failed to record recovery alert.");
            return;
        }

        info!(monitor_name = %monitor.name, downtime = %downtime, "Monitor recovered; alerting.");

        match timeout(
            self.notify_timeout,
            self.notifier
                .send_up(&monitor.email, &monitor.name, &downtime),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(slug = %monitor.slug, error = %e, "Failed to deliver recovery alert.");
            }
            Err(_) => {
                error!(slug = %monitor.slug, "Recovery alert delivery timed out.");
            }
        }
    }
}
