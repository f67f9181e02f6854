use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Duration as TokioDuration, interval, timeout};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::db::models::{Alert, Monitor, MonitorStatus};
use crate::db::store::{CasOutcome, MonitorStore, StoreError};
use crate::notifications::AlertNotifier;

use super::transition::decide;

/// How often a sweep retries one monitor after losing a commit race. Every
/// conflict means another writer made progress, so a small bound suffices.
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Counters for one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub checked: u64,
    pub alerts_sent: u64,
    pub errors: u64,
}

enum SweepOutcome {
    Quiet,
    Alerted,
    NotifyFailed,
}

/// Walks every candidate monitor, commits overdue transitions, and fires the
/// down alerts. Safe to run concurrently with itself and with the ping
/// handler; the store's compare-and-update arbitrates every commit, so a
/// given down episode alerts at most once no matter how many sweeps overlap.
pub struct SweepService {
    store: Arc<dyn MonitorStore>,
    notifier: Arc<dyn AlertNotifier>,
    base_url: String,
    notify_timeout: Duration,
}

impl SweepService {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        notifier: Arc<dyn AlertNotifier>,
        base_url: String,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            base_url,
            notify_timeout,
        }
    }

    fn ping_url(&self, slug: &str) -> String {
        format!("{}/api/ping/{}", self.base_url.trim_end_matches('/'), slug)
    }

    /// Runs one sweep over all monitors that could become overdue. Failures
    /// are isolated per monitor: a store or delivery error is counted and the
    /// pass moves on.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();

        let candidates = match self
            .store
            .monitors_in_status(&[MonitorStatus::Up, MonitorStatus::New])
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Failed to enumerate monitors for sweep.");
                stats.errors += 1;
                return stats;
            }
        };

        debug!(count = candidates.len(), "Candidate monitors to check.");

        for monitor in candidates {
            stats.checked += 1;
            let slug = monitor.slug.clone();
            match self.sweep_one(monitor, now).await {
                Ok(SweepOutcome::Quiet) => {}
                Ok(SweepOutcome::Alerted) => stats.alerts_sent += 1,
                Ok(SweepOutcome::NotifyFailed) => stats.errors += 1,
                Err(e) => {
                    error!(slug = %slug, error = %e, "Sweep failed for monitor.");
                    stats.errors += 1;
                }
            }
        }

        stats
    }

    async fn sweep_one(
        &self,
        mut monitor: Monitor,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, StoreError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let decision = decide(&monitor, now);
            let Some(kind) = decision.alert else {
                return Ok(SweepOutcome::Quiet);
            };

            match self
                .store
                .compare_and_update_status(
                    monitor.id,
                    monitor.status,
                    monitor.last_ping,
                    decision.next_status,
                    monitor.last_ping,
                    now,
                )
                .await?
            {
                CasOutcome::Updated(updated) => {
                    info!(
                        monitor_name = %updated.name,
                        last_ping = ?updated.last_ping,
                        "Monitor is overdue; marked down."
                    );
                    // The alert record is the durable witness for this
                    // transition; it goes in before any delivery attempt and
                    // is never rolled back.
                    self.store
                        .append_alert(Alert {
                            id: Uuid::new_v4(),
                            monitor_id: updated.id,
                            kind,
                            sent_at: now,
                        })
                        .await?;

                    let delivery = timeout(
                        self.notify_timeout,
                        self.notifier.send_down(
                            &updated.email,
                            &updated.name,
                            updated.last_ping,
                            &self.ping_url(&updated.slug),
                        ),
                    )
                    .await;

                    return Ok(match delivery {
                        Ok(Ok(())) => SweepOutcome::Alerted,
                        Ok(Err(e)) => {
                            error!(slug = %updated.slug, error = %e, "Failed to deliver down alert.");
                            SweepOutcome::NotifyFailed
                        }
                        Err(_) => {
                            error!(slug = %updated.slug, "Down alert delivery timed out.");
                            SweepOutcome::NotifyFailed
                        }
                    });
                }
                CasOutcome::Conflict => {
                    // Another writer moved the record; re-read and re-decide.
                    match self.store.monitor_by_id(monitor.id).await? {
                        Some(fresh) => monitor = fresh,
                        None => return Ok(SweepOutcome::Quiet),
                    }
                }
                CasOutcome::Missing => return Ok(SweepOutcome::Quiet),
            }
        }
        // Persistent conflicts mean other writers keep making progress, and a
        // freshly written record is never overdue against the same clock.
        Ok(SweepOutcome::Quiet)
    }

    /// Periodic driver around [`run_sweep`]. The HTTP trigger may fire at any
    /// time in parallel; overlap is harmless.
    pub async fn start_periodic_sweeps(self: Arc<Self>, period_seconds: u64) {
        info!(interval_seconds = period_seconds, "Overdue sweep task started.");
        let mut interval = interval(TokioDuration::from_secs(period_seconds));
        loop {
            interval.tick().await;
            debug!("Running overdue sweep...");
            let stats = self.run_sweep(Utc::now()).await;
            if stats.alerts_sent > 0 || stats.errors > 0 {
                info!(
                    checked = stats.checked,
                    alerts_sent = stats.alerts_sent,
                    errors = stats.errors,
                    "Overdue sweep finished."
                );
            } else {
                debug!(checked = stats.checked, "Overdue sweep finished quietly.");
            }
        }
    }
}
