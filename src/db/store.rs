use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    Alert, AlertKind, Monitor, MonitorChanges, MonitorStatus, MonitorWithCounts, Ping,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("monitor no longer exists")]
    MonitorGone,
    #[error("slug already in use: {0}")]
    SlugTaken(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Result of a conditional status commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The expected pre-state matched; the returned record carries the new state.
    Updated(Monitor),
    /// Another writer changed the record first. Nothing was written.
    Conflict,
    /// The monitor was deleted out from under the caller.
    Missing,
}

/// Persistence boundary for monitors and their event history.
///
/// `compare_and_update_status` is the only way status and `last_ping` change
/// after creation. Both the overdue sweep and the ping handler decide on a
/// snapshot of the record and commit against exactly that snapshot, so a
/// record that moved in the meantime surfaces as [`CasOutcome::Conflict`]
/// rather than a silently clobbered write.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Persists a fully-formed monitor record. Fails with
    /// [`StoreError::SlugTaken`] when the slug is already allocated.
    async fn create_monitor(&self, monitor: Monitor) -> Result<Monitor, StoreError>;

    async fn monitor_by_id(&self, id: Uuid) -> Result<Option<Monitor>, StoreError>;

    async fn monitor_by_slug(&self, slug: &str) -> Result<Option<Monitor>, StoreError>;

    /// All monitors, newest first, with ping and alert counts.
    async fn list_monitors(&self) -> Result<Vec<MonitorWithCounts>, StoreError>;

    /// Monitors whose status is one of `statuses`, oldest first.
    async fn monitors_in_status(
        &self,
        statuses: &[MonitorStatus],
    ) -> Result<Vec<Monitor>, StoreError>;

    /// Applies a partial update. Returns `None` when the monitor is gone.
    async fn update_monitor(
        &self,
        id: Uuid,
        changes: MonitorChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Monitor>, StoreError>;

    /// Atomically moves `(status, last_ping)` from the expected pre-state to
    /// the new state, stamping `updated_at` with `now`. The comparison covers
    /// both fields; a record touched by any other writer since the caller
    /// read it fails the compare.
    #[allow(clippy::too_many_arguments)]
    async fn compare_and_update_status(
        &self,
        id: Uuid,
        expected_status: MonitorStatus,
        expected_last_ping: Option<DateTime<Utc>>,
        new_status: MonitorStatus,
        new_last_ping: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError>;

    /// Deletes the monitor and, with it, every ping and alert it owns.
    /// Returns `false` when there was nothing to delete.
    async fn delete_monitor(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn append_ping(&self, ping: Ping) -> Result<(), StoreError>;

    /// Most recent pings, newest first.
    async fn recent_pings(&self, monitor_id: Uuid, limit: i64) -> Result<Vec<Ping>, StoreError>;

    async fn append_alert(&self, alert: Alert) -> Result<(), StoreError>;

    /// Most recent alerts, newest first.
    async fn recent_alerts(&self, monitor_id: Uuid, limit: i64) -> Result<Vec<Alert>, StoreError>;

    /// The latest alert of the given kind, if any was ever recorded.
    async fn latest_alert_of_kind(
        &self,
        monitor_id: Uuid,
        kind: AlertKind,
    ) -> Result<Option<Alert>, StoreError>;
}
