use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use async_trait::async_trait;

use super::models::{
    Alert, AlertKind, Monitor, MonitorChanges, MonitorStatus, MonitorWithCounts, Ping,
};
use super::store::{CasOutcome, MonitorStore, StoreError};

/// In-memory [`MonitorStore`] used by tests and by deployments that run
/// without a database. A record's dashmap entry guard doubles as its
/// per-record critical section, so the compare-and-update below is atomic
/// without any global lock.
#[derive(Default)]
pub struct MemoryStore {
    monitors: DashMap<Uuid, Monitor>,
    slugs: DashMap<String, Uuid>,
    pings: DashMap<Uuid, Vec<Ping>>,
    alerts: DashMap<Uuid, Vec<Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn create_monitor(&self, monitor: Monitor) -> Result<Monitor, StoreError> {
        match self.slugs.entry(monitor.slug.clone()) {
            Entry::Occupied(_) => return Err(StoreError::SlugTaken(monitor.slug)),
            Entry::Vacant(vacant) => {
                vacant.insert(monitor.id);
            }
        }
        self.monitors.insert(monitor.id, monitor.clone());
        Ok(monitor)
    }

    async fn monitor_by_id(&self, id: Uuid) -> Result<Option<Monitor>, StoreError> {
        Ok(self.monitors.get(&id).map(|entry| entry.clone()))
    }

    async fn monitor_by_slug(&self, slug: &str) -> Result<Option<Monitor>, StoreError> {
        let id = match self.slugs.get(slug) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.monitors.get(&id).map(|entry| entry.clone()))
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorWithCounts>, StoreError> {
        let mut listed: Vec<MonitorWithCounts> = self
            .monitors
            .iter()
            .map(|entry| {
                let monitor = entry.value().clone();
                let ping_count = self
                    .pings
                    .get(&monitor.id)
                    .map(|pings| pings.len() as i64)
                    .unwrap_or(0);
                let alert_count = self
                    .alerts
                    .get(&monitor.id)
                    .map(|alerts| alerts.len() as i64)
                    .unwrap_or(0);
                MonitorWithCounts {
                    monitor,
                    ping_count,
                    alert_count,
                }
            })
            .collect();
        listed.sort_by(|a, b| b.monitor.created_at.cmp(&a.monitor.created_at));
        Ok(listed)
    }

    async fn monitors_in_status(
        &self,
        statuses: &[MonitorStatus],
    ) -> Result<Vec<Monitor>, StoreError> {
        let mut matching: Vec<Monitor> = self
            .monitors
            .iter()
            .filter(|entry| statuses.contains(&entry.value().status))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn update_monitor(
        &self,
        id: Uuid,
        changes: MonitorChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Monitor>, StoreError> {
        let Some(mut entry) = self.monitors.get_mut(&id) else {
            return Ok(None);
        };
        let monitor = entry.value_mut();
        if let Some(name) = changes.name {
            monitor.name = name;
        }
        if let Some(email) = changes.email {
            monitor.email = email;
        }
        if let Some(schedule) = changes.schedule {
            monitor.schedule = Some(schedule);
        }
        if let Some(grace) = changes.grace_period_seconds {
            monitor.grace_period_seconds = grace;
        }
        if let Some(status) = changes.status {
            monitor.status = status;
        }
        monitor.updated_at = now;
        Ok(Some(monitor.clone()))
    }

    async fn compare_and_update_status(
        &self,
        id: Uuid,
        expected_status: MonitorStatus,
        expected_last_ping: Option<DateTime<Utc>>,
        new_status: MonitorStatus,
        new_last_ping: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        let Some(mut entry) = self.monitors.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        let monitor = entry.value_mut();
        if monitor.status != expected_status || monitor.last_ping != expected_last_ping {
            return Ok(CasOutcome::Conflict);
        }
        monitor.status = new_status;
        monitor.last_ping = new_last_ping;
        monitor.updated_at = now;
        Ok(CasOutcome::Updated(monitor.clone()))
    }

    async fn delete_monitor(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some((_, monitor)) = self.monitors.remove(&id) else {
            return Ok(false);
        };
        self.slugs.remove(&monitor.slug);
        self.pings.remove(&id);
        self.alerts.remove(&id);
        Ok(true)
    }

    async fn append_ping(&self, ping: Ping) -> Result<(), StoreError> {
        if !self.monitors.contains_key(&ping.monitor_id) {
            return Err(StoreError::MonitorGone);
        }
        self.pings.entry(ping.monitor_id).or_default().push(ping);
        Ok(())
    }

    async fn recent_pings(&self, monitor_id: Uuid, limit: i64) -> Result<Vec<Ping>, StoreError> {
        let Some(pings) = self.pings.get(&monitor_id) else {
            return Ok(Vec::new());
        };
        Ok(pings
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn append_alert(&self, alert: Alert) -> Result<(), StoreError> {
        if !self.monitors.contains_key(&alert.monitor_id) {
            return Err(StoreError::MonitorGone);
        }
        self.alerts.entry(alert.monitor_id).or_default().push(alert);
        Ok(())
    }

    async fn recent_alerts(&self, monitor_id: Uuid, limit: i64) -> Result<Vec<Alert>, StoreError> {
        let Some(alerts) = self.alerts.get(&monitor_id) else {
            return Ok(Vec::new());
        };
        Ok(alerts
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn latest_alert_of_kind(
        &self,
        monitor_id: Uuid,
        kind: AlertKind,
    ) -> Result<Option<Alert>, StoreError> {
        let Some(alerts) = self.alerts.get(&monitor_id) else {
            return Ok(None);
        };
        Ok(alerts.iter().rev().find(|a| a.kind == kind).cloned())
    }
}
