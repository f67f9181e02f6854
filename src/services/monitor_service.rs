use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distr::{Alphanumeric, SampleString};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{
    Alert, Monitor, MonitorChanges, MonitorStatus, MonitorWithCounts, Ping,
};
use crate::db::store::{MonitorStore, StoreError};

const DEFAULT_GRACE_SECONDS: i32 = 300;
const SLUG_LENGTH: usize = 12;
const MAX_SLUG_ATTEMPTS: usize = 4;
const RECENT_PINGS_SHOWN: i64 = 50;
const RECENT_ALERTS_SHOWN: i64 = 10;

#[derive(Error, Debug)]
pub enum MonitorServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("monitor not found")]
    NotFound,
    #[error("owner email does not match")]
    NotOwner,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fields accepted when registering a monitor.
#[derive(Debug, Clone)]
pub struct NewMonitor {
    pub name: String,
    pub email: String,
    pub schedule: Option<String>,
    pub grace_period_seconds: Option<i32>,
}

/// A monitor together with its recent event history.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorDetail {
    pub monitor: Monitor,
    pub pings: Vec<Ping>,
    pub alerts: Vec<Alert>,
}

/// Registration and lifecycle management for monitors. Authorization is
/// possession of the owner email; there are no accounts.
pub struct MonitorService {
    store: Arc<dyn MonitorStore>,
}

impl MonitorService {
    pub fn new(store: Arc<dyn MonitorStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        new: NewMonitor,
        now: DateTime<Utc>,
    ) -> Result<Monitor, MonitorServiceError> {
        if new.name.trim().is_empty() || new.email.trim().is_empty() {
            return Err(MonitorServiceError::Validation(
                "Name and email are required".to_string(),
            ));
        }
        let grace = new.grace_period_seconds.unwrap_or(DEFAULT_GRACE_SECONDS);
        if grace <= 0 {
            return Err(MonitorServiceError::Validation(
                "Grace period must be a positive number of seconds".to_string(),
            ));
        }

        for _ in 0..MAX_SLUG_ATTEMPTS {
            let monitor = Monitor {
                id: Uuid::new_v4(),
                slug: random_slug(),
                name: new.name.clone(),
                email: new.email.clone(),
                schedule: new.schedule.clone(),
                grace_period_seconds: grace,
                status: MonitorStatus::New,
                last_ping: None,
                created_at: now,
                updated_at: now,
            };
            match self.store.create_monitor(monitor).await {
                Ok(created) => {
                    info!(slug = %created.slug, name = %created.name, "Monitor created.");
                    return Ok(created);
                }
                Err(StoreError::SlugTaken(slug)) => {
                    warn!(slug = %slug, "Generated slug collided; retrying.");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(MonitorServiceError::Store(StoreError::Unavailable(
            "could not allocate a unique slug".to_string(),
        )))
    }

    pub async fn list(&self) -> Result<Vec<MonitorWithCounts>, MonitorServiceError> {
        Ok(self.store.list_monitors().await?)
    }

    pub async fn detail(&self, id: Uuid) -> Result<MonitorDetail, MonitorServiceError> {
        let Some(monitor) = self.store.monitor_by_id(id).await? else {
            return Err(MonitorServiceError::NotFound);
        };
        let pings = self.store.recent_pings(id, RECENT_PINGS_SHOWN).await?;
        let alerts = self.store.recent_alerts(id, RECENT_ALERTS_SHOWN).await?;
        Ok(MonitorDetail {
            monitor,
            pings,
            alerts,
        })
    }

    /// Applies a partial update after the owner check. `status` may pause or
    /// resume the monitor; moving a pinged monitor back to `new` would forge
    /// the "never pinged" state and is rejected.
    pub async fn update(
        &self,
        id: Uuid,
        owner_email: &str,
        changes: MonitorChanges,
        now: DateTime<Utc>,
    ) -> Result<Monitor, MonitorServiceError> {
        let Some(current) = self.store.monitor_by_id(id).await? else {
            return Err(MonitorServiceError::NotFound);
        };
        if current.email != owner_email {
            return Err(MonitorServiceError::NotOwner);
        }

        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(MonitorServiceError::Validation(
                    "Name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(email) = &changes.email {
            if email.trim().is_empty() {
                return Err(MonitorServiceError::Validation(
                    "Email cannot be empty".to_string(),
                ));
            }
        }
        if let Some(grace) = changes.grace_period_seconds {
            if grace <= 0 {
                return Err(MonitorServiceError::Validation(
                    "Grace period must be a positive number of seconds".to_string(),
                ));
            }
        }
        if changes.status == Some(MonitorStatus::New) && current.last_ping.is_some() {
            return Err(MonitorServiceError::Validation(
                "A monitor that has received pings cannot return to new".to_string(),
            ));
        }

        match self.store.update_monitor(id, changes, now).await? {
            Some(updated) => {
                info!(slug = %updated.slug, "Monitor updated.");
                Ok(updated)
            }
            None => Err(MonitorServiceError::NotFound),
        }
    }

    pub async fn delete(&self, id: Uuid, owner_email: &str) -> Result<(), MonitorServiceError> {
        let Some(current) = self.store.monitor_by_id(id).await? else {
            return Err(MonitorServiceError::NotFound);
        };
        if current.email != owner_email {
            return Err(MonitorServiceError::NotOwner);
        }
        if !self.store.delete_monitor(id).await? {
            return Err(MonitorServiceError::NotFound);
        }
        info!(slug = %current.slug, "Monitor deleted.");
        Ok(())
    }
}

fn random_slug() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), SLUG_LENGTH)
}
