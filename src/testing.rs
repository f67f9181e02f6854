//! Shared fixtures for the unit tests in this crate.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::{Monitor, MonitorStatus};
use crate::notifications::{AlertNotifier, NotifyError};

pub(crate) fn sample_monitor(slug: &str) -> Monitor {
    let now = Utc::now();
    Monitor {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        name: "nightly backup".to_string(),
        email: "owner@example.com".to_string(),
        schedule: None,
        grace_period_seconds: 300,
        status: MonitorStatus::New,
        last_ping: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SentAlert {
    Down {
        email: String,
        monitor_name: String,
        last_ping: Option<DateTime<Utc>>,
        ping_url: String,
    },
    Up {
        email: String,
        monitor_name: String,
        downtime: String,
    },
}

/// Notifier that records every delivery instead of sending it.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<SentAlert>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sent(&self) -> Vec<SentAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn send_down(
        &self,
        email: &str,
        monitor_name: &str,
        last_ping: Option<DateTime<Utc>>,
        ping_url: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentAlert::Down {
            email: email.to_string(),
            monitor_name: monitor_name.to_string(),
            last_ping,
            ping_url: ping_url.to_string(),
        });
        Ok(())
    }

    async fn send_up(
        &self,
        email: &str,
        monitor_name: &str,
        downtime: &str,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentAlert::Up {
            email: email.to_string(),
            monitor_name: monitor_name.to_string(),
            downtime: downtime.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose every delivery fails.
pub(crate) struct FailingNotifier;

#[async_trait]
impl AlertNotifier for FailingNotifier {
    async fn send_down(
        &self,
        _email: &str,
        _monitor_name: &str,
        _last_ping: Option<DateTime<Utc>>,
        _ping_url: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp relay refused".to_string()))
    }

    async fn send_up(
        &self,
        _email: &str,
        _monitor_name: &str,
        _downtime: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp relay refused".to_string()))
    }
}

/// Notifier that hangs longer than any delivery timeout a test configures.
pub(crate) struct SlowNotifier {
    pub(crate) delay: std::time::Duration,
}

#[async_trait]
impl AlertNotifier for SlowNotifier {
    async fn send_down(
        &self,
        _email: &str,
        _monitor_name: &str,
        _last_ping: Option<DateTime<Utc>>,
        _ping_url: &str,
    ) -> Result<(), NotifyError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn send_up(
        &self,
        _email: &str,
        _monitor_name: &str,
        _downtime: &str,
    ) -> Result<(), NotifyError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
