use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

pub mod email;
pub mod templates;
pub mod webhook;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to deliver alert: {0}")]
    Delivery(String),
    #[error("Invalid notifier configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    Template(String),
}

/// Outbound transport for monitor alerts.
///
/// Implementations report transient failure through `Err`; callers treat a
/// failed delivery as an error to count, never something to retry, since the
/// status transition that triggered it has already been committed.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Delivers the alert for a monitor that just went overdue.
    async fn send_down(
        &self,
        email: &str,
        monitor_name: &str,
        last_ping: Option<DateTime<Utc>>,
        ping_url: &str,
    ) -> Result<(), NotifyError>;

    /// Delivers the recovery alert once pings resume. `downtime` is already
    /// rendered as human-readable text.
    async fn send_up(
        &self,
        email: &str,
        monitor_name: &str,
        downtime: &str,
    ) -> Result<(), NotifyError>;
}

/// Notifier that only writes alerts to the log. Selected explicitly via
/// configuration, or used as the fallback when the email transport has no
/// API key.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn send_down(
        &self,
        email: &str,
        monitor_name: &str,
        last_ping: Option<DateTime<Utc>>,
        ping_url: &str,
    ) -> Result<(), NotifyError> {
        warn!(
            recipient = email,
            monitor_name,
            last_ping = ?last_ping,
            ping_url,
            "Monitor is down (log-only notifier)."
        );
        Ok(())
    }

    async fn send_up(
        &self,
        email: &str,
        monitor_name: &str,
        downtime: &str,
    ) -> Result<(), NotifyError> {
        warn!(
            recipient = email,
            monitor_name,
            downtime,
            "Monitor recovered (log-only notifier)."
        );
        Ok(())
    }
}

/// Renders a downtime duration as the two most significant non-zero units,
/// e.g. "9 seconds", "1 minute 10 seconds", "2 hours 5 minutes".
pub fn format_downtime(downtime: chrono::Duration) -> String {
    let total_seconds = downtime.num_seconds().max(0);
    let units = [
        (total_seconds / 86_400, "day"),
        (total_seconds % 86_400 / 3_600, "hour"),
        (total_seconds % 3_600 / 60, "minute"),
        (total_seconds % 60, "second"),
    ];

    let mut parts = Vec::with_capacity(2);
    for (value, unit) in units {
        if value > 0 {
            let plural = if value == 1 { "" } else { "s" };
            parts.push(format!("{value} {unit}{plural}"));
            if parts.len() == 2 {
                break;
            }
        }
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn downtime_renders_two_most_significant_units() {
        assert_eq!(format_downtime(Duration::seconds(9)), "9 seconds");
        assert_eq!(format_downtime(Duration::seconds(70)), "1 minute 10 seconds");
        assert_eq!(
            format_downtime(Duration::seconds(2 * 3600 + 5 * 60)),
            "2 hours 5 minutes"
        );
        assert_eq!(
            format_downtime(Duration::days(3) + Duration::hours(4)),
            "3 days 4 hours"
        );
    }

    #[test]
    fn downtime_skips_zero_middle_units() {
        assert_eq!(
            format_downtime(Duration::seconds(3601)),
            "1 hour 1 second"
        );
    }

    #[test]
    fn downtime_handles_singular_zero_and_negative() {
        assert_eq!(format_downtime(Duration::seconds(1)), "1 second");
        assert_eq!(format_downtime(Duration::seconds(0)), "0 seconds");
        assert_eq!(format_downtime(Duration::seconds(-5)), "0 seconds");
    }
}
