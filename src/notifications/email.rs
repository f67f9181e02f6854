use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::json;
use tera::{Context, Tera};

use super::templates;
use super::{AlertNotifier, NotifyError};

/// Sends alert emails through a Resend-compatible HTTP API.
pub struct EmailNotifier {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailNotifier {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            from,
        }
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let endpoint = format!("{}/emails", self.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(NotifyError::Delivery(format!(
                "Email API returned non-success status: {status}. Body: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for EmailNotifier {
    async fn send_down(
        &self,
        email: &str,
        monitor_name: &str,
        last_ping: Option<DateTime<Utc>>,
        ping_url: &str,
    ) -> Result<(), NotifyError> {
        let last_ping_text = match last_ping {
            Some(at) => format!(
                "Last successful ping: {}",
                at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            None => "No pings received yet".to_string(),
        };

        let mut context = Context::new();
        context.insert("monitor_name", monitor_name);
        context.insert("last_ping_text", &last_ping_text);
        context.insert("ping_url", ping_url);
        let html = Tera::one_off(templates::DOWN_EMAIL_HTML, &context, true)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        self.send(email, &templates::down_subject(monitor_name), &html)
            .await
    }

    async fn send_up(
        &self,
        email: &str,
        monitor_name: &str,
        downtime: &str,
    ) -> Result<(), NotifyError> {
        let mut context = Context::new();
        context.insert("monitor_name", monitor_name);
        context.insert("downtime", downtime);
        let html = Tera::one_off(templates::UP_EMAIL_HTML, &context, true)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        self.send(email, &templates::up_subject(monitor_name), &html)
            .await
    }
}
