use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, header};
use tera::{Context, Tera};

use super::templates;
use super::{AlertNotifier, NotifyError};

/// POSTs alerts to a configured URL, rendering the body from a Tera template.
///
/// The template sees `event`, `monitor_name`, `message`, `ping_url`,
/// `last_ping` and `downtime`; unset values render as empty strings.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    headers: HashMap<String, String>,
    body_template: String,
}

impl WebhookNotifier {
    pub fn new(
        url: String,
        headers: HashMap<String, String>,
        body_template: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            url,
            headers,
            body_template: body_template
                .unwrap_or_else(|| templates::DEFAULT_WEBHOOK_BODY.to_string()),
        }
    }

    async fn post(&self, context: &Context) -> Result<(), NotifyError> {
        let mut header_map = header::HeaderMap::new();
        for (key, value) in &self.headers {
            let name = header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                NotifyError::InvalidConfiguration(format!("Invalid header name: {e}"))
            })?;
            let value = header::HeaderValue::from_str(value).map_err(|e| {
                NotifyError::InvalidConfiguration(format!("Invalid header value: {e}"))
            })?;
            header_map.insert(name, value);
        }

        let body = Tera::one_off(&self.body_template, context, true)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .headers(header_map)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(NotifyError::Delivery(format!(
                "Webhook returned non-success status: {status}. Body: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    async fn send_down(
        &self,
        _email: &str,
        monitor_name: &str,
        last_ping: Option<DateTime<Utc>>,
        ping_url: &str,
    ) -> Result<(), NotifyError> {
        let mut context = Context::new();
        context.insert("event", "down");
        context.insert("monitor_name", monitor_name);
        context.insert(
            "message",
            &format!("{monitor_name} has not pinged within its grace period"),
        );
        context.insert(
            "last_ping",
            &last_ping
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default(),
        );
        context.insert("ping_url", ping_url);
        context.insert("downtime", "");
        self.post(&context).await
    }

    async fn send_up(
        &self,
        _email: &str,
        monitor_name: &str,
        downtime: &str,
    ) -> Result<(), NotifyError> {
        let mut context = Context::new();
        context.insert("event", "up");
        context.insert("monitor_name", monitor_name);
        context.insert(
            "message",
            &format!("{monitor_name} is receiving pings again after {downtime}"),
        );
        context.insert("last_ping", "");
        context.insert("ping_url", "");
        context.insert("downtime", downtime);
        self.post(&context).await
    }
}
