//! Alert copy shared by the notifier transports.

pub fn down_subject(monitor_name: &str) -> String {
    format!("[DOWN] {monitor_name} is not responding")
}

pub fn up_subject(monitor_name: &str) -> String {
    format!("[RECOVERED] {monitor_name} is back up")
}

pub const DOWN_EMAIL_HTML: &str = r#"
<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #dc2626;">Your cron job "{{ monitor_name }}" is DOWN</h2>
  <p>We haven't received a ping within the expected timeframe.</p>
  <p style="color: #6b7280;">{{ last_ping_text }}</p>
  <p style="margin-top: 24px;">
    <strong>Ping URL:</strong><br/>
    <code style="background: #f3f4f6; padding: 8px 12px; display: inline-block; border-radius: 4px;">{{ ping_url }}</code>
  </p>
  <hr style="margin: 24px 0; border: none; border-top: 1px solid #e5e7eb;" />
  <p style="color: #9ca3af; font-size: 12px;">
    Sent by CronPing - Simple cron job monitoring
  </p>
</div>
"#;

pub const UP_EMAIL_HTML: &str = r#"
<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #16a34a;">Your cron job "{{ monitor_name }}" has RECOVERED</h2>
  <p>We received a successful ping after being down.</p>
  <p style="color: #6b7280;">Downtime duration: {{ downtime }}</p>
  <hr style="margin: 24px 0; border: none; border-top: 1px solid #e5e7eb;" />
  <p style="color: #9ca3af; font-size: 12px;">
    Sent by CronPing - Simple cron job monitoring
  </p>
</div>
"#;

/// Body used by the webhook transport when no custom template is configured.
pub const DEFAULT_WEBHOOK_BODY: &str = r#"{
  "event": "{{ event }}",
  "monitor": "{{ monitor_name }}",
  "message": "{{ message }}"
}"#;
