use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Resolved runtime configuration: TOML file values layered under
/// environment-variable overrides, with defaults filling the rest.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Public base URL used to build ping URLs in alert messages.
    pub base_url: String,
    /// Postgres connection string; absent means the in-memory store.
    pub database_url: Option<String>,
    pub log_dir: String,
    /// Bearer token required by the sweep trigger endpoint when set.
    pub cron_secret: Option<String>,
    /// Period of the built-in sweep task. Zero disables it; an external
    /// scheduler can drive the trigger endpoint instead.
    pub sweep_interval_seconds: u64,
    pub notify_timeout_seconds: u64,
    pub notifier: NotifierConfig,
}

/// Alert transport selection. The TOML table's `mode` key picks the variant.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum NotifierConfig {
    Email {
        #[serde(default = "default_email_api_url")]
        api_url: String,
        api_key: Option<String>,
        #[serde(default = "default_email_from")]
        from: String,
    },
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        body_template: Option<String>,
    },
    Log,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig::Email {
            api_url: default_email_api_url(),
            api_key: None,
            from: default_email_from(),
        }
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    base_url: Option<String>,
    database_url: Option<String>,
    log_dir: Option<String>,
    cron_secret: Option<String>,
    sweep_interval_seconds: Option<u64>,
    notify_timeout_seconds: Option<u64>,
    notifier: Option<NotifierConfig>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_url() -> String {
    "https://cronping.dev".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_email_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_email_from() -> String {
    "CronPing <alerts@cronping.dev>".to_string()
}

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_NOTIFY_TIMEOUT_SECONDS: u64 = 10;

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = if let Some(path_str) = config_path {
            read_config_file(Path::new(path_str))?
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let mut env_config = env_overrides()?;
        if let Ok(key) = env::var("RESEND_API_KEY") {
            let mut notifier = env_config
                .notifier
                .or_else(|| file_config.notifier.clone())
                .unwrap_or_default();
            if let NotifierConfig::Email { api_key, .. } = &mut notifier {
                *api_key = Some(key);
            }
            env_config.notifier = Some(notifier);
        }

        // 3. Merge: environment overrides file
        Self::from_layers(file_config, env_config)
    }

    fn from_layers(
        file_config: PartialServerConfig,
        env_config: PartialServerConfig,
    ) -> Result<Self, String> {
        let config = ServerConfig {
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            base_url: env_config
                .base_url
                .or(file_config.base_url)
                .unwrap_or_else(default_base_url),
            database_url: env_config.database_url.or(file_config.database_url),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            cron_secret: env_config.cron_secret.or(file_config.cron_secret),
            sweep_interval_seconds: env_config
                .sweep_interval_seconds
                .or(file_config.sweep_interval_seconds)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS),
            notify_timeout_seconds: env_config
                .notify_timeout_seconds
                .or(file_config.notify_timeout_seconds)
                .unwrap_or(DEFAULT_NOTIFY_TIMEOUT_SECONDS),
            notifier: env_config
                .notifier
                .or(file_config.notifier)
                .unwrap_or_default(),
        };

        if config.notify_timeout_seconds == 0 {
            return Err("notify_timeout_seconds must be positive".to_string());
        }

        Ok(config)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_seconds)
    }
}

fn read_config_file(path: &Path) -> Result<PartialServerConfig, String> {
    if !path.exists() {
        return Ok(PartialServerConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}

fn env_overrides() -> Result<PartialServerConfig, String> {
    Ok(PartialServerConfig {
        listen_addr: env::var("LISTEN_ADDR").ok(),
        base_url: env::var("BASE_URL").ok(),
        database_url: env::var("DATABASE_URL").ok(),
        log_dir: env::var("LOG_DIR").ok(),
        cron_secret: env::var("CRON_SECRET").ok(),
        sweep_interval_seconds: read_env_u64("SWEEP_INTERVAL_SECONDS")?,
        notify_timeout_seconds: read_env_u64("NOTIFY_TIMEOUT_SECONDS")?,
        notifier: None,
    })
}

fn read_env_u64(name: &str) -> Result<Option<u64>, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| format!("{name} must be an integer: {e}")),
        Err(_) => Ok(None),
    }
}
