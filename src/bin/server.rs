use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cronping::alerting::sweep::SweepService;
use cronping::db::memory::MemoryStore;
use cronping::db::postgres::PgStore;
use cronping::db::store::MonitorStore;
use cronping::notifications::{AlertNotifier, EmailNotifier, LogNotifier, WebhookNotifier};
use cronping::server::config::{NotifierConfig, ServerConfig};
use cronping::services::{MonitorService, PingService};
use cronping::web::{AppState, create_router};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false) // No ANSI colors in file
        .json(); // Log as JSON

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Combine layers and filter based on RUST_LOG.
    // Default to `info` with the noisier dependencies turned down.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
        return;
    }
    info!("Shutdown signal received; stopping server.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            // Logging is not up yet; this must still reach the operator.
            eprintln!("Failed to load server configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.log_dir);
    info!("Starting cronping server.");

    // --- Monitor store setup ---
    let store: Arc<dyn MonitorStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .expect("Failed to create database connection.");
            store
                .migrate()
                .await
                .expect("Failed to run database migrations.");
            info!("Connected to the Postgres store.");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store. Monitors will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Alert notifier setup ---
    let notifier: Arc<dyn AlertNotifier> = match config.notifier.clone() {
        NotifierConfig::Email {
            api_url,
            api_key,
            from,
        } => match api_key {
            Some(api_key) => {
                info!("Email notifier configured.");
                Arc::new(EmailNotifier::new(api_url, api_key, from))
            }
            None => {
                warn!("Email notifier has no API key; alerts will only be logged.");
                Arc::new(LogNotifier)
            }
        },
        NotifierConfig::Webhook {
            url,
            headers,
            body_template,
        } => {
            info!(url = %url, "Webhook notifier configured.");
            Arc::new(WebhookNotifier::new(url, headers, body_template))
        }
        NotifierConfig::Log => {
            info!("Log-only notifier configured.");
            Arc::new(LogNotifier)
        }
    };

    // --- Services ---
    let sweep_service = Arc::new(SweepService::new(
        store.clone(),
        notifier.clone(),
        config.base_url.clone(),
        config.notify_timeout(),
    ));
    let ping_service = Arc::new(PingService::new(
        store.clone(),
        notifier.clone(),
        config.notify_timeout(),
    ));
    let monitor_service = Arc::new(MonitorService::new(store.clone()));

    // --- Periodic sweep task ---
    let sweep_interval = config.sweep_interval_seconds;
    if sweep_interval > 0 {
        let sweep = sweep_service.clone();
        tokio::spawn(async move {
            sweep.start_periodic_sweeps(sweep_interval).await;
        });
    } else {
        info!("Built-in sweep task disabled; relying on the external cron trigger.");
    }

    // --- Axum HTTP server setup ---
    let app_state = Arc::new(AppState {
        monitor_service,
        ping_service,
        sweep_service,
        config: config.clone(),
    });
    let router = create_router(app_state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.set_keepalive(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    info!(address = %addr, "HTTP server listening with TCP keepalive.");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Box::new)?;

    Ok(())
}
