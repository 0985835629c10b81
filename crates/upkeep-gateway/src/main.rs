use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use upkeep_core::config::UpkeepConfig;
use upkeep_scheduler::{ReminderPipeline, ReminderSchedule, ReminderScheduler};
use upkeep_store::{SqliteTaskStore, TaskStore};

mod app;
mod auth;
mod error;
mod http;

#[derive(Debug, Parser)]
#[command(name = "upkeep-gateway", version, about = "Maintenance task tracker API")]
struct Cli {
    /// Path to upkeep.toml (falls back to UPKEEP_CONFIG, then ~/.upkeep/upkeep.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "upkeep_gateway=info,upkeep_scheduler=info,upkeep_store=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("UPKEEP_CONFIG").ok());
    // A missing file yields defaults; a file that fails to load is fatal.
    let config =
        UpkeepConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::open(db_path)?);

    let notifier = upkeep_notify::build_notifier(&config.email)?;
    let pipeline = Arc::new(ReminderPipeline::new(Arc::clone(&store), notifier));

    let schedule = ReminderSchedule::parse(&config.reminders.cron)?;
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::clone(&pipeline),
        schedule,
        config.email.recipient.clone(),
    ));
    if config.reminders.enabled {
        scheduler.start();
    } else {
        info!("reminder scheduler disabled by config");
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store, pipeline, Arc::clone(&scheduler)));
    let router = app::build_router(state);

    info!("Upkeep gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
