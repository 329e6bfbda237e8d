//! dockwatch - Docker Event Monitor
//!
//! Watches the Docker daemon's event stream and delivers selected lifecycle
//! events to the configured notification channels.

use anyhow::Result;
use clap::Parser;
use dockwatch::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment,
    // and CLI args. Exit if configuration fails, as it's a critical step.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    });

    // Initialize logging. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    info!("dockwatch starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_filter());
    info!(
        "Docker Host: {}",
        config.docker.host.as_deref().unwrap_or("system default")
    );
    if config.debounce.disabled {
        info!("Debounce: Disabled");
    } else {
        info!("Debounce Interval: {}s", config.debounce.min_interval_seconds);
        info!(
            "Console Bypasses Debounce: {}",
            if config.debounce.bypass_console { "Yes" } else { "No" }
        );
    }
    info!(
        "Slack Channel: {}",
        if config.slack.is_some() { "Enabled" } else { "Disabled" }
    );
    info!(
        "Telegram Channel: {}",
        if config.telegram.is_some() { "Enabled" } else { "Disabled" }
    );
    info!(
        "Email Channel: {}",
        if config.email.is_some() { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Shutting down gracefully...");
            let _ = shutdown_tx.send(true);
        }
    });

    app.run().await
}
