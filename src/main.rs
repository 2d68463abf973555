//! iotsentry - IoT threat-monitoring dashboard.
//!
//! Serves the dashboard page and its JSON views, backed by the scoring API.

use iotsentry::backend::BackendClient;
use iotsentry::config::DashboardConfig;
use iotsentry::views::Dashboard;
use iotsentry::web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("iotsentry=info".parse()?))
        .init();

    // Load configuration
    let cfg = DashboardConfig::load();
    tracing::info!("Starting iotsentry on port {}...", cfg.http_port);
    tracing::info!(
        "Using backend at {} (poll every {:?}, timeout {:?})",
        cfg.backend_url,
        cfg.poll_interval,
        cfg.request_timeout
    );

    let client = BackendClient::new(&cfg.backend_url, cfg.request_timeout)?;

    // Pollers start ticking as soon as the dashboard is mounted.
    let dashboard = Arc::new(Dashboard::mount(Arc::new(client), cfg.poll_interval));
    dashboard.mount_catalog();

    let server = Server::new(cfg, dashboard);
    server
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
