//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::{DashboardConfig, MAX_UPLOAD_BYTES};
use crate::views::Dashboard;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: DashboardConfig,
    pub dashboard: Arc<Dashboard>,
}

/// Web server for the dashboard.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: DashboardConfig, dashboard: Arc<Dashboard>) -> Self {
        Self {
            state: AppState { config, dashboard },
        }
    }

    /// Build the router with all routes.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Page
            .route("/", get(handlers::handle_dashboard))
            // Alert views
            .route("/api/table", get(handlers::handle_table))
            .route("/api/table/refresh", post(handlers::handle_table_refresh))
            .route("/api/chart", get(handlers::handle_chart))
            .route("/api/chart/refresh", post(handlers::handle_chart_refresh))
            // Dataset selector
            .route("/api/datasets", get(handlers::handle_datasets))
            .route("/api/datasets/local", post(handlers::handle_local_file))
            .route("/api/datasets/{id}/load", post(handlers::handle_load_dataset))
            // Upload form
            .route("/api/upload", get(handlers::handle_upload_status))
            .route("/api/upload/file", post(handlers::handle_upload_file))
            .route("/api/upload/drag/{phase}", post(handlers::handle_upload_drag))
            .route("/api/upload/drop", post(handlers::handle_upload_drop))
            .route("/api/upload/submit", post(handlers::handle_upload_submit))
            .route("/api/upload/reset", post(handlers::handle_upload_reset))
            // Static assets
            .route("/assets/{*path}", get(handlers::handle_asset))
            .route("/favicon.ico", get(handlers::handle_favicon))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            // Oversize files must still reach the form's size check.
            .layer(DefaultBodyLimit::max(2 * MAX_UPLOAD_BYTES as usize))
            .with_state(self.state.clone())
    }

    /// Serve on the configured port until `shutdown` resolves.
    pub async fn start(
        &self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.router();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
