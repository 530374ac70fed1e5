//! API server: consumer rollup routes, upstream-compatible analytics routes
//! and operational probes on one HTTP listener.

use crate::analytics_rest;
use crate::dataset::Dataset;
use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use axum::routing::get;
use axum::Router;
use funnel_core::config::AppConfig;
use funnel_reporting::RollupOrchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub struct ApiServer {
    config: AppConfig,
    orchestrator: Arc<RollupOrchestrator>,
    dataset: Option<Arc<Dataset>>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        orchestrator: Arc<RollupOrchestrator>,
        dataset: Option<Arc<Dataset>>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            dataset,
        }
    }

    fn state(&self) -> AppState {
        AppState {
            orchestrator: self.orchestrator.clone(),
            dataset: self.dataset.clone(),
            dataset_configured: self.config.dataset.path.is_some(),
            node_id: self.config.node_id.clone(),
            default_days: self.config.source.default_days,
            default_limit: self.config.dataset.default_limit,
            raw_limit: self.config.dataset.raw_limit,
            start_time: Instant::now(),
        }
    }

    /// All routes with middleware applied.
    pub fn router(&self) -> Router {
        Router::new()
            // Consumer routes
            .route("/v1/rollup/:dimension", get(rest::handle_rollup))
            .route(
                "/v1/dashboard",
                get(rest::handle_dashboard).post(rest::handle_dashboard_update),
            )
            // Upstream-compatible routes
            .route("/api/analytics/:dimension", get(analytics_rest::handle_analytics))
            .route("/api/data", get(analytics_rest::handle_data))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .with_state(self.state())
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            // Middleware
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .layer(CompressionLayer::new()),
            )
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
