//! API server — builds the router and runs the HTTP listener.

use crate::rest::{self, AppState};
use crate::segment_rest;
use audience_core::config::AppConfig;
use audience_store::SegmentService;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Catalog
        .route("/api/v1/catalog/fields", get(segment_rest::list_fields))
        .route("/api/v1/catalog/fields/:field/operators", get(segment_rest::field_operators))
        .route("/api/v1/catalog/operators/:value_type", get(segment_rest::list_operators))
        .route("/api/v1/catalog/timeframes", get(segment_rest::list_timeframes))
        // Segments
        .route("/api/v1/segments/preview", post(segment_rest::preview_segment))
        .route("/api/v1/segments", get(segment_rest::list_segments).post(segment_rest::create_segment))
        .route(
            "/api/v1/segments/:id",
            get(segment_rest::get_segment)
                .put(segment_rest::update_segment)
                .delete(segment_rest::delete_segment),
        )
        .route("/api/v1/segments/:id/refresh", post(segment_rest::refresh_segment))
        .route("/api/v1/segments/:id/users", get(segment_rest::segment_members))
        // Users
        .route("/api/v1/users/rfm-distribution", get(segment_rest::rfm_distribution))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .with_state(state)
}

/// Main API server for the segment REST endpoints.
pub struct ApiServer {
    config: AppConfig,
    service: SegmentService,
}

impl ApiServer {
    pub fn new(config: AppConfig, service: SegmentService) -> Self {
        Self { config, service }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState::new(self.service.clone(), self.config.node_id.clone());

        let app = router(state)
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, backend = self.service.backend_name(), "Starting HTTP server");

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
