//! Shared REST state, error mapping and operational endpoints.

use audience_core::AudienceError;
use audience_store::SegmentService;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Instant;
use tracing::{error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: SegmentService,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: SegmentService, node_id: impl Into<String>) -> Self {
        Self {
            service,
            node_id: node_id.into(),
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler error. Validation problems are echoed to the caller; backend
/// failures are logged and reported generically.
#[derive(Debug)]
pub enum ApiError {
    Service(AudienceError),
    UnknownValueType(String),
}

impl From<AudienceError> for ApiError {
    fn from(e: AudienceError) -> Self {
        ApiError::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::UnknownValueType(key) => {
                let body = ErrorResponse {
                    error: "not_found".to_string(),
                    message: format!("unknown value type '{key}'"),
                };
                return (StatusCode::NOT_FOUND, Json(body)).into_response();
            }
            ApiError::Service(err) => err,
        };
        let (status, code, message) = match &err {
            AudienceError::Validation(e) => {
                warn!(error = %e, "Request validation failed");
                metrics::counter!("api.validation_errors").increment(1);
                (StatusCode::BAD_REQUEST, "validation_failed", e.to_string())
            }
            AudienceError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("segment {id} does not exist"),
            ),
            AudienceError::Timeout(_) => {
                error!(error = %err, "Backend request timed out");
                metrics::counter!("api.errors").increment(1);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "backend_timeout",
                    "Backend did not respond in time".to_string(),
                )
            }
            AudienceError::Backend(_) | AudienceError::Rejected { .. } => {
                error!(error = %err, "Backend request failed");
                metrics::counter!("api.errors").increment(1);
                (
                    StatusCode::BAD_GATEWAY,
                    "backend_failed",
                    "Backend request failed".to_string(),
                )
            }
            _ => {
                error!(error = %err, "Request failed");
                metrics::counter!("api.errors").increment(1);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal error".to_string(),
                )
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub backend: String,
    pub uptime_secs: u64,
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        backend: state.service.backend_name().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe. Ready once the backend answers a list call.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.service.list().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
