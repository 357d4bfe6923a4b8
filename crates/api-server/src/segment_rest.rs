//! REST handlers for catalogs, preview, segment CRUD and RFM distribution.

use crate::rest::{ApiError, AppState};
use audience_core::types::UserRecord;
use audience_segmentation::catalog::{
    self, FieldDefinition, OperatorDefinition, TimeframeDefinition, ValueType,
};
use audience_segmentation::rfm::RfmBucket;
use audience_segmentation::{Criterion, NewSegment, Segment, SegmentUpdate};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub conditions: Vec<Criterion>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PreviewResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct MembersQuery {
    #[serde(default = "default_member_limit")]
    pub limit: usize,
}

fn default_member_limit() -> usize {
    100
}

// ─── Catalog ───────────────────────────────────────────────────────────────

pub async fn list_fields() -> Json<&'static [FieldDefinition]> {
    Json(catalog::fields())
}

pub async fn list_operators(
    Path(value_type): Path<String>,
) -> Result<Json<&'static [OperatorDefinition]>, ApiError> {
    ValueType::from_key(&value_type)
        .map(|vt| Json(catalog::operators_for(vt)))
        .ok_or(ApiError::UnknownValueType(value_type))
}

/// Operators for a field key. Unknown keys get the string operator set.
pub async fn field_operators(Path(field): Path<String>) -> Json<&'static [OperatorDefinition]> {
    Json(catalog::operators_for(catalog::field_type(&field)))
}

pub async fn list_timeframes() -> Json<&'static [TimeframeDefinition]> {
    Json(catalog::timeframes())
}

// ─── Segments ──────────────────────────────────────────────────────────────

pub async fn preview_segment(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let count = state.service.preview(&req.conditions).await?;
    Ok(Json(PreviewResponse { count }))
}

pub async fn list_segments(State(state): State<AppState>) -> Result<Json<Vec<Segment>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

pub async fn get_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Segment>, ApiError> {
    Ok(Json(state.service.get(id).await?))
}

pub async fn create_segment(
    State(state): State<AppState>,
    Json(req): Json<NewSegment>,
) -> Result<(StatusCode, Json<Segment>), ApiError> {
    let segment = state.service.create(req).await?;
    Ok((StatusCode::CREATED, Json(segment)))
}

pub async fn update_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SegmentUpdate>,
) -> Result<Json<Segment>, ApiError> {
    Ok(Json(state.service.update(id, req).await?))
}

pub async fn delete_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn refresh_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Segment>, ApiError> {
    Ok(Json(state.service.refresh_count(id).await?))
}

/// GET /api/v1/segments/:id/users — users currently matching the segment.
pub async fn segment_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<MembersQuery>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.service.members(id, query.limit).await?))
}

// ─── Users ─────────────────────────────────────────────────────────────────

pub async fn rfm_distribution(
    State(state): State<AppState>,
) -> Result<Json<Vec<RfmBucket>>, ApiError> {
    Ok(Json(state.service.rfm_distribution().await?))
}
