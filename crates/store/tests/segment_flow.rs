//! End-to-end segment flow against the in-memory backend: compose, preview,
//! create, read back, refresh and delete.

use audience_core::config::{BackendConfig, BackendKind};
use audience_core::AudienceError;
use audience_segmentation::{
    ComposerAction, CriteriaComposer, CriterionPatch, Joiner, NewSegment, SegmentCriteria,
    SegmentStatus, SegmentType, Timeframe,
};
use audience_store::service_from_config;

fn memory_config() -> BackendConfig {
    BackendConfig {
        kind: BackendKind::Memory,
        seed_demo_data: true,
        ..Default::default()
    }
}

/// Drive the composer the way a form would: add rows, pick fields, then
/// operators and values.
fn compose() -> CriteriaComposer {
    let steps = [
        ComposerAction::Append,
        ComposerAction::Patch(0, CriterionPatch::field("country")),
        ComposerAction::Patch(0, CriterionPatch::operator("equals")),
        ComposerAction::Patch(0, CriterionPatch::value("US")),
        ComposerAction::Append,
        ComposerAction::Patch(1, CriterionPatch::field("total_spent")),
        ComposerAction::Patch(1, CriterionPatch::operator("greater_than")),
        ComposerAction::Patch(1, CriterionPatch::value("500")),
        ComposerAction::Patch(1, CriterionPatch::joiner(Joiner::And)),
    ];
    steps
        .iter()
        .fold(CriteriaComposer::new(), |composer, action| composer.apply(action))
}

#[tokio::test]
async fn test_preview_then_create_stores_criteria_and_count() {
    let service = service_from_config(&memory_config()).unwrap();
    let composer = compose();

    let count = service.preview(composer.criteria()).await.unwrap();
    assert_eq!(count, 2);

    let created = service
        .create(NewSegment {
            name: "High-value US".to_string(),
            description: Some("Spent over 500".to_string()),
            segment_type: SegmentType::Dynamic,
            criteria: SegmentCriteria::new(composer.criteria().to_vec()),
            user_count: count,
            created_by: None,
        })
        .await
        .unwrap();

    assert_eq!(created.status, SegmentStatus::Active);
    assert_eq!(created.user_count, count);

    let fetched = service.get(created.id).await.unwrap();
    assert_eq!(fetched.criteria.conditions, composer.criteria());
    assert_eq!(fetched.criteria.conditions[0].field, "country");
    assert_eq!(fetched.criteria.conditions[1].operator, "greater_than");

    let listed = service.list().await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
async fn test_persisted_criteria_survive_json_round_trip() {
    let service = service_from_config(&memory_config()).unwrap();
    let composer = compose()
        .appended()
        .patched(2, &CriterionPatch::field("events.page_view"))
        .patched(2, &CriterionPatch::operator("performed"))
        .patched(2, &CriterionPatch::timeframe(Some(Timeframe::SevenDays)))
        .patched(2, &CriterionPatch::joiner(Joiner::Or));

    let created = service
        .create(NewSegment {
            name: "Engaged".to_string(),
            description: None,
            segment_type: SegmentType::Static,
            criteria: SegmentCriteria::new(composer.criteria().to_vec()),
            user_count: 0,
            created_by: Some("analyst".to_string()),
        })
        .await
        .unwrap();

    let wire = serde_json::to_string(&service.get(created.id).await.unwrap()).unwrap();
    let decoded: audience_segmentation::Segment = serde_json::from_str(&wire).unwrap();
    assert_eq!(decoded.criteria.conditions, composer.criteria());
    assert_eq!(decoded.segment_type, SegmentType::Static);
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let service = service_from_config(&memory_config()).unwrap();
    let first = service.list().await.unwrap().remove(0);
    service.delete(first.id).await.unwrap();
    assert!(matches!(
        service.get(first.id).await,
        Err(AudienceError::NotFound(id)) if id == first.id
    ));
}

#[tokio::test]
async fn test_unseeded_backend_starts_empty() {
    let service = service_from_config(&BackendConfig {
        seed_demo_data: false,
        ..memory_config()
    })
    .unwrap();
    assert!(service.list().await.unwrap().is_empty());
    assert_eq!(service.preview(&[]).await.unwrap(), 0);
    assert_eq!(service.backend_name(), "memory");
}
