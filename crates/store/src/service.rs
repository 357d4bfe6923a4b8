//! Segment service — validation, preview and persistence on top of a backend.

use crate::backend::SegmentBackend;
use crate::policy::RequestPolicy;
use audience_core::types::UserRecord;
use audience_core::{AudienceError, AudienceResult};
use audience_segmentation::rfm::{self, RfmBucket};
use audience_segmentation::{
    validate_criteria, Criterion, NewSegment, Segment, SegmentUpdate,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on a single member listing.
pub const MAX_MEMBER_LIMIT: usize = 1000;

/// Entry point for every segment operation. Validation happens here, before
/// anything reaches the backend; backend calls run under the request policy.
#[derive(Clone)]
pub struct SegmentService {
    backend: Arc<dyn SegmentBackend>,
    policy: RequestPolicy,
}

impl SegmentService {
    pub fn new(backend: Arc<dyn SegmentBackend>, policy: RequestPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Count users matching `criteria`. An empty list counts everyone.
    pub async fn preview(&self, criteria: &[Criterion]) -> AudienceResult<u64> {
        validate_criteria(criteria)?;
        let backend = &self.backend;
        let count = self
            .policy
            .run("preview", move || backend.count_matching(criteria))
            .await?;
        metrics::counter!("segments.previewed").increment(1);
        debug!(criteria = criteria.len(), count, "Segment preview evaluated");
        Ok(count)
    }

    pub async fn create(&self, request: NewSegment) -> AudienceResult<Segment> {
        request.validate()?;
        let segment = request.into_segment(chrono::Utc::now());
        let backend = &self.backend;
        let candidate = &segment;
        let stored = match self
            .policy
            .run("create", move || backend.insert_segment(candidate.clone()))
            .await
        {
            Ok(stored) => stored,
            Err(AudienceError::Rejected { status: 409, message }) => self
                .recover_insert(&segment)
                .await?
                .ok_or(AudienceError::Rejected { status: 409, message })?,
            Err(e) => return Err(e),
        };
        metrics::counter!("segments.created").increment(1);
        info!(
            segment_id = %stored.id,
            name = %stored.name,
            criteria = stored.criteria.len(),
            user_count = stored.user_count,
            "Segment created"
        );
        Ok(stored)
    }

    /// An insert retried after a lost response collides with its own first
    /// attempt. Accept the stored record when it is the one we sent.
    async fn recover_insert(&self, segment: &Segment) -> AudienceResult<Option<Segment>> {
        let backend = &self.backend;
        let id = segment.id;
        let existing = self
            .policy
            .run("get", move || backend.get_segment(id))
            .await?;
        Ok(existing.filter(|stored| {
            let same = stored.name == segment.name
                && stored.description == segment.description
                && stored.segment_type == segment.segment_type
                && stored.criteria == segment.criteria
                && stored.user_count == segment.user_count
                && stored.created_by == segment.created_by;
            if same {
                warn!(segment_id = %id, "Insert conflicted with an earlier attempt, using stored record");
            }
            same
        }))
    }

    pub async fn get(&self, id: Uuid) -> AudienceResult<Segment> {
        let backend = &self.backend;
        self.policy
            .run("get", move || backend.get_segment(id))
            .await?
            .ok_or(AudienceError::NotFound(id))
    }

    pub async fn list(&self) -> AudienceResult<Vec<Segment>> {
        let backend = &self.backend;
        self.policy.run("list", move || backend.list_segments()).await
    }

    pub async fn update(&self, id: Uuid, update: SegmentUpdate) -> AudienceResult<Segment> {
        update.validate()?;
        let backend = &self.backend;
        let updated = self
            .policy
            .run("update", move || backend.update_segment(id, update.clone()))
            .await?
            .ok_or(AudienceError::NotFound(id))?;
        info!(segment_id = %id, "Segment updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AudienceResult<()> {
        let backend = &self.backend;
        let removed = self
            .policy
            .run("delete", move || backend.delete_segment(id))
            .await?;
        if !removed {
            return Err(AudienceError::NotFound(id));
        }
        metrics::counter!("segments.deleted").increment(1);
        info!(segment_id = %id, "Segment deleted");
        Ok(())
    }

    /// Recompute the cached user count of a stored segment.
    pub async fn refresh_count(&self, id: Uuid) -> AudienceResult<Segment> {
        let segment = self.get(id).await?;
        let count = self.preview(&segment.criteria.conditions).await?;
        let refreshed = self
            .update(
                id,
                SegmentUpdate {
                    user_count: Some(count),
                    ..Default::default()
                },
            )
            .await?;
        metrics::counter!("segments.refreshed").increment(1);
        info!(segment_id = %id, previous = segment.user_count, user_count = count, "Segment count refreshed");
        Ok(refreshed)
    }

    /// Users currently matching a stored segment's criteria, at most `limit`
    /// (capped at [`MAX_MEMBER_LIMIT`]).
    pub async fn members(&self, id: Uuid, limit: usize) -> AudienceResult<Vec<UserRecord>> {
        let segment = self.get(id).await?;
        let limit = limit.min(MAX_MEMBER_LIMIT);
        let criteria = &segment.criteria.conditions;
        let backend = &self.backend;
        let members = self
            .policy
            .run("members", move || backend.matching_users(criteria, limit))
            .await?;
        debug!(segment_id = %id, limit, members = members.len(), "Segment members listed");
        Ok(members)
    }

    pub async fn rfm_distribution(&self) -> AudienceResult<Vec<RfmBucket>> {
        let backend = &self.backend;
        let scores = self.policy.run("rfm_scores", move || backend.rfm_scores()).await?;
        Ok(rfm::distribution(scores.iter().map(String::as_str)))
    }
}
