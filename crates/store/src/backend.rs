//! The single seam between segment logic and wherever records live.

use async_trait::async_trait;
use audience_core::types::UserRecord;
use audience_core::AudienceResult;
use audience_segmentation::{Criterion, Segment, SegmentUpdate};
use uuid::Uuid;

/// Table-level access to segments and the user data they are evaluated
/// against. Implementations must be safe to share across request handlers.
#[async_trait]
pub trait SegmentBackend: Send + Sync {
    /// Short identifier for logs and health output.
    fn name(&self) -> &'static str;

    /// Store a fully formed segment and return the stored record.
    async fn insert_segment(&self, segment: Segment) -> AudienceResult<Segment>;

    async fn get_segment(&self, id: Uuid) -> AudienceResult<Option<Segment>>;

    /// All segments, newest first.
    async fn list_segments(&self) -> AudienceResult<Vec<Segment>>;

    /// Apply a validated partial update. `None` when the id is unknown.
    async fn update_segment(&self, id: Uuid, update: SegmentUpdate) -> AudienceResult<Option<Segment>>;

    /// `true` when a record was removed.
    async fn delete_segment(&self, id: Uuid) -> AudienceResult<bool>;

    /// Number of users matching a validated criteria chain.
    async fn count_matching(&self, criteria: &[Criterion]) -> AudienceResult<u64>;

    /// Up to `limit` users matching a validated criteria chain.
    async fn matching_users(&self, criteria: &[Criterion], limit: usize) -> AudienceResult<Vec<UserRecord>>;

    /// Non-null RFM scores of all users.
    async fn rfm_scores(&self) -> AudienceResult<Vec<String>>;
}
