//! Segment records and the requests that create and update them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criteria::SegmentCriteria;
use crate::evaluator::validate_criteria;
use audience_core::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub segment_type: SegmentType,
    pub criteria: SegmentCriteria,
    /// Snapshot taken at the last preview or refresh, not a live count.
    #[serde(default)]
    pub user_count: u64,
    pub status: SegmentStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    #[default]
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    #[default]
    Active,
    Inactive,
    Draft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSegment {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub segment_type: SegmentType,
    #[serde(default)]
    pub criteria: SegmentCriteria,
    /// Count from the most recent preview, stored as the initial snapshot.
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewSegment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.criteria.is_empty() {
            return Err(ValidationError::NoCriteria);
        }
        validate_criteria(&self.criteria.conditions)
    }

    /// Materialize an active segment. Callers validate first.
    pub fn into_segment(self, now: DateTime<Utc>) -> Segment {
        Segment {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: self.description,
            segment_type: self.segment_type,
            criteria: self.criteria,
            user_count: self.user_count,
            status: SegmentStatus::Active,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub segment_type: Option<SegmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<SegmentCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SegmentStatus>,
}

impl SegmentUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::EmptyName);
        }
        if let Some(criteria) = &self.criteria {
            if criteria.is_empty() {
                return Err(ValidationError::NoCriteria);
            }
            validate_criteria(&criteria.conditions)?;
        }
        Ok(())
    }

    pub fn apply_to(self, segment: &mut Segment, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            segment.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            segment.description = Some(description);
        }
        if let Some(segment_type) = self.segment_type {
            segment.segment_type = segment_type;
        }
        if let Some(criteria) = self.criteria {
            segment.criteria = criteria;
        }
        if let Some(user_count) = self.user_count {
            segment.user_count = user_count;
        }
        if let Some(status) = self.status {
            segment.status = status;
        }
        segment.updated_at = now;
    }
}
