//! Criterion value objects as they are composed and persisted.

use crate::catalog::{Operator, Timeframe};
use serde::{Deserialize, Serialize};

/// Boolean connective between a criterion and the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Joiner {
    #[default]
    And,
    Or,
}

/// A single field/operator/value filter. Field and operator are kept as the
/// raw keys a client submitted so that drafts with blank slots can round-trip;
/// [`crate::predicates::Predicate::compile`] turns a complete criterion into
/// its typed form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    /// Ignored for the first criterion of a list.
    #[serde(rename = "logic", default)]
    pub joiner: Joiner,
}

impl Criterion {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.as_str().to_string(),
            value: value.into(),
            timeframe: None,
            joiner: Joiner::And,
        }
    }

    pub fn within(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    pub fn joined_by(mut self, joiner: Joiner) -> Self {
        self.joiner = joiner;
        self
    }
}

/// Persisted criteria document, `{"conditions": [...]}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentCriteria {
    #[serde(default)]
    pub conditions: Vec<Criterion>,
}

impl SegmentCriteria {
    pub fn new(conditions: Vec<Criterion>) -> Self {
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

impl From<Vec<Criterion>> for SegmentCriteria {
    fn from(conditions: Vec<Criterion>) -> Self {
        Self { conditions }
    }
}
