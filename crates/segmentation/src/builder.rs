//! Segment builder — fluent API for constructing segment criteria.

use crate::catalog::{Operator, Timeframe};
use crate::criteria::{Criterion, Joiner, SegmentCriteria};
use crate::segment::{NewSegment, SegmentType};

pub struct SegmentBuilder {
    name: String,
    description: Option<String>,
    segment_type: SegmentType,
    criteria: Vec<Criterion>,
    created_by: Option<String>,
}

impl SegmentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            segment_type: SegmentType::Dynamic,
            criteria: Vec::new(),
            created_by: None,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn segment_type(mut self, st: SegmentType) -> Self {
        self.segment_type = st;
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    /// Append a criterion joined with AND. On an empty builder this is the
    /// first criterion and the joiner is irrelevant.
    pub fn and(self, field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        self.push(Criterion::new(field, operator, value).joined_by(Joiner::And))
    }

    pub fn or(self, field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        self.push(Criterion::new(field, operator, value).joined_by(Joiner::Or))
    }

    pub fn criterion(self, criterion: Criterion) -> Self {
        self.push(criterion)
    }

    pub fn seen_within(self, timeframe: Timeframe) -> Self {
        self.push(Criterion::new("last_seen", Operator::WithinLast, "").within(timeframe))
    }

    pub fn did_event(self, event_name: &str, within: Option<Timeframe>) -> Self {
        let mut c = Criterion::new(format!("events.{event_name}"), Operator::Performed, "");
        c.timeframe = within;
        self.push(c)
    }

    pub fn did_event_times(self, event_name: &str, min_count: u64, within: Option<Timeframe>) -> Self {
        let mut c = Criterion::new(
            format!("events.{event_name}"),
            Operator::PerformedCount,
            min_count.to_string(),
        );
        c.timeframe = within;
        self.push(c)
    }

    pub fn did_not_do_event(self, event_name: &str, within: Option<Timeframe>) -> Self {
        let mut c = Criterion::new(format!("events.{event_name}"), Operator::NotPerformed, "");
        c.timeframe = within;
        self.push(c)
    }

    fn push(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn build(self) -> NewSegment {
        NewSegment {
            name: self.name,
            description: self.description,
            segment_type: self.segment_type,
            criteria: SegmentCriteria::new(self.criteria),
            user_count: 0,
            created_by: self.created_by,
        }
    }
}
