//! Criteria composer — an immutable criteria list driven by pure reducers.
//!
//! Every operation returns a new composer and leaves the receiver untouched,
//! so a client can keep the previous state for undo or diffing.

use crate::catalog::{self, Timeframe};
use crate::criteria::{Criterion, Joiner};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaComposer {
    criteria: Vec<Criterion>,
}

/// Partial update for one criterion. `None` leaves a slot unchanged;
/// `timeframe: Some(None)` clears the timeframe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriterionPatch {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Option<String>,
    pub timeframe: Option<Option<Timeframe>>,
    pub joiner: Option<Joiner>,
}

impl CriterionPatch {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Default::default()
        }
    }

    pub fn operator(operator: impl Into<String>) -> Self {
        Self {
            operator: Some(operator.into()),
            ..Default::default()
        }
    }

    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn timeframe(timeframe: Option<Timeframe>) -> Self {
        Self {
            timeframe: Some(timeframe),
            ..Default::default()
        }
    }

    pub fn joiner(joiner: Joiner) -> Self {
        Self {
            joiner: Some(joiner),
            ..Default::default()
        }
    }

    fn apply(&self, current: &Criterion) -> Criterion {
        let mut next = current.clone();
        if let Some(field) = &self.field {
            if *field != current.field {
                next.field = field.clone();
                // A new field may have a different value type; stale slots go.
                next.operator.clear();
                next.value.clear();
                if !catalog::field_type(field).accepts_timeframe() {
                    next.timeframe = None;
                }
            }
        }
        if let Some(operator) = &self.operator {
            next.operator = operator.clone();
        }
        if let Some(value) = &self.value {
            next.value = value.clone();
        }
        if let Some(timeframe) = self.timeframe {
            next.timeframe = timeframe;
        }
        if let Some(joiner) = self.joiner {
            next.joiner = joiner;
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerAction {
    Append,
    Remove(usize),
    Patch(usize, CriterionPatch),
}

impl CriteriaComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_criteria(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn into_criteria(self) -> Vec<Criterion> {
        self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Add a blank criterion joined with AND.
    pub fn appended(&self) -> Self {
        let mut criteria = self.criteria.clone();
        criteria.push(Criterion::default());
        Self { criteria }
    }

    /// Drop the criterion at `index`. Out-of-range indices leave the list as is.
    pub fn removed(&self, index: usize) -> Self {
        let criteria = self
            .criteria
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, c)| c.clone())
            .collect();
        Self { criteria }
    }

    pub fn patched(&self, index: usize, patch: &CriterionPatch) -> Self {
        let criteria = self
            .criteria
            .iter()
            .enumerate()
            .map(|(i, c)| if i == index { patch.apply(c) } else { c.clone() })
            .collect();
        Self { criteria }
    }

    pub fn apply(&self, action: &ComposerAction) -> Self {
        match action {
            ComposerAction::Append => self.appended(),
            ComposerAction::Remove(index) => self.removed(*index),
            ComposerAction::Patch(index, patch) => self.patched(*index, patch),
        }
    }

    /// Presentation policy: once composing has started, keep one criterion.
    pub fn can_remove(&self, index: usize) -> bool {
        self.criteria.len() > 1 && index < self.criteria.len()
    }
}
