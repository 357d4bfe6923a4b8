//! Preview evaluator — applies a compiled criteria chain to user contexts.

use crate::criteria::{Criterion, Joiner};
use crate::predicates::Predicate;
use audience_core::types::UserContext;
use audience_core::ValidationError;
use chrono::{DateTime, Utc};

/// A validated criteria chain. Criteria combine strictly left to right with
/// no precedence: `((c0 op1 c1) op2 c2) ...`.
#[derive(Debug, Clone)]
pub struct CriteriaEvaluator {
    chain: Vec<(Joiner, Predicate)>,
}

impl CriteriaEvaluator {
    pub fn compile(criteria: &[Criterion]) -> Result<Self, ValidationError> {
        let chain = criteria
            .iter()
            .enumerate()
            .map(|(i, c)| Predicate::compile(i, c).map(|p| (c.joiner, p)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { chain })
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// An empty chain matches every user.
    pub fn matches(&self, user: &UserContext, now: DateTime<Utc>) -> bool {
        let mut iter = self.chain.iter();
        let Some((_, first)) = iter.next() else {
            return true;
        };
        iter.fold(first.matches(user, now), |acc, (joiner, predicate)| match joiner {
            Joiner::And => acc && predicate.matches(user, now),
            Joiner::Or => acc || predicate.matches(user, now),
        })
    }

    pub fn count<'a, I>(&self, users: I, now: DateTime<Utc>) -> u64
    where
        I: IntoIterator<Item = &'a UserContext>,
    {
        users
            .into_iter()
            .filter(|u| self.matches(u, now))
            .count() as u64
    }
}

/// Validate every criterion of a list, reporting the first failure.
pub fn validate_criteria(criteria: &[Criterion]) -> Result<(), ValidationError> {
    CriteriaEvaluator::compile(criteria).map(|_| ())
}
