use thiserror::Error;
use uuid::Uuid;

pub type AudienceResult<T> = Result<T, AudienceError>;

#[derive(Error, Debug)]
pub enum AudienceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Segment not found: {0}")]
    NotFound(Uuid),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Backend request timed out after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AudienceError {
    /// Transient failures worth a second attempt. Validation and lookup
    /// failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AudienceError::Backend(_) | AudienceError::Timeout(_))
    }
}

/// Rejections raised before a segment or preview reaches the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("segment name must not be empty")]
    EmptyName,

    #[error("segment must have at least one criterion")]
    NoCriteria,

    #[error("criterion {index}: field is required")]
    MissingField { index: usize },

    #[error("criterion {index}: operator is required")]
    MissingOperator { index: usize },

    #[error("criterion {index}: unknown operator '{operator}'")]
    UnknownOperator { index: usize, operator: String },

    #[error("criterion {index}: operator '{operator}' is not valid for {value_type} fields")]
    OperatorNotAllowed {
        index: usize,
        operator: String,
        value_type: String,
    },

    #[error("criterion {index}: {reason}")]
    InvalidValue { index: usize, reason: String },

    #[error("criterion {index}: operator '{operator}' requires a timeframe")]
    MissingTimeframe { index: usize, operator: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AudienceError::Timeout(5000).is_retryable());
        assert!(AudienceError::Backend("503".into()).is_retryable());
        assert!(!AudienceError::NotFound(Uuid::new_v4()).is_retryable());
        assert!(!AudienceError::Rejected {
            status: 409,
            message: "duplicate key".into(),
        }
        .is_retryable());
        assert!(!AudienceError::from(ValidationError::EmptyName).is_retryable());
    }

    #[test]
    fn test_validation_message_names_index() {
        let err = ValidationError::OperatorNotAllowed {
            index: 2,
            operator: "contains".into(),
            value_type: "number".into(),
        };
        assert_eq!(
            err.to_string(),
            "criterion 2: operator 'contains' is not valid for number fields"
        );
    }
}
