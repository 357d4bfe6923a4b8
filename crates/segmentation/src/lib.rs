//! Segment criteria model — field/operator catalogs, the criteria composer,
//! validation, preview evaluation and RFM bucketing.

pub mod builder;
pub mod catalog;
pub mod composer;
pub mod criteria;
pub mod evaluator;
pub mod predicates;
pub mod rfm;
pub mod segment;

pub use builder::SegmentBuilder;
pub use catalog::{FieldDefinition, Operator, OperatorDefinition, Timeframe, ValueType};
pub use composer::{ComposerAction, CriteriaComposer, CriterionPatch};
pub use criteria::{Criterion, Joiner, SegmentCriteria};
pub use evaluator::{validate_criteria, CriteriaEvaluator};
pub use rfm::RfmSegment;
pub use segment::{NewSegment, Segment, SegmentStatus, SegmentType, SegmentUpdate};
