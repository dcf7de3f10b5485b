//! Error taxonomy for the aggregation stages and their adapters.
//!
//! Stage functions return [`PipelineError`] directly. The engine and the I/O
//! adapters work in `anyhow::Result`; a `PipelineError` converts into
//! `anyhow::Error` with `?` and can be recovered with
//! `err.downcast_ref::<PipelineError>()` for classification.

use crate::weather::{GroupKey, RawObservation};
use thiserror::Error;

/// Result alias for the pure stages.
pub type StageResult<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A raw observation is missing a field or carries an unusable value.
    #[error("malformed record: {reason}; record: {record:?}")]
    MalformedRecord {
        reason: String,
        record: Box<RawObservation>,
    },

    /// An internal contract between stages was broken.
    #[error(
        "invariant violation{}: {reason}",
        .key.as_ref().map(|k| format!(" in group {k}")).unwrap_or_default()
    )]
    InvariantViolation {
        reason: String,
        key: Option<GroupKey>,
    },

    /// A stage received input that does not destructure into its expected shape.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: &'static str, found: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("sink error: {0}")]
    Sink(String),
}

impl PipelineError {
    pub fn malformed(reason: impl Into<String>, record: &RawObservation) -> Self {
        PipelineError::MalformedRecord {
            reason: reason.into(),
            record: Box::new(record.clone()),
        }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        PipelineError::InvariantViolation {
            reason: reason.into(),
            key: None,
        }
    }

    pub fn shape(expected: &'static str, found: impl Into<String>) -> Self {
        PipelineError::ShapeMismatch {
            expected,
            found: found.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        PipelineError::Sink(msg.into())
    }

    /// Attach the group an invariant violation happened in. Other variants
    /// are returned unchanged.
    #[must_use]
    pub fn with_key(self, key: &GroupKey) -> Self {
        match self {
            PipelineError::InvariantViolation { reason, key: None } => {
                PipelineError::InvariantViolation {
                    reason,
                    key: Some(key.clone()),
                }
            }
            other => other,
        }
    }

    /// Stable short name of the variant, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MalformedRecord { .. } => "malformed_record",
            PipelineError::InvariantViolation { .. } => "invariant_violation",
            PipelineError::ShapeMismatch { .. } => "shape_mismatch",
            PipelineError::Config(_) => "config",
            PipelineError::Sink(_) => "sink",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_message_names_the_group_once_attached() {
        let key = GroupKey::new("NYC", "2024-03-01");
        let err = PipelineError::invariant("zero count").with_key(&key);
        assert_eq!(
            err.to_string(),
            "invariant violation in group NYC/2024-03-01: zero count"
        );
        assert_eq!(err.kind(), "invariant_violation");
    }

    #[test]
    fn with_key_leaves_other_variants_alone() {
        let key = GroupKey::new("LA", "2024-03-01");
        let err = PipelineError::shape("(GroupKey, Aggregate)", "null").with_key(&key);
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn malformed_record_survives_anyhow_round_trip() {
        let record = RawObservation::default();
        let err: anyhow::Error = PipelineError::malformed("city is missing", &record).into();
        let back = err.downcast_ref::<PipelineError>().unwrap();
        assert_eq!(back.kind(), "malformed_record");
        assert!(err.to_string().contains("city is missing"));
    }
}
