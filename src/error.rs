//! Error types for building and evaluating confusion matrices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two input sequences a label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Actual,
    Predicted,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Actual => write!(f, "true"),
            Self::Predicted => write!(f, "predicted"),
        }
    }
}

/// Errors that can occur when building a confusion matrix or persisting a result.
///
/// Labels are rendered with their `Debug` form so the error stays independent
/// of the label type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("length mismatch: {true_len} true labels, {pred_len} predicted labels")]
    LengthMismatch { true_len: usize, pred_len: usize },

    #[error("unknown {side} label {label} at position {position}")]
    UnknownLabel {
        position: usize,
        side: Side,
        label: String,
    },

    #[error("label {0} appears more than once in the label universe")]
    DuplicateLabel(String),

    #[error("count matrix must be {expected}x{expected}, found a dimension of {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("confusion matrices are built over different label universes")]
    LabelMismatch,

    #[error("stored metrics disagree with the confusion matrix they were derived from")]
    MetricsMismatch,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, Error>;
