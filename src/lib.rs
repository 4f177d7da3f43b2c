//! Confusion-matrix based evaluation of classification outcomes.
//!
//! Every metric is derived from a single [`ConfusionMatrix`], so counts and
//! ratios never disagree. Ratios with a zero denominator are reported as
//! [`Score::Undefined`] instead of `0.0` or `NaN`.

mod error;
mod evaluate;
mod labels;
mod metrics;
mod score;

pub use error::{Error, Result, Side};
pub use evaluate::{
    aggregate, derive_per_class, evaluate, Aggregate, EvaluationResult, PerClassMetrics,
};
pub use labels::LabelSet;
pub use metrics::{BinaryMetrics, ConfusionMatrix};
pub use score::Score;
