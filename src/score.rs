use serde::{Deserialize, Serialize};

/// A ratio metric that may be undefined.
///
/// A zero denominator yields [`Score::Undefined`] rather than `0.0` or `NaN`:
/// a class that was never predicted has no precision, which is not the same as
/// a precision of zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Score {
    Defined(f64),
    Undefined,
}

impl Score {
    /// `numerator / denominator`, undefined when the denominator is zero.
    pub fn ratio(numerator: usize, denominator: usize) -> Self {
        if denominator == 0 {
            Score::Undefined
        } else {
            Score::Defined(numerator as f64 / denominator as f64)
        }
    }

    /// Harmonic mean of precision and recall.
    ///
    /// Undefined if either side is undefined; exactly `0.0` when both are zero.
    pub fn harmonic_mean(precision: Score, recall: Score) -> Self {
        match (precision, recall) {
            (Score::Defined(p), Score::Defined(r)) if p + r == 0.0 => Score::Defined(0.0),
            (Score::Defined(p), Score::Defined(r)) => Score::Defined(2.0 * p * r / (p + r)),
            _ => Score::Undefined,
        }
    }

    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            Score::Defined(v) => Some(v),
            Score::Undefined => None,
        }
    }

    #[inline]
    pub fn is_defined(self) -> bool {
        matches!(self, Score::Defined(_))
    }
}

impl From<Score> for Option<f64> {
    fn from(score: Score) -> Self {
        score.value()
    }
}
