use crate::{
    error::{Error, Result, Side},
    labels::LabelSet,
    score::Score,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, hash::Hash};

/// A K×K confusion matrix: rows are actual labels, columns are predicted labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "RawConfusionMatrix<L>",
    bound(
        serialize = "L: Serialize + Eq + Hash",
        deserialize = "L: Deserialize<'de> + Eq + Hash + Debug"
    )
)]
pub struct ConfusionMatrix<L> {
    /// The label universe, in row/column order.
    labels: LabelSet<L>,
    /// `counts[actual][predicted]`
    counts: Box<[Box<[usize]>]>,
}

/// Serialized form of a [`ConfusionMatrix`], checked before use.
#[derive(Deserialize)]
#[serde(bound(deserialize = "L: Deserialize<'de> + Eq + Hash + Debug"))]
struct RawConfusionMatrix<L> {
    labels: LabelSet<L>,
    counts: Vec<Vec<usize>>,
}

impl<L: Eq + Hash + Debug> TryFrom<RawConfusionMatrix<L>> for ConfusionMatrix<L> {
    type Error = Error;

    fn try_from(raw: RawConfusionMatrix<L>) -> Result<Self> {
        Self::from_parts(raw.labels, raw.counts)
    }
}

impl<L: Eq + Hash> PartialEq for ConfusionMatrix<L> {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels && self.counts == other.counts
    }
}

impl<L: Eq + Hash> Eq for ConfusionMatrix<L> {}

/// Counts and ratios of a two-class matrix, with index 1 as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
    pub precision: Score,
    /// Also known as sensitivity.
    pub recall: Score,
    pub specificity: Score,
    pub false_positive_rate: Score,
    pub f1: Score,
}

fn zeroed(num_classes: usize) -> Box<[Box<[usize]>]> {
    vec![vec![0usize; num_classes].into_boxed_slice(); num_classes].into_boxed_slice()
}

impl<L: Clone + Eq + Hash + Debug> ConfusionMatrix<L> {
    /// Compute the confusion matrix from a list of true and predicted labels.
    ///
    /// Without a `universe`, the labels are the sorted union of both sequences.
    pub fn build(true_labels: &[L], pred_labels: &[L], universe: Option<&[L]>) -> Result<Self>
    where
        L: Ord,
    {
        if true_labels.len() != pred_labels.len() {
            return Err(Error::LengthMismatch {
                true_len: true_labels.len(),
                pred_len: pred_labels.len(),
            });
        }

        let labels = match universe {
            Some(universe) => LabelSet::from_labels(universe)?,
            None => LabelSet::infer(true_labels, pred_labels),
        };

        let actual = labels.indices(true_labels, Side::Actual)?;
        let predicted = labels.indices(pred_labels, Side::Predicted)?;

        let mut counts = zeroed(labels.len());
        for (a, p) in actual.into_iter().zip(predicted) {
            counts[a][p] += 1;
        }

        Ok(Self { labels, counts })
    }

    /// Builds a matrix from pre-tallied counts, `rows[actual][predicted]`.
    pub fn from_counts(labels: &[L], rows: &[Vec<usize>]) -> Result<Self> {
        Self::from_parts(LabelSet::from_labels(labels)?, rows.to_vec())
    }

    /// Sums two matrices built over the same label universe.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        if self.labels != other.labels {
            return Err(Error::LabelMismatch);
        }
        let counts = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| x + y).collect())
            .collect();
        Ok(Self {
            labels: self.labels.clone(),
            counts,
        })
    }
}

impl<L: Eq + Hash + Debug> ConfusionMatrix<L> {
    /// Checks that `rows` is K×K for the K labels.
    fn from_parts(labels: LabelSet<L>, rows: Vec<Vec<usize>>) -> Result<Self> {
        let k = labels.len();
        if rows.len() != k {
            return Err(Error::ShapeMismatch {
                expected: k,
                got: rows.len(),
            });
        }
        if let Some(row) = rows.iter().find(|row| row.len() != k) {
            return Err(Error::ShapeMismatch {
                expected: k,
                got: row.len(),
            });
        }

        let counts = rows.into_iter().map(Vec::into_boxed_slice).collect();
        Ok(Self { labels, counts })
    }

    /// A 2×2 matrix over labels `[L::from(0), L::from(1)]` from binary outcome counts.
    ///
    /// Fails with [`Error::DuplicateLabel`] if the two labels convert to the same value.
    pub fn from_binary_counts(
        true_positive: usize,
        false_positive: usize,
        false_negative: usize,
        true_negative: usize,
    ) -> Result<Self>
    where
        L: From<u8>,
    {
        let labels = LabelSet::from_vec(vec![L::from(0), L::from(1)])?;
        let rows = vec![
            vec![true_negative, false_positive],
            vec![false_negative, true_positive],
        ];
        Self::from_parts(labels, rows)
    }
}

/// Index-based queries panic when a class index is not below [`n_classes`](Self::n_classes);
/// use [`get`](Self::get) or [`LabelSet::index_of`] to look classes up safely.
impl<L: Eq + Hash> ConfusionMatrix<L> {
    #[inline]
    pub fn labels(&self) -> &LabelSet<L> {
        &self.labels
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Count at `(actual, predicted)` by label index.
    ///
    /// # Panics
    ///
    /// If either index is out of range.
    #[inline]
    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    /// Count at `(actual, predicted)` by label, `None` if either is unknown.
    pub fn get(&self, actual: &L, predicted: &L) -> Option<usize> {
        let a = self.labels.index_of(actual)?;
        let p = self.labels.index_of(predicted)?;
        Some(self.counts[a][p])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        self.counts.iter().map(|row| &row[..])
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.counts.iter().flat_map(|row| row.iter()).sum()
    }

    /// Number of correct predictions.
    pub fn trace(&self) -> usize {
        self.counts.iter().enumerate().map(|(i, row)| row[i]).sum()
    }

    /// Actual occurrences of a class (row sum).
    ///
    /// # Panics
    ///
    /// If `class` is out of range.
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// Predictions of a class (column sum).
    ///
    /// # Panics
    ///
    /// If `class` is out of range.
    pub fn predicted_count(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }

    pub fn accuracy(&self) -> Score {
        Score::ratio(self.trace(), self.total())
    }

    /// # Panics
    ///
    /// If `class` is out of range.
    pub fn recall(&self, class: usize) -> Score {
        Score::ratio(self.counts[class][class], self.support(class))
    }

    /// # Panics
    ///
    /// If `class` is out of range.
    pub fn precision(&self, class: usize) -> Score {
        Score::ratio(self.counts[class][class], self.predicted_count(class))
    }

    /// Binary view of a two-class matrix, `None` for any other class count.
    pub fn binary(&self) -> Option<BinaryMetrics> {
        if self.n_classes() != 2 {
            return None;
        }
        let true_negative = self.counts[0][0];
        let false_positive = self.counts[0][1];
        let false_negative = self.counts[1][0];
        let true_positive = self.counts[1][1];

        let precision = Score::ratio(true_positive, true_positive + false_positive);
        let recall = Score::ratio(true_positive, true_positive + false_negative);
        Some(BinaryMetrics {
            true_positive,
            false_positive,
            false_negative,
            true_negative,
            precision,
            recall,
            specificity: Score::ratio(true_negative, true_negative + false_positive),
            false_positive_rate: Score::ratio(false_positive, true_negative + false_positive),
            f1: Score::harmonic_mean(precision, recall),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows<L: Eq + Hash>(cm: &ConfusionMatrix<L>) -> Vec<Vec<usize>> {
        cm.rows().map(|row| row.to_vec()).collect()
    }

    #[test]
    fn counts_rows_by_actual_label() {
        let cm = ConfusionMatrix::build(&[0, 0, 1, 1, 1], &[0, 1, 1, 1, 0], None).unwrap();
        assert_eq!(rows(&cm), vec![vec![1, 1], vec![1, 2]]);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.trace(), 3);
        assert_eq!(cm.support(1), 3);
        assert_eq!(cm.predicted_count(1), 3);
    }

    #[test]
    fn length_mismatch_is_checked_first() {
        let err = ConfusionMatrix::build(&[0, 1, 9], &[0, 1], Some(&[0, 1][..])).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                true_len: 3,
                pred_len: 2
            }
        ));
    }

    #[test]
    fn unknown_label_in_universe_fails() {
        let universe = ["a", "b"];
        let err = ConfusionMatrix::build(&["a", "b"], &["a", "c"], Some(&universe[..])).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownLabel {
                position: 1,
                side: Side::Predicted,
                ..
            }
        ));
    }

    #[test]
    fn explicit_universe_may_hold_unseen_labels() {
        let universe = ["c", "b", "a"];
        let cm = ConfusionMatrix::build(&["a", "a"], &["a", "b"], Some(&universe[..])).unwrap();
        assert_eq!(cm.n_classes(), 3);
        assert_eq!(cm.get(&"a", &"b"), Some(1));
        assert_eq!(cm.get(&"a", &"a"), Some(1));
        assert_eq!(cm.support(0), 0);
        assert_eq!(cm.get(&"z", &"a"), None);
    }

    #[test]
    fn empty_input_yields_zero_matrix() {
        let cm = ConfusionMatrix::build(&[], &[], Some(&[0, 1][..])).unwrap();
        assert_eq!(rows(&cm), vec![vec![0, 0], vec![0, 0]]);
        assert_eq!(cm.accuracy(), Score::Undefined);
    }

    #[test]
    fn from_counts_rejects_ragged_rows() {
        let err = ConfusionMatrix::from_counts(&[0, 1], &[vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, got: 1 }));

        let err = ConfusionMatrix::from_counts(&[0, 1, 2], &[vec![1, 2, 3]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 3, got: 1 }));
    }

    #[test]
    fn binary_counts_layout() {
        let cm = ConfusionMatrix::<u8>::from_binary_counts(95, 45, 5, 855).unwrap();
        assert_eq!(rows(&cm), vec![vec![855, 45], vec![5, 95]]);
        let binary = cm.binary().unwrap();
        assert_eq!(binary.true_positive, 95);
        assert_eq!(binary.true_negative, 855);
        assert_eq!(binary.recall, Score::Defined(0.95));
        assert_eq!(cm.accuracy(), Score::Defined(0.95));
    }

    #[test]
    fn binary_counts_accept_wider_labels() {
        let cm = ConfusionMatrix::<i64>::from_binary_counts(1, 2, 3, 4).unwrap();
        assert_eq!(cm.get(&0, &1), Some(2));
        assert_eq!(cm.get(&1, &0), Some(3));
        assert_eq!(cm.labels().iter().copied().collect::<Vec<_>>(), vec![0i64, 1]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn index_queries_panic_out_of_range() {
        let cm = ConfusionMatrix::build(&[0, 1], &[0, 1], None).unwrap();
        cm.support(2);
    }

    #[test]
    fn deserializing_checks_shape() {
        let err = serde_json::from_str::<ConfusionMatrix<u8>>(r#"{"labels":[0,1],"counts":[[1]]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("must be 2x2"));

        let err = serde_json::from_str::<ConfusionMatrix<u8>>(
            r#"{"labels":[0,1],"counts":[[1,0],[0]]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("found a dimension of 1"));
    }

    #[test]
    fn deserializing_rejects_duplicate_labels() {
        let err = serde_json::from_str::<ConfusionMatrix<u8>>(
            r#"{"labels":[0,0],"counts":[[1,0],[0,1]]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("label 0 appears more than once"));
    }

    #[test]
    fn serialized_matrix_reloads_equal() {
        let cm = ConfusionMatrix::build(&["b", "a", "a"], &["a", "a", "b"], None).unwrap();
        let json = serde_json::to_string(&cm).unwrap();
        let loaded: ConfusionMatrix<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.get(&"b".to_string(), &"a".to_string()), Some(1));
        assert_eq!(rows(&loaded), rows(&cm));
    }

    #[test]
    fn merge_pools_sub_populations() {
        let capable = ConfusionMatrix::<u8>::from_binary_counts(95, 5, 5, 95).unwrap();
        let not_capable = ConfusionMatrix::<u8>::from_binary_counts(0, 40, 0, 760).unwrap();
        let pooled = capable.merge(&not_capable).unwrap();
        assert_eq!(rows(&pooled), vec![vec![855, 45], vec![5, 95]]);
        assert_eq!(pooled.precision(1), Score::ratio(95, 140));
    }

    #[test]
    fn merge_requires_same_labels() {
        let a = ConfusionMatrix::from_counts(&[0u8, 1], &[vec![1, 0], vec![0, 1]]).unwrap();
        let b = ConfusionMatrix::from_counts(&[1u8, 0], &[vec![1, 0], vec![0, 1]]).unwrap();
        assert!(matches!(a.merge(&b), Err(Error::LabelMismatch)));
    }

    #[test]
    fn binary_view_only_for_two_classes() {
        let cm = ConfusionMatrix::build(&[0, 1, 2], &[0, 1, 2], None).unwrap();
        assert!(cm.binary().is_none());
    }

    #[test]
    fn specificity_undefined_without_negatives() {
        let cm = ConfusionMatrix::build(&[1, 1], &[1, 0], Some(&[0, 1][..])).unwrap();
        let binary = cm.binary().unwrap();
        assert_eq!(binary.specificity, Score::Undefined);
        assert_eq!(binary.false_positive_rate, Score::Undefined);
        assert_eq!(binary.recall, Score::Defined(0.5));
    }
}
