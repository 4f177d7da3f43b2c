use crate::{
    error::{Error, Result},
    metrics::{BinaryMetrics, ConfusionMatrix},
    score::Score,
};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt::Debug, hash::Hash, io::Read};

/// Counts and ratios for one class, treating it as positive and every other class as negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerClassMetrics<L> {
    pub label: L,
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
    /// Actual occurrences of the class.
    pub support: usize,
    /// Undefined when the class was never predicted.
    pub precision: Score,
    /// Undefined when the class never occurred.
    pub recall: Score,
    pub f1: Score,
}

/// Metrics summarising every class at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub accuracy: Score,
    /// Mean F1 over the classes whose F1 is defined.
    pub macro_f1: Score,
    /// F1 weighted by support. Undefined if any class that occurs has an undefined F1.
    pub weighted_f1: Score,
}

/// The full outcome of an evaluation.
///
/// Deserializing re-derives every metric from the stored matrix and rejects a
/// document whose metrics disagree with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "RawEvaluation<L>",
    bound(
        serialize = "L: Serialize + Eq + Hash",
        deserialize = "L: Deserialize<'de> + Clone + Eq + Hash + Debug"
    )
)]
pub struct EvaluationResult<L> {
    pub confusion_matrix: ConfusionMatrix<L>,
    /// Indexed like the matrix rows.
    pub per_class: Vec<PerClassMetrics<L>>,
    pub accuracy: Score,
    pub macro_f1: Score,
    pub weighted_f1: Score,
    /// Present only for two-class evaluations.
    pub binary: Option<BinaryMetrics>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "L: Deserialize<'de> + Clone + Eq + Hash + Debug"))]
struct RawEvaluation<L> {
    confusion_matrix: ConfusionMatrix<L>,
    per_class: Vec<PerClassMetrics<L>>,
    accuracy: Score,
    macro_f1: Score,
    weighted_f1: Score,
    binary: Option<BinaryMetrics>,
}

impl<L: Clone + Eq + Hash> TryFrom<RawEvaluation<L>> for EvaluationResult<L> {
    type Error = Error;

    fn try_from(raw: RawEvaluation<L>) -> Result<Self> {
        let derived = Self::from_matrix(raw.confusion_matrix);
        let consistent = derived.per_class == raw.per_class
            && derived.accuracy == raw.accuracy
            && derived.macro_f1 == raw.macro_f1
            && derived.weighted_f1 == raw.weighted_f1
            && derived.binary == raw.binary;
        if consistent {
            Ok(derived)
        } else {
            Err(Error::MetricsMismatch)
        }
    }
}

/// Derive per-class counts and ratios from a confusion matrix.
pub fn derive_per_class<L: Clone + Eq + Hash>(
    cm: &ConfusionMatrix<L>,
) -> Vec<PerClassMetrics<L>> {
    let total = cm.total();
    cm.labels()
        .iter()
        .enumerate()
        .map(|(class, label)| {
            let true_positive = cm.count(class, class);
            let support = cm.support(class);
            let false_positive = cm.predicted_count(class) - true_positive;
            let false_negative = support - true_positive;
            let true_negative = total - true_positive - false_positive - false_negative;

            let precision = Score::ratio(true_positive, true_positive + false_positive);
            let recall = Score::ratio(true_positive, support);

            PerClassMetrics {
                label: label.clone(),
                true_positive,
                false_positive,
                false_negative,
                true_negative,
                support,
                precision,
                recall,
                f1: Score::harmonic_mean(precision, recall),
            }
        })
        .collect()
}

/// Compute accuracy, macro-F1 and weighted-F1.
pub fn aggregate<L: Eq + Hash>(
    cm: &ConfusionMatrix<L>,
    per_class: &[PerClassMetrics<L>],
) -> Aggregate {
    let total = cm.total();

    let defined: Vec<f64> = per_class.iter().filter_map(|m| m.f1.value()).collect();
    let macro_f1 = if defined.is_empty() {
        Score::Undefined
    } else {
        Score::Defined(defined.iter().sum::<f64>() / defined.len() as f64)
    };

    // Absent classes carry no weight, so their f1 is never read.
    let weighted_sum: Option<f64> = per_class
        .iter()
        .filter(|m| m.support > 0)
        .map(|m| m.f1.value().map(|f1| f1 * m.support as f64))
        .sum();
    let weighted_f1 = match weighted_sum {
        Some(sum) if total > 0 => Score::Defined(sum / total as f64),
        _ => Score::Undefined,
    };

    Aggregate {
        accuracy: cm.accuracy(),
        macro_f1,
        weighted_f1,
    }
}

/// Build the confusion matrix for the label sequences and derive every metric from it.
pub fn evaluate<L>(
    true_labels: &[L],
    pred_labels: &[L],
    universe: Option<&[L]>,
) -> Result<EvaluationResult<L>>
where
    L: Clone + Eq + Hash + Ord + Debug,
{
    let cm = ConfusionMatrix::build(true_labels, pred_labels, universe)?;
    Ok(EvaluationResult::from_matrix(cm))
}

impl<L: Clone + Eq + Hash> EvaluationResult<L> {
    pub fn from_matrix(confusion_matrix: ConfusionMatrix<L>) -> Self {
        let per_class = derive_per_class(&confusion_matrix);
        let Aggregate {
            accuracy,
            macro_f1,
            weighted_f1,
        } = aggregate(&confusion_matrix, &per_class);
        let binary = confusion_matrix.binary();

        Self {
            confusion_matrix,
            per_class,
            accuracy,
            macro_f1,
            weighted_f1,
            binary,
        }
    }

    /// Metrics for a single label.
    pub fn class(&self, label: &L) -> Option<&PerClassMetrics<L>> {
        let index = self.confusion_matrix.labels().index_of(label)?;
        self.per_class.get(index)
    }
}

impl<L: Eq + Hash> EvaluationResult<L> {
    /// Loads an evaluation result from a JSON stream.
    pub fn load_from_file(file: &mut dyn Read) -> Result<Self>
    where
        L: DeserializeOwned + Clone + Debug,
    {
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)
            .map_err(<serde_json::Error as serde::de::Error>::custom)?;
        let result: Self = serde_json::from_str(&buffer)?;
        debug!(
            "loaded evaluation of {} classes ({} bytes)",
            result.confusion_matrix.n_classes(),
            buffer.len()
        );
        Ok(result)
    }

    /// Saves the evaluation result as JSON.
    pub fn save_to_file(&self, file: &mut dyn std::io::Write) -> Result<()>
    where
        L: Serialize,
    {
        let serialized = serde_json::to_string(self)?;
        file.write_all(serialized.as_bytes())
            .map_err(<serde_json::Error as serde::ser::Error>::custom)?;
        debug!(
            "saved evaluation of {} classes ({} bytes)",
            self.confusion_matrix.n_classes(),
            serialized.len()
        );
        Ok(())
    }
}

impl<L: Eq + Hash> PartialEq for EvaluationResult<L> {
    fn eq(&self, other: &Self) -> bool {
        self.confusion_matrix == other.confusion_matrix
            && self.per_class == other.per_class
            && self.accuracy == other.accuracy
            && self.macro_f1 == other.macro_f1
            && self.weighted_f1 == other.weighted_f1
            && self.binary == other.binary
    }
}
