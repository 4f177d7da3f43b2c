use crate::error::{Error, Result, Side};
use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeSet, fmt::Debug, hash::Hash};

/// An ordered set of class labels, each mapped to a dense index `0..K`.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent, bound(serialize = "L: Serialize + Eq + Hash"))]
pub struct LabelSet<L> {
    /// Labels in index order.
    labels: IndexSet<L>,
}

impl<L: Eq + Hash + Debug> LabelSet<L> {
    /// Takes ownership of an explicit universe, keeping its order.
    pub fn from_vec(labels: Vec<L>) -> Result<Self> {
        let mut set = IndexSet::with_capacity(labels.len());
        for label in labels {
            let (index, inserted) = set.insert_full(label);
            if !inserted {
                return Err(Error::DuplicateLabel(format!("{:?}", set[index])));
            }
        }
        Ok(Self { labels: set })
    }
}

impl<L: Clone + Eq + Hash + Debug> LabelSet<L> {
    /// Builds the set from an explicit universe, keeping its order.
    pub fn from_labels(labels: &[L]) -> Result<Self> {
        Self::from_vec(labels.to_vec())
    }

    /// Infers the universe as the sorted union of labels seen on either side.
    ///
    /// Sorting keeps the resulting index order independent of sample order.
    pub fn infer(true_labels: &[L], pred_labels: &[L]) -> Self
    where
        L: Ord,
    {
        let seen: BTreeSet<&L> = true_labels.iter().chain(pred_labels).collect();
        Self {
            labels: seen.into_iter().cloned().collect(),
        }
    }

    /// Maps every label of a sequence to its index.
    ///
    /// Fails on the first label that is not part of the set.
    pub fn indices(&self, labels: &[L], side: Side) -> Result<Vec<usize>> {
        labels
            .iter()
            .enumerate()
            .map(|(position, label)| {
                self.index_of(label).ok_or_else(|| Error::UnknownLabel {
                    position,
                    side,
                    label: format!("{label:?}"),
                })
            })
            .collect()
    }
}

impl<L: Eq + Hash> LabelSet<L> {
    #[inline]
    pub fn index_of(&self, label: &L) -> Option<usize> {
        self.labels.get_index_of(label)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&L> {
        self.labels.get_index(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.labels.iter()
    }

    /// The number of classes.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Deserializes through [`LabelSet::from_vec`], so repeated labels are rejected.
impl<'de, L> Deserialize<'de> for LabelSet<L>
where
    L: Deserialize<'de> + Eq + Hash + Debug,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let labels = Vec::<L>::deserialize(deserializer)?;
        Self::from_vec(labels).map_err(serde::de::Error::custom)
    }
}

/// Two sets are equal only if they hold the same labels in the same order.
impl<L: Eq + Hash> PartialEq for LabelSet<L> {
    fn eq(&self, other: &Self) -> bool {
        self.labels.iter().eq(other.labels.iter())
    }
}

impl<L: Eq + Hash> Eq for LabelSet<L> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inferred_order_is_sorted() {
        let set = LabelSet::infer(&["dog", "cat"], &["bird", "dog"]);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), ["bird", "cat", "dog"]);
        assert_eq!(set.index_of(&"cat"), Some(1));
    }

    #[test]
    fn inferred_order_ignores_sample_order() {
        let a = LabelSet::infer(&[2, 0, 1], &[1, 1, 0]);
        let b = LabelSet::infer(&[1, 0, 2], &[0, 1, 1]);
        assert_eq!(a, b);
    }

    #[test]
    fn explicit_universe_keeps_order() {
        let set = LabelSet::from_labels(&["neg", "pos", "unused"]).unwrap();
        assert_eq!(set.get(0), Some(&"neg"));
        assert_eq!(set.get(2), Some(&"unused"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a = LabelSet::from_labels(&[0, 1]).unwrap();
        let b = LabelSet::from_labels(&[1, 0]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn explicit_universe_rejects_duplicates() {
        let err = LabelSet::from_labels(&[1, 2, 1]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel(ref l) if l == "1"));
    }

    #[test]
    fn deserializing_keeps_order() {
        let set: LabelSet<String> = serde_json::from_str(r#"["pos","neg"]"#).unwrap();
        assert_eq!(set.get(0).map(String::as_str), Some("pos"));
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["pos","neg"]"#);
    }

    #[test]
    fn deserializing_rejects_duplicates() {
        let err = serde_json::from_str::<LabelSet<u8>>("[0, 1, 0]").unwrap_err();
        assert!(err.to_string().contains("label 0 appears more than once"));
    }

    #[test]
    fn unknown_label_reports_position() {
        let set = LabelSet::from_labels(&[0, 1]).unwrap();
        let err = set.indices(&[0, 1, 7, 9], Side::Predicted).unwrap_err();
        match err {
            Error::UnknownLabel {
                position,
                side,
                label,
            } => {
                assert_eq!(position, 2);
                assert_eq!(side, Side::Predicted);
                assert_eq!(label, "7");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_inputs_infer_empty_set() {
        let set = LabelSet::<u8>::infer(&[], &[]);
        assert!(set.is_empty());
    }
}
