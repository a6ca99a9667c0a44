/**
This module holds the contingency tables built from classified outcomes. The
large table is the gold-by-predicted confusion matrix; decomposing it
one-vs-rest yields one 2x2 table per label, and summing those element-wise
yields the combined table used by the micro-averaged measures.
*/
use crate::outcome::{percent_decode, OutcomeStore, SingleOutcome};
use ahash::HashMap as AHashMap;
use core::fmt;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;

/// One-vs-rest 2x2 table for a single label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SmallContingencyTable {
    pub true_positives: f64,
    pub false_positives: f64,
    pub false_negatives: f64,
    pub true_negatives: f64,
}

impl SmallContingencyTable {
    pub fn total(&self) -> f64 {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }
}

/// The per-label tables produced by decomposing a large contingency table.
/// Labels and tables are parallel vectors in label-universe order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmallContingencyTables {
    labels: Vec<String>,
    tables: Vec<SmallContingencyTable>,
}

impl SmallContingencyTables {
    pub fn new(labels: Vec<String>, tables: Vec<SmallContingencyTable>) -> Self {
        debug_assert_eq!(labels.len(), tables.len());
        Self { labels, tables }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn num_classes(&self) -> usize {
        self.tables.len()
    }

    pub fn get(&self, class: usize) -> Option<&SmallContingencyTable> {
        self.tables.get(class)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SmallContingencyTable)> {
        self.labels.iter().map(String::as_str).zip(self.tables.iter())
    }

    pub fn true_positives(&self) -> Array1<f64> {
        Array1::from_iter(self.tables.iter().map(|t| t.true_positives))
    }

    pub fn false_positives(&self) -> Array1<f64> {
        Array1::from_iter(self.tables.iter().map(|t| t.false_positives))
    }

    pub fn false_negatives(&self) -> Array1<f64> {
        Array1::from_iter(self.tables.iter().map(|t| t.false_negatives))
    }

    pub fn true_negatives(&self) -> Array1<f64> {
        Array1::from_iter(self.tables.iter().map(|t| t.true_negatives))
    }

    /// Element-wise sum of every per-label table.
    pub fn combine(&self) -> CombinedContingencyTable {
        let mut combined = CombinedContingencyTable::default();
        for table in &self.tables {
            combined.true_positives += table.true_positives;
            combined.false_positives += table.false_positives;
            combined.false_negatives += table.false_negatives;
            combined.true_negatives += table.true_negatives;
        }
        combined
    }
}

/// Sum of all per-label small tables; the input of the micro-averaged
/// measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedContingencyTable {
    pub true_positives: f64,
    pub false_positives: f64,
    pub false_negatives: f64,
    pub true_negatives: f64,
}

impl CombinedContingencyTable {
    pub fn total(&self) -> f64 {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Error raised while tabulating outcomes into the large contingency table.
pub enum TableError {
    /// A one-hot gold or prediction vector carried more than one positive
    /// entry, so the outcome cannot be tabulated as single-label.
    AmbiguousLabelVector { id: String },
    /// A gold or prediction vector carried no positive entry at all.
    MissingPositiveLabel { id: String },
    /// A multi-label outcome uses a different label list than the rest of the
    /// store; homogenize the store first.
    InconsistentLabelSpace { id: String },
    /// The store holds no outcomes.
    NoOutcomes,
}

impl Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousLabelVector { id } => {
                write!(f, "Outcome {} has more than one positive label in a one-hot vector", id)
            }
            Self::MissingPositiveLabel { id } => {
                write!(f, "Outcome {} has no positive label in a one-hot vector", id)
            }
            Self::InconsistentLabelSpace { id } => {
                write!(f, "Outcome {} uses a label list unknown to the rest of the store", id)
            }
            Self::NoOutcomes => write!(f, "Cannot tabulate an empty outcome store"),
        }
    }
}
impl Error for TableError {}

/// Gold-by-predicted confusion counts. Single-label evaluation uses the
/// dense square matrix; multi-label evaluation uses a sparse mapping keyed by
/// comma-joined label-index sets.
#[derive(Debug, Clone)]
pub enum LargeContingencyTable {
    Dense {
        /// `matrix[[gold, predicted]]` in label order
        matrix: Array2<f64>,
        labels: Vec<String>,
    },
    Sparse {
        /// gold label-set key -> predicted label-set key -> count
        mapping: AHashMap<String, AHashMap<String, f64>>,
        /// label name -> label index, including the empty-set fallback class
        class_to_index: AHashMap<String, usize>,
    },
}

/// Index of the single positive entry of a one-hot vector.
fn one_hot_index(values: &[f64], id: &str) -> Result<usize, TableError> {
    let mut found = None;
    for (i, value) in values.iter().enumerate() {
        if *value == 1.0 {
            if found.is_some() {
                return Err(TableError::AmbiguousLabelVector { id: String::from(id) });
            }
            found = Some(i);
        }
    }
    found.ok_or(TableError::MissingPositiveLabel { id: String::from(id) })
}

/// Comma-joined indices of the entries at or above the threshold. An empty
/// set maps to the fallback class, which is appended to `class_to_index` on
/// first use.
fn combination_key(
    values: &[f64],
    threshold: f64,
    class_to_index: &mut AHashMap<String, usize>,
) -> String {
    let indices: Vec<String> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v >= threshold)
        .map(|(i, _)| i.to_string())
        .collect();
    if indices.is_empty() {
        let next = class_to_index.len();
        let fallback = *class_to_index.entry(String::new()).or_insert(next);
        fallback.to_string()
    } else {
        indices.join(",")
    }
}

/// Label-set keys are percent-decoded when possible; a key that fails to
/// decode compares raw, which can disagree with a decoded candidate.
fn decode_token(token: &str) -> Cow<'_, str> {
    match percent_decode(token) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(token),
    }
}

fn key_contains(key: &str, candidate: &str) -> bool {
    let candidate = decode_token(candidate);
    key.split(',').any(|token| decode_token(token) == candidate)
}

impl LargeContingencyTable {
    /// Wraps an existing confusion matrix. The matrix must be square with one
    /// row/column per label.
    pub fn from_matrix(matrix: Array2<f64>, labels: Vec<String>) -> Self {
        debug_assert_eq!(matrix.nrows(), matrix.ncols());
        debug_assert_eq!(matrix.nrows(), labels.len());
        Self::Dense { matrix, labels }
    }

    /// Tabulates single-label outcomes. The label universe is the sorted set
    /// of every label observed across the store; each outcome's one-hot gold
    /// and prediction vectors are validated and counted.
    pub fn from_single_label(outcomes: &OutcomeStore) -> Result<Self, TableError> {
        if outcomes.is_empty() {
            return Err(TableError::NoOutcomes);
        }
        let mut all_labels = BTreeSet::new();
        for outcome in outcomes.iter() {
            all_labels.extend(outcome.labels().iter().cloned());
        }
        let labels: Vec<String> = all_labels.into_iter().collect();
        let index: AHashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let n = labels.len();
        let mut matrix = Array2::<f64>::zeros((n, n));
        for outcome in outcomes.iter() {
            let gold_local = one_hot_index(outcome.gold(), outcome.id())?;
            let predicted_local = one_hot_index(outcome.prediction(), outcome.id())?;
            let gold = index[outcome.labels()[gold_local].as_str()];
            let predicted = index[outcome.labels()[predicted_local].as_str()];
            matrix[[gold, predicted]] += 1.0;
        }
        Ok(Self::Dense { matrix, labels })
    }

    /// Tabulates multi-label outcomes. Gold and prediction weight vectors are
    /// thresholded into label-index-set keys; every outcome must share one
    /// label list.
    pub fn from_multi_label(outcomes: &OutcomeStore) -> Result<Self, TableError> {
        let first = outcomes.iter().next().ok_or(TableError::NoOutcomes)?;
        let labels = first.labels().to_vec();
        let mut class_to_index: AHashMap<String, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();

        let mut mapping: AHashMap<String, AHashMap<String, f64>> = AHashMap::default();
        for outcome in outcomes.iter() {
            if outcome.labels() != labels.as_slice() {
                return Err(TableError::InconsistentLabelSpace {
                    id: String::from(outcome.id()),
                });
            }
            let threshold = outcome.bipartition_threshold();
            let gold_key = combination_key(outcome.gold(), threshold, &mut class_to_index);
            let predicted_key =
                combination_key(outcome.prediction(), threshold, &mut class_to_index);
            *mapping
                .entry(gold_key)
                .or_default()
                .entry(predicted_key)
                .or_insert(0.0) += 1.0;
        }
        Ok(Self::Sparse {
            mapping,
            class_to_index,
        })
    }

    /// Number of classes of the decomposition: the label-universe size, with
    /// the empty-set fallback counted in the sparse case.
    pub fn num_classes(&self) -> usize {
        match self {
            Self::Dense { labels, .. } => labels.len(),
            Self::Sparse { class_to_index, .. } => class_to_index.len(),
        }
    }

    /// The label universe in index order.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::Dense { labels, .. } => labels.clone(),
            Self::Sparse { class_to_index, .. } => {
                let mut by_index: Vec<(&usize, &String)> =
                    class_to_index.iter().map(|(l, i)| (i, l)).collect();
                by_index.sort_unstable_by_key(|(i, _)| **i);
                by_index.into_iter().map(|(_, l)| l.clone()).collect()
            }
        }
    }

    /// Sum of every cell: the number of tabulated outcomes in the dense case,
    /// the number of (gold, prediction) pair occurrences in the sparse case.
    pub fn total(&self) -> f64 {
        match self {
            Self::Dense { matrix, .. } => matrix.sum(),
            Self::Sparse { mapping, .. } => {
                mapping.values().map(|row| row.values().sum::<f64>()).sum()
            }
        }
    }

    /// One-vs-rest decomposition into per-label 2x2 tables.
    pub fn decompose(&self) -> SmallContingencyTables {
        match self {
            Self::Dense { matrix, labels } => {
                let total = matrix.sum();
                let tables = (0..labels.len())
                    .map(|c| {
                        let true_positives = matrix[[c, c]];
                        let false_negatives = matrix.row(c).sum() - true_positives;
                        let false_positives = matrix.column(c).sum() - true_positives;
                        let true_negatives =
                            total - true_positives - false_negatives - false_positives;
                        SmallContingencyTable {
                            true_positives,
                            false_positives,
                            false_negatives,
                            true_negatives,
                        }
                    })
                    .collect();
                SmallContingencyTables::new(labels.clone(), tables)
            }
            Self::Sparse {
                mapping,
                class_to_index,
            } => {
                let labels = self.labels();
                let tables = (0..class_to_index.len())
                    .map(|decomposed| {
                        let candidate = decomposed.to_string();
                        let mut table = SmallContingencyTable::default();
                        for (gold_key, row) in mapping.iter() {
                            for (predicted_key, count) in row.iter() {
                                if *count == 0.0 {
                                    continue;
                                }
                                let in_gold = key_contains(gold_key, &candidate);
                                let in_predicted = key_contains(predicted_key, &candidate);
                                match (in_gold, in_predicted) {
                                    (true, true) => table.true_positives += count,
                                    (true, false) => table.false_negatives += count,
                                    (false, true) => table.false_positives += count,
                                    (false, false) => table.true_negatives += count,
                                }
                            }
                        }
                        table
                    })
                    .collect();
                SmallContingencyTables::new(labels, tables)
            }
        }
    }
}
