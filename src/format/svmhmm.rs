/**
SVM-HMM training data format. One instance per line: the outcome mapped to
its 1-based integer, a `qid` naming the sequence, then `index:value` pairs
with 1-based feature indices. Values within `EPS` of zero are left out,
since the format is sparse. The tool only ever sees integers, so the
label-integer mapping can be saved next to the training data and read back
to translate predictions.
*/
use std::io::{BufRead, Write};

use crate::store::FeatureStore;

use super::{feature_indices, BackendAdapter, FilenameKind, FormatError};

/// Values closer to zero than this are treated as zero and not written.
const EPS: f64 = 1e-11;

/// Bidirectional outcome label <-> 1-based integer mapping, numbered in
/// sorted label order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutcomeMapping {
    labels: Vec<String>,
}

impl OutcomeMapping {
    /// Numbers the store's outcomes from 1 in sorted order.
    pub fn from_store(store: &dyn FeatureStore) -> Self {
        Self {
            labels: store.unique_outcomes(),
        }
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels
            .binary_search_by(|l| l.as_str().cmp(label))
            .ok()
            .map(|position| position + 1)
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|position| self.labels.get(position))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Saves the mapping as `index<TAB>label` lines, so the labels can be
    /// recovered from the tool's integer predictions later.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), FormatError> {
        for (position, label) in self.labels.iter().enumerate() {
            writeln!(writer, "{}\t{}", position + 1, label)?;
        }
        Ok(())
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, FormatError> {
        let mut labels = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let label = line
                .split_once('\t')
                .map(|(_, label)| label)
                .unwrap_or(&line);
            labels.push(String::from(label));
        }
        Ok(Self { labels })
    }
}

pub struct SvmHmmAdapter;

impl BackendAdapter for SvmHmmAdapter {
    fn name(&self) -> &'static str {
        "svmhmm"
    }

    fn framework_filename(&self, kind: FilenameKind) -> &'static str {
        match kind {
            FilenameKind::FeatureVectors => "feature-vectors.txt",
            FilenameKind::Predictions => "predictions.txt",
        }
    }

    fn write(&self, store: &dyn FeatureStore, writer: &mut dyn Write) -> Result<(), FormatError> {
        let mapping = OutcomeMapping::from_store(store);
        let indices = feature_indices(store);
        let mut qid = 0usize;
        let mut previous_sequence = None;
        for index in 0..store.num_instances() {
            let instance = match store.instance(index) {
                Some(instance) => instance,
                None => break,
            };
            if previous_sequence != Some(instance.sequence_id()) {
                // qids must be consecutive, whatever the sequence ids are
                qid += 1;
                previous_sequence = Some(instance.sequence_id());
            }
            let label = mapping.index_of(instance.outcome()).ok_or_else(|| {
                FormatError::UnknownOutcome {
                    outcome: String::from(instance.outcome()),
                }
            })?;
            write!(writer, "{} qid:{}", label, qid)?;
            for (name, feature_index) in &indices {
                let Some(feature) = instance.features().iter().find(|f| f.name() == name) else {
                    continue;
                };
                let value = feature.value().numeric().ok_or_else(|| {
                    FormatError::NonNumericFeature {
                        feature: String::from(feature.name()),
                    }
                })?;
                if value.abs() < EPS {
                    continue;
                }
                write!(writer, " {}:{:.8}", feature_index, value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
