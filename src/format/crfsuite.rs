/**
CRFsuite training data format. One instance per line, `outcome` first, then
the tab-separated `name=value` pairs. The first instance of a sequence gets
a `__BOS__` marker appended and the last one a `__EOS__` marker; the markers
are what delimits sequences, there are no blank lines.
*/
use std::io::{BufRead, Write};

use crate::store::FeatureStore;

use super::{BackendAdapter, FilenameKind, FormatError};

pub const BOS_MARKER: &str = "__BOS__";
pub const EOS_MARKER: &str = "__EOS__";

pub struct CrfSuiteAdapter;

impl BackendAdapter for CrfSuiteAdapter {
    fn name(&self) -> &'static str {
        "crfsuite"
    }

    fn framework_filename(&self, kind: FilenameKind) -> &'static str {
        match kind {
            FilenameKind::FeatureVectors => "training-data.txt",
            FilenameKind::Predictions => "predictions.txt",
        }
    }

    fn write(&self, store: &dyn FeatureStore, writer: &mut dyn Write) -> Result<(), FormatError> {
        let total = store.num_instances();
        for index in 0..total {
            let instance = match store.instance(index) {
                Some(instance) => instance,
                None => break,
            };
            let sequence = instance.sequence_id();
            let starts_sequence = index == 0
                || store
                    .instance(index - 1)
                    .map(|prev| prev.sequence_id() != sequence)
                    .unwrap_or(true);
            let ends_sequence = index + 1 == total
                || store
                    .instance(index + 1)
                    .map(|next| next.sequence_id() != sequence)
                    .unwrap_or(true);
            write!(writer, "{}", instance.outcome())?;
            for feature in instance.features() {
                write!(writer, "\t{}={}", feature.name(), feature.value())?;
            }
            if starts_sequence {
                write!(writer, "\t{}", BOS_MARKER)?;
            }
            if ends_sequence {
                write!(writer, "\t{}", EOS_MARKER)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// One line of a CRFsuite file read back: the outcome, the `name=value`
/// pairs, and the 0-based sequence the markers place it in. Values come back
/// as text, the format does not keep their original type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstance {
    pub outcome: String,
    pub features: Vec<(String, String)>,
    pub sequence: usize,
}

/// Parses CRFsuite training data back into per-instance outcome and feature
/// pairs, recovering sequence membership from the `__BOS__` markers.
pub fn read_instances<R: BufRead>(reader: R) -> Result<Vec<ParsedInstance>, FormatError> {
    let mut instances = Vec::new();
    let mut sequence = 0usize;
    let mut seen_any_sequence = false;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split('\t');
        let outcome = String::from(tokens.next().unwrap_or(""));
        let mut features = Vec::new();
        for token in tokens {
            if token == BOS_MARKER {
                if seen_any_sequence {
                    sequence += 1;
                }
                seen_any_sequence = true;
            } else if token != EOS_MARKER {
                let (name, value) = token.split_once('=').unwrap_or((token, ""));
                features.push((String::from(name), String::from(value)));
            }
        }
        instances.push(ParsedInstance {
            outcome,
            features,
            sequence,
        });
    }
    Ok(instances)
}

/// Reads the labels out of a CRFsuite predictions file, one per non-empty
/// line, first column.
pub fn read_predicted_labels<R: BufRead>(reader: R) -> Result<Vec<String>, FormatError> {
    let mut labels = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let label = line.split('\t').next().unwrap_or(&line);
        labels.push(String::from(label));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Feature, Instance, SparseFeatureStore};
    use std::io::Cursor;

    fn sequence_store() -> SparseFeatureStore {
        let mut store = SparseFeatureStore::new();
        let rows = [
            ("DET", 0usize, 0usize),
            ("NN", 0, 1),
            ("VB", 0, 2),
            ("DET", 1, 0),
            ("NN", 1, 1),
        ];
        for (outcome, sequence, position) in rows {
            store
                .add_instance(
                    Instance::new(vec![Feature::new("token", "w")], outcome)
                        .with_sequence(sequence, position),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn markers_delimit_sequences() {
        let mut buffer = Vec::new();
        CrfSuiteAdapter.write(&sequence_store(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "DET\ttoken=w\t__BOS__");
        assert_eq!(lines[1], "NN\ttoken=w");
        assert_eq!(lines[2], "VB\ttoken=w\t__EOS__");
        assert_eq!(lines[3], "DET\ttoken=w\t__BOS__");
        assert_eq!(lines[4], "NN\ttoken=w\t__EOS__");
    }

    #[test]
    fn single_instance_sequence_gets_both_markers() {
        let mut store = SparseFeatureStore::new();
        store
            .add_instance(Instance::new(vec![Feature::new("token", "w")], "NN"))
            .unwrap();
        let mut buffer = Vec::new();
        CrfSuiteAdapter.write(&store, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "NN\ttoken=w\t__BOS__\t__EOS__\n");
    }

    #[test]
    fn round_trip_recovers_outcomes_and_features() {
        let store = sequence_store();
        let mut buffer = Vec::new();
        CrfSuiteAdapter.write(&store, &mut buffer).unwrap();
        let parsed = read_instances(Cursor::new(buffer)).unwrap();
        assert_eq!(parsed.len(), 5);
        for (index, instance) in parsed.iter().enumerate() {
            let original = store.instance(index).unwrap();
            assert_eq!(instance.outcome, original.outcome());
            assert_eq!(instance.sequence, original.sequence_id());
            let pairs: Vec<(String, String)> = original
                .features()
                .iter()
                .map(|f| (String::from(f.name()), f.value().to_string()))
                .collect();
            assert_eq!(instance.features, pairs);
        }
    }

    #[test]
    fn reads_predicted_labels() {
        let predictions = "DET\nNN\n\nVB\n";
        let labels = read_predicted_labels(Cursor::new(predictions)).unwrap();
        assert_eq!(labels, vec!["DET", "NN", "VB"]);
    }
}
