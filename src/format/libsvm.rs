/**
Plain libsvm format: `outcome index:value` with 1-based feature indices in
ascending order. Zero values are not written.
*/
use std::io::Write;

use crate::store::FeatureStore;

use super::{feature_indices, BackendAdapter, FilenameKind, FormatError};

pub struct LibsvmAdapter;

impl BackendAdapter for LibsvmAdapter {
    fn name(&self) -> &'static str {
        "libsvm"
    }

    fn framework_filename(&self, kind: FilenameKind) -> &'static str {
        match kind {
            FilenameKind::FeatureVectors => "feature-vectors.txt",
            FilenameKind::Predictions => "predictions.txt",
        }
    }

    fn write(&self, store: &dyn FeatureStore, writer: &mut dyn Write) -> Result<(), FormatError> {
        let indices = feature_indices(store);
        for index in 0..store.num_instances() {
            let instance = match store.instance(index) {
                Some(instance) => instance,
                None => break,
            };
            write!(writer, "{}", instance.outcome())?;
            for (name, feature_index) in &indices {
                let Some(feature) = instance.features().iter().find(|f| f.name() == name) else {
                    continue;
                };
                let value = feature.value().numeric().ok_or_else(|| {
                    FormatError::NonNumericFeature {
                        feature: String::from(feature.name()),
                    }
                })?;
                if value == 0.0 {
                    continue;
                }
                write!(writer, " {}:{}", feature_index, value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
