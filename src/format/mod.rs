/**
Data format writers for classifier backends. Every backend is described by a
[`BackendAdapter`]: it knows the file names the external tool expects and how
to serialize a feature store into the tool's training format. Adapters are
trait objects so an experiment can pick its backend at run time.
*/
use core::fmt;
use std::error::Error;
use std::fmt::Display;
use std::io::Write;

use crate::store::FeatureStore;

pub mod crfsuite;
pub mod libsvm;
pub mod svmhmm;

pub use crfsuite::CrfSuiteAdapter;
pub use libsvm::LibsvmAdapter;
pub use svmhmm::SvmHmmAdapter;

/// Which of a backend's working files a caller is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilenameKind {
    /// The serialized feature vectors the backend trains on.
    FeatureVectors,
    /// The file the backend writes its predictions to.
    Predictions,
}

#[derive(Debug)]
pub enum FormatError {
    Io(std::io::Error),
    /// The backend only accepts numeric feature values.
    NonNumericFeature { feature: String },
    /// An outcome label is absent from the label-integer mapping.
    UnknownOutcome { outcome: String },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => Display::fmt(err, f),
            Self::NonNumericFeature { feature } => {
                write!(f, "Feature has no numeric value: {}", feature)
            }
            Self::UnknownOutcome { outcome } => {
                write!(f, "Outcome is not part of the label mapping: {}", outcome)
            }
        }
    }
}
impl Error for FormatError {}

impl From<std::io::Error> for FormatError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A classifier backend's serialization contract.
pub trait BackendAdapter {
    /// Short identifier of the backend, e.g. `crfsuite`.
    fn name(&self) -> &'static str;
    /// The backend's conventional file name for `kind`.
    fn framework_filename(&self, kind: FilenameKind) -> &'static str;
    /// Serializes `store` into the backend's training data format.
    fn write(&self, store: &dyn FeatureStore, writer: &mut dyn Write) -> Result<(), FormatError>;
}

/// Every adapter the crate ships, for run-time backend selection.
pub fn registry() -> Vec<Box<dyn BackendAdapter>> {
    vec![
        Box::new(CrfSuiteAdapter),
        Box::new(SvmHmmAdapter),
        Box::new(LibsvmAdapter),
    ]
}

/// The 1-based index of every feature name, in sorted name order. The index
/// formats address features by number.
pub(crate) fn feature_indices(store: &dyn FeatureStore) -> Vec<(String, usize)> {
    store
        .feature_names()
        .into_iter()
        .zip(1..)
        .collect()
}
