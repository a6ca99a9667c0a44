/**
Feature stores hold the extracted feature vectors of a dataset before they
are serialized for a classifier backend. Two layouts are provided: a sparse
store that only keeps the values an instance actually has, and a dense store
that projects every instance onto the feature universe of the first one.
Both are used through the [`FeatureStore`] trait so filters and data format
writers do not care about the layout.
*/
use ahash::HashSet as AHashSet;
use core::fmt;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;

/// A single feature value. Numeric and boolean values can be lowered to a
/// number for the classifier data formats; nominal values stay textual.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Boolean(bool),
    Nominal(String),
}

impl FeatureValue {
    /// The numeric rendition of the value, if it has one. Booleans map to
    /// 0 and 1.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Boolean(true) => Some(1.0),
            Self::Boolean(false) => Some(0.0),
            Self::Nominal(_) => None,
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Nominal(value) => write!(f, "{}", value),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}
impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Nominal(String::from(value))
    }
}
impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::Nominal(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    name: String,
    value: FeatureValue,
}

impl Feature {
    pub fn new(name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FeatureValue {
        &self.value
    }
}

/// One feature vector with its outcomes and sequence bookkeeping. Sequence
/// labelling backends group instances by `sequence_id` and order them by
/// `sequence_position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    features: Vec<Feature>,
    outcomes: Vec<String>,
    weight: f64,
    sequence_id: usize,
    sequence_position: usize,
}

impl Instance {
    pub fn new(features: Vec<Feature>, outcome: impl Into<String>) -> Self {
        Self {
            features,
            outcomes: vec![outcome.into()],
            weight: 1.0,
            sequence_id: 0,
            sequence_position: 0,
        }
    }

    pub fn with_outcomes(features: Vec<Feature>, outcomes: Vec<String>) -> Self {
        Self {
            features,
            outcomes,
            weight: 1.0,
            sequence_id: 0,
            sequence_position: 0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_sequence(mut self, sequence_id: usize, sequence_position: usize) -> Self {
        self.sequence_id = sequence_id;
        self.sequence_position = sequence_position;
        self
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// The first outcome. Single-label datasets have exactly one.
    pub fn outcome(&self) -> &str {
        self.outcomes.first().map(String::as_str).unwrap_or("")
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn sequence_id(&self) -> usize {
        self.sequence_id
    }

    pub fn sequence_position(&self) -> usize {
        self.sequence_position
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An instance carried the same feature name twice.
    DuplicateFeatureName(String),
    /// The store's feature space was already read and may not grow anymore.
    Frozen,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFeatureName(name) => {
                write!(f, "Instance contains the feature name twice: {}", name)
            }
            Self::Frozen => write!(
                f,
                "The feature space was already read; no instance can be added anymore"
            ),
        }
    }
}
impl Error for StoreError {}

/// Common surface of the sparse and dense stores. Object safe, so filters
/// and data format writers take `&dyn FeatureStore`.
pub trait FeatureStore {
    fn add_instance(&mut self, instance: Instance) -> Result<(), StoreError>;
    fn num_instances(&self) -> usize;
    fn instance(&self, index: usize) -> Option<&Instance>;
    /// The sorted feature names of the store. Reading them freezes the
    /// feature space.
    fn feature_names(&self) -> Vec<String>;
    /// The sorted set of outcomes seen across all instances.
    fn unique_outcomes(&self) -> Vec<String>;
    fn is_frozen(&self) -> bool;
    /// Keeps only the instances at `indices`, in the given order.
    fn retain_indices(&mut self, indices: &[usize]);
    /// Drops every feature whose name is not in `names`.
    fn project_onto(&mut self, names: &[String]);
}

fn check_duplicates(instance: &Instance) -> Result<(), StoreError> {
    let mut seen = AHashSet::default();
    for feature in instance.features() {
        if !seen.insert(feature.name()) {
            return Err(StoreError::DuplicateFeatureName(String::from(
                feature.name(),
            )));
        }
    }
    Ok(())
}

fn unique_outcomes_of(instances: &[Instance]) -> Vec<String> {
    let mut outcomes = BTreeSet::new();
    for instance in instances {
        outcomes.extend(instance.outcomes().iter().cloned());
    }
    outcomes.into_iter().collect()
}

fn select_indices(instances: &[Instance], indices: &[usize]) -> Vec<Instance> {
    indices
        .iter()
        .filter_map(|&index| instances.get(index).cloned())
        .collect()
}

fn project_instances(instances: &mut [Instance], names: &[String]) {
    for instance in instances {
        instance
            .features
            .retain(|feature| names.iter().any(|name| name == feature.name()));
    }
}

/// Stores only the feature values each instance actually has. The feature
/// space freezes the first time it is read; adding an instance afterwards is
/// an error, since it could introduce names the reader never saw.
#[derive(Debug, Clone, Default)]
pub struct SparseFeatureStore {
    instances: Vec<Instance>,
    feature_names: BTreeSet<String>,
    frozen: Cell<bool>,
}

impl SparseFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of the dense instance-by-feature matrix this store does not
    /// materialize.
    pub fn sparsity_ratio(&self) -> f64 {
        let dense_size = self.instances.len() * self.feature_names.len();
        if dense_size == 0 {
            return 0.0;
        }
        let stored: usize = self.instances.iter().map(|i| i.features().len()).sum();
        1.0 - stored as f64 / dense_size as f64
    }

    fn freeze(&self) {
        if !self.frozen.replace(true) {
            log::debug!(
                "Freezing sparse feature space: {} features over {} instances, sparsity {:.3}",
                self.feature_names.len(),
                self.instances.len(),
                self.sparsity_ratio()
            );
        }
    }
}

impl FeatureStore for SparseFeatureStore {
    fn add_instance(&mut self, instance: Instance) -> Result<(), StoreError> {
        if self.frozen.get() {
            return Err(StoreError::Frozen);
        }
        check_duplicates(&instance)?;
        self.feature_names
            .extend(instance.features().iter().map(|f| String::from(f.name())));
        self.instances.push(instance);
        Ok(())
    }

    fn num_instances(&self) -> usize {
        self.instances.len()
    }

    fn instance(&self, index: usize) -> Option<&Instance> {
        self.freeze();
        self.instances.get(index)
    }

    fn feature_names(&self) -> Vec<String> {
        self.freeze();
        self.feature_names.iter().cloned().collect()
    }

    fn unique_outcomes(&self) -> Vec<String> {
        unique_outcomes_of(&self.instances)
    }

    fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    fn retain_indices(&mut self, indices: &[usize]) {
        self.instances = select_indices(&self.instances, indices);
    }

    fn project_onto(&mut self, names: &[String]) {
        project_instances(&mut self.instances, names);
        self.feature_names = names.iter().cloned().collect();
    }
}

/// Fixes the feature universe at the first instance and projects every later
/// one onto it: unseen feature names are dropped, missing values are filled
/// with a numeric zero. The universe is kept sorted.
#[derive(Debug, Clone, Default)]
pub struct DenseFeatureStore {
    instances: Vec<Instance>,
    universe: Vec<String>,
}

impl DenseFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn densify(&self, instance: Instance) -> Instance {
        let mut features = Vec::with_capacity(self.universe.len());
        let mut dropped = 0usize;
        for name in &self.universe {
            let value = instance
                .features()
                .iter()
                .find(|f| f.name() == name)
                .map(|f| f.value().clone())
                .unwrap_or(FeatureValue::Numeric(0.0));
            features.push(Feature::new(name.clone(), value));
        }
        for feature in instance.features() {
            if !self.universe.iter().any(|name| name == feature.name()) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::debug!(
                "Dropped {} feature(s) outside the dense universe of {} names",
                dropped,
                self.universe.len()
            );
        }
        Instance {
            features,
            ..instance
        }
    }
}

impl FeatureStore for DenseFeatureStore {
    fn add_instance(&mut self, instance: Instance) -> Result<(), StoreError> {
        check_duplicates(&instance)?;
        if self.instances.is_empty() && self.universe.is_empty() {
            self.universe = instance
                .features()
                .iter()
                .map(|f| String::from(f.name()))
                .collect();
            self.universe.sort_unstable();
        }
        let densified = self.densify(instance);
        self.instances.push(densified);
        Ok(())
    }

    fn num_instances(&self) -> usize {
        self.instances.len()
    }

    fn instance(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    fn feature_names(&self) -> Vec<String> {
        self.universe.clone()
    }

    fn unique_outcomes(&self) -> Vec<String> {
        unique_outcomes_of(&self.instances)
    }

    fn is_frozen(&self) -> bool {
        !self.universe.is_empty()
    }

    fn retain_indices(&mut self, indices: &[usize]) {
        self.instances = select_indices(&self.instances, indices);
    }

    fn project_onto(&mut self, names: &[String]) {
        project_instances(&mut self.instances, names);
        self.universe = names.to_vec();
        self.universe.sort_unstable();
    }
}
