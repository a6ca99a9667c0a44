/**
Filters transform a feature store in place before it is handed to a data
format writer: rebalancing the class distribution of a training set, or
projecting a test set onto the feature space the model was trained on.
*/
use core::fmt;
use std::error::Error;
use std::fmt::Display;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::store::FeatureStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Adapting a test set needs the training feature space to be frozen
    /// first, otherwise the space could still grow after the projection.
    TrainingStoreNotFrozen,
}

impl Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrainingStoreNotFrozen => write!(
                f,
                "The training feature space is not frozen; read its feature names first"
            ),
        }
    }
}
impl Error for FilterError {}

/// An in-place feature store transformation. The applicability flags say
/// whether the filter makes sense on training data, test data, or both.
pub trait StoreFilter {
    fn apply(&self, store: &mut dyn FeatureStore) -> Result<(), FilterError>;
    fn applicable_for_training(&self) -> bool {
        true
    }
    fn applicable_for_testing(&self) -> bool {
        true
    }
}

/// Downsamples every class to the size of the smallest one, so the training
/// distribution is uniform. Which instances survive is decided by a seeded
/// generator, so runs are reproducible. Training data only.
#[derive(Debug, Clone, Copy)]
pub struct UniformClassDistributionFilter {
    seed: u64,
}

impl UniformClassDistributionFilter {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl StoreFilter for UniformClassDistributionFilter {
    fn apply(&self, store: &mut dyn FeatureStore) -> Result<(), FilterError> {
        if store.num_instances() == 0 {
            return Ok(());
        }
        let outcomes = store.unique_outcomes();
        let mut per_class: Vec<Vec<usize>> = vec![Vec::new(); outcomes.len()];
        for index in 0..store.num_instances() {
            if let Some(instance) = store.instance(index) {
                if let Some(class) = outcomes.iter().position(|o| o == instance.outcome()) {
                    per_class[class].push(index);
                }
            }
        }
        let smallest = per_class
            .iter()
            .map(Vec::len)
            .filter(|&len| len > 0)
            .min()
            .unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut keep: Vec<usize> = per_class
            .iter()
            .flat_map(|indices| indices.choose_multiple(&mut rng, smallest).copied())
            .collect();
        // original instance order survives the downsampling
        keep.sort_unstable();
        log::debug!(
            "Uniform class distribution: keeping {} of {} instances ({} per class)",
            keep.len(),
            store.num_instances(),
            smallest
        );
        store.retain_indices(&keep);
        Ok(())
    }

    fn applicable_for_testing(&self) -> bool {
        false
    }
}

/// Projects a test store onto the feature universe of a frozen training
/// store, dropping the features the model never saw. Test data only.
#[derive(Debug, Clone)]
pub struct AdaptTestToTrainFilter {
    training_names: Vec<String>,
}

impl AdaptTestToTrainFilter {
    pub fn from_training(training: &dyn FeatureStore) -> Result<Self, FilterError> {
        if !training.is_frozen() {
            return Err(FilterError::TrainingStoreNotFrozen);
        }
        Ok(Self {
            training_names: training.feature_names(),
        })
    }
}

impl StoreFilter for AdaptTestToTrainFilter {
    fn apply(&self, store: &mut dyn FeatureStore) -> Result<(), FilterError> {
        store.project_onto(&self.training_names);
        Ok(())
    }

    fn applicable_for_training(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Feature, Instance, SparseFeatureStore};

    fn store_with_outcomes(outcomes: &[&str]) -> SparseFeatureStore {
        let mut store = SparseFeatureStore::new();
        for (index, outcome) in outcomes.iter().enumerate() {
            store
                .add_instance(Instance::new(
                    vec![Feature::new("position", index as f64)],
                    *outcome,
                ))
                .unwrap();
        }
        store
    }

    #[test]
    fn downsamples_to_the_smallest_class() {
        let mut store = store_with_outcomes(&["X", "X", "X", "Y", "Y", "Z"]);
        UniformClassDistributionFilter::new(42)
            .apply(&mut store)
            .unwrap();
        assert_eq!(store.num_instances(), 3);
        let mut survivors: Vec<String> = (0..store.num_instances())
            .map(|i| String::from(store.instance(i).unwrap().outcome()))
            .collect();
        survivors.sort();
        assert_eq!(survivors, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn downsampling_is_reproducible() {
        let pick = |seed: u64| {
            let mut store = store_with_outcomes(&["X", "X", "X", "X", "Y"]);
            UniformClassDistributionFilter::new(seed)
                .apply(&mut store)
                .unwrap();
            (0..store.num_instances())
                .map(|i| store.instance(i).unwrap().features()[0].clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn empty_store_stays_empty() {
        let mut store = SparseFeatureStore::new();
        UniformClassDistributionFilter::new(0)
            .apply(&mut store)
            .unwrap();
        assert_eq!(store.num_instances(), 0);
    }

    #[test]
    fn adapt_test_to_train_drops_unknown_features() {
        let mut training = SparseFeatureStore::new();
        training
            .add_instance(Instance::new(
                vec![Feature::new("a", 1.0), Feature::new("b", 2.0)],
                "X",
            ))
            .unwrap();
        training.feature_names(); // freeze
        let filter = AdaptTestToTrainFilter::from_training(&training).unwrap();

        let mut test = SparseFeatureStore::new();
        test.add_instance(Instance::new(
            vec![Feature::new("a", 1.0), Feature::new("c", 3.0)],
            "X",
        ))
        .unwrap();
        filter.apply(&mut test).unwrap();
        assert_eq!(
            test.feature_names(),
            vec![String::from("a"), String::from("b")]
        );
        assert_eq!(test.instance(0).unwrap().features().len(), 1);
    }

    #[test]
    fn adapting_requires_a_frozen_training_store() {
        let training = SparseFeatureStore::new();
        let err = AdaptTestToTrainFilter::from_training(&training).unwrap_err();
        assert_eq!(err, FilterError::TrainingStoreNotFrozen);
    }
}
