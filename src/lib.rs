/*!
This library evaluates supervised text classification experiments. It is built
with a focus on performance and soundness.

# Pipeline
An experiment run leaves behind a set of classified outcomes: for every
instance, the gold label weights and the predicted label weights over a shared
label list. Evaluation proceeds in three steps:
* The outcomes are tabulated into a *large contingency table*: a dense
    gold-by-predicted matrix for single-label experiments, or a sparse map of
    label-set combinations for multi-label experiments.
* The large table is decomposed one-vs-rest into one 2x2 *small contingency
    table* per class, holding true/false positives and negatives, and the
    small tables are summed element-wise into a *combined table*.
* Measures are computed from the tables: accuracy and micro averages from the
    combined table, macro averages as the mean over per-class measures.

# Terminology
* A label (or class) is an outcome category, such as `comp.graphics` in topic
    classification or `NN` in part-of-speech tagging. It can be anything, but
    must be represented by a string.
* An outcome is one instance's gold and predicted label weights. Single-label
    outcomes are one-hot; multi-label outcomes are cut at a bipartition
    threshold.
* The zero-division policy decides what a measure returns when its
    denominator is zero: `Soft` yields 0 and `Strict` yields NaN.

On top of the evaluation core, the crate carries the plumbing that produces
the data being evaluated: feature stores, store filters, and the data format
writers of the supported classifier backends.
*/

mod config;
mod confusion;
mod evaluator;
mod filters;
mod format;
mod measures;
mod outcome;
mod reporter;
mod store;

// The public api starts here
pub use confusion::{
    CombinedContingencyTable, LargeContingencyTable, SmallContingencyTable,
    SmallContingencyTables, TableError,
};

pub use measures::{
    accuracy, all_measures, class_measures, compute, macro_fscore, macro_precision, macro_recall,
    micro_fscore, micro_precision, micro_recall, MeasureKind, MeasureResults,
    ParsingZeroDivisionError, ZeroDivision,
};

pub use evaluator::{EvaluationError, Evaluator};

pub use outcome::{LearningMode, OutcomeError, OutcomeStore, SingleOutcome};

pub use reporter::Reporter;

pub use config::{DefaultEvalConfig, EvalConfig, EvalConfigBuilder};

pub use store::{
    DenseFeatureStore, Feature, FeatureStore, FeatureValue, Instance, SparseFeatureStore,
    StoreError,
};

pub use filters::{
    AdaptTestToTrainFilter, FilterError, StoreFilter, UniformClassDistributionFilter,
};

pub use format::{
    crfsuite::{read_instances, read_predicted_labels, ParsedInstance},
    registry,
    svmhmm::OutcomeMapping,
    BackendAdapter, CrfSuiteAdapter, FilenameKind, FormatError, LibsvmAdapter, SvmHmmAdapter,
};

/// Main entrypoint of the library. This function evaluates a store of
/// classified outcomes and returns the computed measures, named the way they
/// appear in reports. Instead of taking in the raw parameters, this function
/// takes an `EvalConfig` struct and uses sensible defaults.
///
/// * `store`: The classified outcomes of an experiment run.
/// * `config`: Parameters used to compute the measures.
///
/// # Example
/// ```rust
/// use tceval::{
///     evaluate_conf, DefaultEvalConfig, EvalConfigBuilder, LearningMode, OutcomeStore,
///     SingleOutcome,
/// };
///
/// let labels = vec![String::from("neg"), String::from("pos")];
/// let mut store = OutcomeStore::new(LearningMode::SingleLabel);
/// store.push(SingleOutcome::new(vec![1.0, 0.0], vec![1.0, 0.0], labels.clone(), "doc0"));
/// store.push(SingleOutcome::new(vec![0.0, 1.0], vec![1.0, 0.0], labels.clone(), "doc1"));
///
/// let config: DefaultEvalConfig = EvalConfigBuilder::default().build();
/// let results = evaluate_conf(&store, config).unwrap();
/// assert_eq!(results["Accuracy"], 0.5);
/// ```
pub fn evaluate_conf<ZeroDiv>(
    store: &OutcomeStore,
    config: EvalConfig<ZeroDiv>,
) -> Result<MeasureResults, EvaluationError>
where
    ZeroDiv: Into<ZeroDivision>,
{
    let (zero_division, individual_label_measures, parallel) = config.into();
    let config = EvalConfig::from((zero_division, individual_label_measures, parallel));
    Evaluator::new(config).evaluate(store)
}
