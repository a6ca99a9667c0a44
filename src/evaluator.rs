/**
The evaluator ties the crate together: it takes a store of classified
outcomes, builds the large contingency table that matches the store's
learning mode, decomposes it one-vs-rest, and computes the configured
evaluation measures. It is the programmatic face of the crate; the
`evaluate_conf` function in the crate root is a thin wrapper around it.
*/
use core::fmt;
use std::error::Error;
use std::fmt::Display;

use crate::config::EvalConfig;
use crate::confusion::{LargeContingencyTable, TableError};
use crate::measures::{
    all_measures, class_measures, micro_fscore, micro_precision, micro_recall, MeasureResults,
    ZeroDivision,
};
use crate::outcome::{LearningMode, OutcomeError, OutcomeStore};

/// Umbrella error of an evaluation run.
#[derive(Debug)]
pub enum EvaluationError {
    Table(TableError),
    Outcome(OutcomeError),
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(err) => Display::fmt(err, f),
            Self::Outcome(err) => Display::fmt(err, f),
        }
    }
}
impl Error for EvaluationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Table(err) => Some(err),
            Self::Outcome(err) => Some(err),
        }
    }
}

impl From<TableError> for EvaluationError {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

impl From<OutcomeError> for EvaluationError {
    fn from(value: OutcomeError) -> Self {
        Self::Outcome(value)
    }
}

/// Computes evaluation measures from classified outcomes, following the
/// policies of its [`EvalConfig`].
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig<ZeroDivision>,
}

impl Evaluator {
    pub fn new(config: EvalConfig<ZeroDivision>) -> Self {
        Self { config }
    }

    /// Builds the large contingency table of `store`, dense for single-label
    /// outcomes and sparse for multi-label outcomes.
    pub fn large_table(&self, store: &OutcomeStore) -> Result<LargeContingencyTable, TableError> {
        match store.learning_mode() {
            LearningMode::SingleLabel => LargeContingencyTable::from_single_label(store),
            LearningMode::MultiLabel => LargeContingencyTable::from_multi_label(store),
        }
    }

    /// Runs the full evaluation: accuracy plus micro and macro precision,
    /// recall and f-score, and per-label measures when the config asks for
    /// them.
    pub fn evaluate(&self, store: &OutcomeStore) -> Result<MeasureResults, EvaluationError> {
        let large = self.large_table(store)?;
        let num_classes = large.num_classes();
        let tables = large.decompose();
        let combined = tables.combine();
        let mut results = all_measures(
            &tables,
            &combined,
            num_classes,
            self.config.zero_division,
            self.config.parallel,
        );
        if self.config.individual_label_measures {
            results.extend(class_measures(
                &tables,
                self.config.zero_division,
                self.config.parallel,
            ));
        }
        Ok(results)
    }

    /// Only the micro-averaged precision, recall and f-score.
    pub fn micro_measures(&self, store: &OutcomeStore) -> Result<MeasureResults, EvaluationError> {
        let combined = self.large_table(store)?.decompose().combine();
        let mut results = micro_precision(&combined, self.config.zero_division);
        results.extend(micro_recall(&combined, self.config.zero_division));
        results.extend(micro_fscore(&combined, self.config.zero_division));
        Ok(results)
    }
}
