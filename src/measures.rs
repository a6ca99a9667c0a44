/**
This module computes the evaluation measures (accuracy, micro and macro
precision/recall/F-score) from decomposed contingency tables. Every measure
returns its value under a named key so that results from several computations
can be unioned into a single report row.
*/
use crate::confusion::{CombinedContingencyTable, SmallContingencyTables};
use core::fmt;
use enum_iterator::{all, Sequence};
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display};
use std::str::FromStr;

/// Named measure values, one entry per computed measure. `BTreeMap` keeps the
/// report columns in a deterministic order.
pub type MeasureResults = BTreeMap<String, f64>;

/// What to do when a measure's denominator is zero. `Soft` yields `0.0`,
/// `Strict` yields `NaN`. The policy is an explicit parameter on every
/// measure; no measure ever divides by zero unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZeroDivision {
    /// Zero denominators produce `0.0`
    Soft,
    /// Zero denominators produce `NaN`
    Strict,
}

impl Default for ZeroDivision {
    fn default() -> Self {
        Self::Soft
    }
}

impl ZeroDivision {
    pub(crate) fn fill_value(self) -> f64 {
        match self {
            Self::Soft => 0.0,
            Self::Strict => f64::NAN,
        }
    }
}

impl Display for ZeroDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsingZeroDivisionError(String);

impl Display for ParsingZeroDivisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse {} into a `ZeroDivision` policy", self.0)
    }
}
impl Error for ParsingZeroDivisionError {}

impl FromStr for ZeroDivision {
    type Err = ParsingZeroDivisionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "soft" | "zero" | "0" => Ok(ZeroDivision::Soft),
            "strict" | "nan" => Ok(ZeroDivision::Strict),
            _ => Err(ParsingZeroDivisionError(String::from(s))),
        }
    }
}

/// The measures computed from a decomposed contingency table. The `Display`
/// form of each variant is the key under which its value is reported.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Sequence, Serialize, Deserialize)]
pub enum MeasureKind {
    Accuracy,
    MicroPrecision,
    MicroRecall,
    MicroFScore,
    MacroPrecision,
    MacroRecall,
    MacroFScore,
}

impl Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

fn ratio(numerator: f64, denominator: f64, zero_division: ZeroDivision) -> f64 {
    if denominator == 0.0 {
        zero_division.fill_value()
    } else {
        numerator / denominator
    }
}

/// Element-wise `numerator / denominator` where entries with a zero
/// denominator take the policy's fill value. The parallel path only pays off
/// on large label universes; both paths are kept so the caller can choose.
fn prf_divide(
    numerator: &Array1<f64>,
    denominator: &Array1<f64>,
    parallel: bool,
    zero_division: ZeroDivision,
) -> Array1<f64> {
    let fill = zero_division.fill_value();
    if parallel {
        Zip::from(numerator)
            .and(denominator)
            .par_map_collect(|&n, &d| if d == 0.0 { fill } else { n / d })
    } else {
        Zip::from(numerator)
            .and(denominator)
            .map_collect(|&n, &d| if d == 0.0 { fill } else { n / d })
    }
}

fn fscore_from(
    precision: &Array1<f64>,
    recall: &Array1<f64>,
    parallel: bool,
    zero_division: ZeroDivision,
) -> Array1<f64> {
    let fill = zero_division.fill_value();
    if parallel {
        Zip::from(precision)
            .and(recall)
            .par_map_collect(|&p, &r| if p + r == 0.0 { fill } else { 2.0 * p * r / (p + r) })
    } else {
        Zip::from(precision)
            .and(recall)
            .map_collect(|&p, &r| if p + r == 0.0 { fill } else { 2.0 * p * r / (p + r) })
    }
}

fn mean_or_fill(values: &Array1<f64>, zero_division: ZeroDivision) -> f64 {
    values.mean().unwrap_or_else(|| zero_division.fill_value())
}

/// Accuracy from the combined table. Each per-class table sums to the total
/// outcome count, so the combined total divided by the number of classes
/// recovers that count.
pub fn accuracy(
    combined: &CombinedContingencyTable,
    num_classes: usize,
    zero_division: ZeroDivision,
) -> MeasureResults {
    let denominator = if num_classes == 0 {
        0.0
    } else {
        combined.total() / num_classes as f64
    };
    let value = ratio(combined.true_positives, denominator, zero_division);
    MeasureResults::from([(MeasureKind::Accuracy.to_string(), value)])
}

pub fn micro_precision(
    combined: &CombinedContingencyTable,
    zero_division: ZeroDivision,
) -> MeasureResults {
    let value = ratio(
        combined.true_positives,
        combined.true_positives + combined.false_positives,
        zero_division,
    );
    MeasureResults::from([(MeasureKind::MicroPrecision.to_string(), value)])
}

pub fn micro_recall(
    combined: &CombinedContingencyTable,
    zero_division: ZeroDivision,
) -> MeasureResults {
    let value = ratio(
        combined.true_positives,
        combined.true_positives + combined.false_negatives,
        zero_division,
    );
    MeasureResults::from([(MeasureKind::MicroRecall.to_string(), value)])
}

pub fn micro_fscore(
    combined: &CombinedContingencyTable,
    zero_division: ZeroDivision,
) -> MeasureResults {
    let p = ratio(
        combined.true_positives,
        combined.true_positives + combined.false_positives,
        zero_division,
    );
    let r = ratio(
        combined.true_positives,
        combined.true_positives + combined.false_negatives,
        zero_division,
    );
    let value = if p + r == 0.0 {
        zero_division.fill_value()
    } else {
        2.0 * p * r / (p + r)
    };
    MeasureResults::from([(MeasureKind::MicroFScore.to_string(), value)])
}

pub fn macro_precision(
    tables: &SmallContingencyTables,
    zero_division: ZeroDivision,
    parallel: bool,
) -> MeasureResults {
    let per_class = prf_divide(
        &tables.true_positives(),
        &(tables.true_positives() + tables.false_positives()),
        parallel,
        zero_division,
    );
    let value = mean_or_fill(&per_class, zero_division);
    MeasureResults::from([(MeasureKind::MacroPrecision.to_string(), value)])
}

pub fn macro_recall(
    tables: &SmallContingencyTables,
    zero_division: ZeroDivision,
    parallel: bool,
) -> MeasureResults {
    let per_class = prf_divide(
        &tables.true_positives(),
        &(tables.true_positives() + tables.false_negatives()),
        parallel,
        zero_division,
    );
    let value = mean_or_fill(&per_class, zero_division);
    MeasureResults::from([(MeasureKind::MacroRecall.to_string(), value)])
}

pub fn macro_fscore(
    tables: &SmallContingencyTables,
    zero_division: ZeroDivision,
    parallel: bool,
) -> MeasureResults {
    let tp = tables.true_positives();
    let precision = prf_divide(
        &tp,
        &(tables.true_positives() + tables.false_positives()),
        parallel,
        zero_division,
    );
    let recall = prf_divide(
        &tp,
        &(tables.true_positives() + tables.false_negatives()),
        parallel,
        zero_division,
    );
    let per_class = fscore_from(&precision, &recall, parallel, zero_division);
    let value = mean_or_fill(&per_class, zero_division);
    MeasureResults::from([(MeasureKind::MacroFScore.to_string(), value)])
}

/// Computes one measure kind. Used by [`all_measures`] to assemble the full
/// report row.
pub fn compute(
    kind: MeasureKind,
    tables: &SmallContingencyTables,
    combined: &CombinedContingencyTable,
    num_classes: usize,
    zero_division: ZeroDivision,
    parallel: bool,
) -> MeasureResults {
    match kind {
        MeasureKind::Accuracy => accuracy(combined, num_classes, zero_division),
        MeasureKind::MicroPrecision => micro_precision(combined, zero_division),
        MeasureKind::MicroRecall => micro_recall(combined, zero_division),
        MeasureKind::MicroFScore => micro_fscore(combined, zero_division),
        MeasureKind::MacroPrecision => macro_precision(tables, zero_division, parallel),
        MeasureKind::MacroRecall => macro_recall(tables, zero_division, parallel),
        MeasureKind::MacroFScore => macro_fscore(tables, zero_division, parallel),
    }
}

/// The union of every measure kind for one experiment configuration.
pub fn all_measures(
    tables: &SmallContingencyTables,
    combined: &CombinedContingencyTable,
    num_classes: usize,
    zero_division: ZeroDivision,
    parallel: bool,
) -> MeasureResults {
    let mut results = MeasureResults::new();
    for kind in all::<MeasureKind>() {
        results.extend(compute(
            kind,
            tables,
            combined,
            num_classes,
            zero_division,
            parallel,
        ));
    }
    results
}

/// Per-class precision, recall and F-score, keyed as `Precision_<label>`,
/// `Recall_<label>` and `FScore_<label>`.
pub fn class_measures(
    tables: &SmallContingencyTables,
    zero_division: ZeroDivision,
    parallel: bool,
) -> MeasureResults {
    let tp = tables.true_positives();
    let precision = prf_divide(
        &tp,
        &(tables.true_positives() + tables.false_positives()),
        parallel,
        zero_division,
    );
    let recall = prf_divide(
        &tp,
        &(tables.true_positives() + tables.false_negatives()),
        parallel,
        zero_division,
    );
    let fscore = fscore_from(&precision, &recall, parallel, zero_division);

    let mut results = MeasureResults::new();
    for (label, (p, (r, f))) in tables
        .labels()
        .iter()
        .zip(precision.iter().zip(recall.iter().zip(fscore.iter())))
    {
        results.insert(format!("Precision_{}", label), *p);
        results.insert(format!("Recall_{}", label), *r);
        results.insert(format!("FScore_{}", label), *f);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confusion::SmallContingencyTable;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn two_class_tables() -> SmallContingencyTables {
        // decomposition of the matrix [[5, 1], [2, 8]] over labels {A, B}
        SmallContingencyTables::new(
            vec![String::from("A"), String::from("B")],
            vec![
                SmallContingencyTable {
                    true_positives: 5.0,
                    false_positives: 2.0,
                    false_negatives: 1.0,
                    true_negatives: 8.0,
                },
                SmallContingencyTable {
                    true_positives: 8.0,
                    false_positives: 1.0,
                    false_negatives: 2.0,
                    true_negatives: 5.0,
                },
            ],
        )
    }

    #[test]
    fn accuracy_matches_correct_over_total() {
        let tables = two_class_tables();
        let combined = tables.combine();
        let results = accuracy(&combined, 2, ZeroDivision::Soft);
        assert_abs_diff_eq!(results["Accuracy"], 13.0 / 16.0);
    }

    #[test]
    fn micro_measures_from_combined_table() {
        let tables = two_class_tables();
        let combined = tables.combine();
        // combined tp = 13, fp = 3, fn = 3
        let p = micro_precision(&combined, ZeroDivision::Soft)["MicroPrecision"];
        let r = micro_recall(&combined, ZeroDivision::Soft)["MicroRecall"];
        let f = micro_fscore(&combined, ZeroDivision::Soft)["MicroFScore"];
        assert_abs_diff_eq!(p, 13.0 / 16.0);
        assert_abs_diff_eq!(r, 13.0 / 16.0);
        assert_abs_diff_eq!(f, 13.0 / 16.0);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn macro_measures_average_per_class(#[case] parallel: bool) {
        let tables = two_class_tables();
        let p = macro_precision(&tables, ZeroDivision::Soft, parallel)["MacroPrecision"];
        let r = macro_recall(&tables, ZeroDivision::Soft, parallel)["MacroRecall"];
        assert_abs_diff_eq!(p, (5.0 / 7.0 + 8.0 / 9.0) / 2.0);
        assert_abs_diff_eq!(r, (5.0 / 6.0 + 8.0 / 10.0) / 2.0);
    }

    #[test]
    fn soft_accuracy_on_empty_table_is_zero() {
        let tables = SmallContingencyTables::new(
            vec![String::from("A"), String::from("B")],
            vec![SmallContingencyTable::default(), SmallContingencyTable::default()],
        );
        let combined = tables.combine();
        let soft = accuracy(&combined, 2, ZeroDivision::Soft)["Accuracy"];
        assert_eq!(soft, 0.0);
    }

    #[test]
    fn strict_accuracy_on_empty_table_is_nan() {
        let tables = SmallContingencyTables::new(
            vec![String::from("A"), String::from("B")],
            vec![SmallContingencyTable::default(), SmallContingencyTable::default()],
        );
        let combined = tables.combine();
        let strict = accuracy(&combined, 2, ZeroDivision::Strict)["Accuracy"];
        assert!(strict.is_nan());
    }

    #[test]
    fn class_measures_are_keyed_by_label() {
        let tables = two_class_tables();
        let results = class_measures(&tables, ZeroDivision::Soft, false);
        assert_abs_diff_eq!(results["Precision_A"], 5.0 / 7.0);
        assert_abs_diff_eq!(results["Recall_A"], 5.0 / 6.0);
        assert_abs_diff_eq!(results["Precision_B"], 8.0 / 9.0);
        assert_abs_diff_eq!(results["Recall_B"], 8.0 / 10.0);
    }

    #[rstest]
    #[case("soft", ZeroDivision::Soft)]
    #[case("Strict", ZeroDivision::Strict)]
    #[case("nan", ZeroDivision::Strict)]
    fn parse_zero_division(#[case] input: &str, #[case] expected: ZeroDivision) {
        assert_eq!(input.parse::<ZeroDivision>().unwrap(), expected);
    }

    #[test]
    fn parse_zero_division_rejects_unknown() {
        assert!("lenient".parse::<ZeroDivision>().is_err());
    }
}
