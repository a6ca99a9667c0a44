/**
This modules gives a few tools to prettyprint the measures computed over one
or several evaluation runs.
*/
use crate::measures::MeasureResults;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// The reporter holds one row of measure results per evaluation run, keyed by
/// the run's name (a fold, a configuration, a dataset). It can be used to
/// display the results (i.e. prettyprint them) as if they were collected into
/// a dataframe and can be consumed to obtain the underlying `BTreeMap`. Rows
/// do not need to share the same measures; the displayed columns are the
/// union of every row's measure names.
///
/// # Example
///
/// ```rust
/// use tceval::{Reporter, MeasureResults};
///
/// let mut reporter = Reporter::default();
/// reporter.insert_row("fold-0", MeasureResults::from([
///     (String::from("Accuracy"), 0.75),
/// ]));
/// reporter.insert_row("fold-1", MeasureResults::from([
///     (String::from("Accuracy"), 0.5),
///     (String::from("MicroFScore"), 0.5),
/// ]));
///
/// let expected_report = "\
/// Run, Accuracy, MicroFScore
/// fold-0, 0.75, -
/// fold-1, 0.5, 0.5\n";
///
/// assert_eq!(expected_report, reporter.to_string());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Reporter {
    pub(crate) rows: BTreeMap<String, MeasureResults>,
}

/// By converting the reporter into a `BTreeMap`, you lose the dataframe
/// formatting. If you mean to consume the data without prettyprinting it,
/// this is not a problem.
impl From<Reporter> for BTreeMap<String, MeasureResults> {
    fn from(value: Reporter) -> Self {
        value.rows
    }
}

impl Reporter {
    /// Stores `results` under `run`, replacing any previous row of that name.
    pub fn insert_row(&mut self, run: impl Into<String>, results: MeasureResults) {
        self.rows.insert(run.into(), results);
    }

    /// Adds `results` to the row named `run`, creating it if needed. Measures
    /// already present in the row are overwritten.
    pub fn merge_into_row(&mut self, run: impl Into<String>, results: MeasureResults) {
        self.rows.entry(run.into()).or_default().extend(results);
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &MeasureResults)> {
        self.rows.iter().map(|(run, results)| (run.as_str(), results))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The sorted union of every row's measure names.
    pub fn measure_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for results in self.rows.values() {
            names.extend(results.keys().cloned());
        }
        names.into_iter().collect()
    }
}

/// The Reporter struct acts as a dataframe when displayed. Measures a row
/// never computed show up as `-`.
impl Display for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.measure_names();
        write!(f, "Run")?;
        for name in &names {
            write!(f, ", {}", name)?;
        }
        writeln!(f)?;
        for (run, results) in &self.rows {
            write!(f, "{}", run)?;
            for name in &names {
                match results.get(name) {
                    Some(value) => write!(f, ", {}", value)?,
                    None => write!(f, ", -")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> MeasureResults {
        pairs
            .iter()
            .map(|(name, value)| (String::from(*name), *value))
            .collect()
    }

    #[test]
    fn columns_are_the_union_of_row_measures() {
        let mut reporter = Reporter::default();
        reporter.insert_row("a", row(&[("Accuracy", 1.0)]));
        reporter.insert_row("b", row(&[("MicroFScore", 0.5), ("Accuracy", 0.5)]));
        assert_eq!(
            reporter.measure_names(),
            vec![String::from("Accuracy"), String::from("MicroFScore")]
        );
    }

    #[test]
    fn displays_as_a_dataframe() {
        let mut reporter = Reporter::default();
        reporter.insert_row("fold-1", row(&[("Accuracy", 0.5), ("MicroFScore", 0.5)]));
        reporter.insert_row("fold-0", row(&[("Accuracy", 0.75)]));
        let expected = "\
Run, Accuracy, MicroFScore
fold-0, 0.75, -
fold-1, 0.5, 0.5\n";
        assert_eq!(reporter.to_string(), expected);
    }

    #[test]
    fn merge_into_row_extends_and_overwrites() {
        let mut reporter = Reporter::default();
        reporter.merge_into_row("run", row(&[("Accuracy", 0.5)]));
        reporter.merge_into_row("run", row(&[("Accuracy", 0.75), ("MacroRecall", 1.0)]));
        let rows: BTreeMap<String, MeasureResults> = reporter.into();
        let run = &rows["run"];
        assert_eq!(run["Accuracy"], 0.75);
        assert_eq!(run["MacroRecall"], 1.0);
    }

    #[test]
    fn insert_row_replaces() {
        let mut reporter = Reporter::default();
        reporter.insert_row("run", row(&[("Accuracy", 0.5), ("MacroRecall", 1.0)]));
        reporter.insert_row("run", row(&[("Accuracy", 0.75)]));
        let rows: BTreeMap<String, MeasureResults> = reporter.into();
        assert!(!rows["run"].contains_key("MacroRecall"));
    }
}
