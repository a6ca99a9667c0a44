/*
 * This modules contains some quality of life structs and alias. Most importantly, it contains the
 * `EvalConfig` struct, which implements the default trait. This config can be passed to the
 * `Evaluator` or the `evaluate_conf` function to simplify their arguments.
*/
use crate::measures::ZeroDivision;
use either::Either as LeftOrRight;
use std::fmt::{Debug, Display};

/// Reasonable default configuration when computing evaluation measures.
pub type DefaultEvalConfig = EvalConfig<ZeroDivision>;

impl DefaultEvalConfig {
    pub fn new() -> Self {
        Self {
            zero_division: ZeroDivision::Soft,
            individual_label_measures: false,
            parallel: false,
        }
    }
}

impl<ZeroDiv> From<(ZeroDiv, bool, bool)> for EvalConfig<ZeroDiv>
where
    ZeroDiv: Into<ZeroDivision>,
{
    fn from(value: (ZeroDiv, bool, bool)) -> Self {
        Self {
            zero_division: value.0,
            individual_label_measures: value.1,
            parallel: value.2,
        }
    }
}

impl<ZeroDiv> From<EvalConfigBuilder<ZeroDiv>> for EvalConfig<ZeroDivision>
where
    ZeroDiv: Into<ZeroDivision>,
{
    fn from(value: EvalConfigBuilder<ZeroDiv>) -> Self {
        Self {
            zero_division: value.zero_division.either_into(),
            individual_label_measures: value.individual_label_measures,
            parallel: value.parallel,
        }
    }
}

impl<ZeroDiv> From<EvalConfig<ZeroDiv>> for (ZeroDivision, bool, bool)
where
    ZeroDiv: Into<ZeroDivision>,
{
    fn from(value: EvalConfig<ZeroDiv>) -> Self {
        (
            value.zero_division.into(),
            value.individual_label_measures,
            value.parallel,
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// Config struct used to simplify the inputs of parameters to the main functions of the crate. It
/// implements the default trait.
pub struct EvalConfig<ZeroDiv>
where
    ZeroDiv: Into<ZeroDivision>,
{
    /// This parameter describes what to do when we encounter a division by zero when computing
    /// precision and recall. The most common solution is to replace the results by 0.
    pub(crate) zero_division: ZeroDiv,
    /// Should the evaluation also report precision, recall and f-score of every individual label,
    /// on top of the micro and macro aggregates?
    pub(crate) individual_label_measures: bool,
    /// Can we use multiple cores to compute the measures? This option should be benched. In
    /// practice, most benchmarks show that it is better to *not* parallelize the computations.
    pub(crate) parallel: bool,
}

impl Default for DefaultEvalConfig {
    fn default() -> Self {
        Self {
            zero_division: ZeroDivision::Soft,
            individual_label_measures: false,
            parallel: false,
        }
    }
}

impl<ZeroDiv> Display for EvalConfig<ZeroDiv>
where
    ZeroDiv: Into<ZeroDivision> + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!(
            "Strategy when encountering a division by zero: {:?}\n Reporting individual label measures: {}\n Using parallel computations: {}",
            self.zero_division, self.individual_label_measures, self.parallel
        );
        write!(f, "{}", string)
    }
}

/// This builder can be used to build and customize an `EvalConfig` structure.
pub struct EvalConfigBuilder<ZeroDiv>
where
    ZeroDiv: Into<ZeroDivision>,
{
    zero_division: LeftOrRight<ZeroDiv, ZeroDivision>,
    individual_label_measures: bool,
    parallel: bool,
}

impl Default for EvalConfigBuilder<ZeroDivision> {
    fn default() -> Self {
        Self::new()
    }
}

impl<ZeroDiv> EvalConfigBuilder<ZeroDiv>
where
    ZeroDiv: Into<ZeroDivision>,
{
    pub fn division_by_zero(mut self, division_by_zero: ZeroDiv) -> Self {
        self.zero_division = LeftOrRight::Left(division_by_zero);
        self
    }
    pub fn individual_label_measures(mut self, individual_label_measures: bool) -> Self {
        self.individual_label_measures = individual_label_measures;
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn new() -> Self {
        Self {
            zero_division: LeftOrRight::Right(ZeroDivision::Soft),
            individual_label_measures: false,
            parallel: false,
        }
    }
    pub fn build(self) -> EvalConfig<ZeroDivision> {
        EvalConfig::from(self)
    }
}
