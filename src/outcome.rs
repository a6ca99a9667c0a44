/**
This module holds classified outcomes: the gold and predicted label weights
of every instance of an experiment, together with the label list they are
indexed by. A store of outcomes can be read from and written back to the
report text format (`id=prediction;goldstandard;threshold` lines under a
`#labels` header), merged with other stores, and homogenized onto a shared
label universe before tabulation.
*/
use core::fmt;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

/// How outcomes were produced: one label per instance or a label set per
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearningMode {
    SingleLabel,
    MultiLabel,
}

impl Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleLabel => write!(f, "singleLabel"),
            Self::MultiLabel => write!(f, "multiLabel"),
        }
    }
}

impl FromStr for LearningMode {
    type Err = OutcomeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "singlelabel" | "single_label" | "single" => Ok(Self::SingleLabel),
            "multilabel" | "multi_label" | "multi" => Ok(Self::MultiLabel),
            _ => Err(OutcomeError::UnknownLearningMode(String::from(s))),
        }
    }
}

const DEFAULT_BIPARTITION_THRESHOLD: f64 = 0.5;

/// One labeled prediction event: gold and predicted label weights indexed by
/// `labels`, plus the instance id. Single-label outcomes carry one-hot
/// vectors; multi-label outcomes carry weight vectors cut at the bipartition
/// threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleOutcome {
    id: String,
    gold: Vec<f64>,
    prediction: Vec<f64>,
    bipartition_threshold: f64,
    labels: Vec<String>,
}

impl SingleOutcome {
    pub fn new(
        gold: Vec<f64>,
        prediction: Vec<f64>,
        labels: Vec<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            gold,
            prediction,
            bipartition_threshold: DEFAULT_BIPARTITION_THRESHOLD,
            labels,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.bipartition_threshold = threshold;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gold(&self) -> &[f64] {
        &self.gold
    }

    pub fn prediction(&self) -> &[f64] {
        &self.prediction
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn bipartition_threshold(&self) -> f64 {
        self.bipartition_threshold
    }
}

#[derive(Debug)]
/// Errors raised while reading, writing or merging outcome stores.
pub enum OutcomeError {
    Io(std::io::Error),
    /// A data line appeared before the `#labels` header.
    MissingLabelHeader,
    MalformedLine(String),
    MalformedNumber(String),
    UnknownLearningMode(String),
    ModeMismatch {
        expected: LearningMode,
        found: LearningMode,
    },
    /// The input contained no outcome lines.
    Empty,
    InvalidEncoding(String),
}

impl Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => std::fmt::Display::fmt(err, f),
            Self::MissingLabelHeader => {
                write!(f, "Found outcome data before the #labels header line")
            }
            Self::MalformedLine(line) => write!(f, "Malformed outcome line: {}", line),
            Self::MalformedNumber(token) => write!(f, "Could not parse number: {}", token),
            Self::UnknownLearningMode(mode) => write!(f, "Unknown learning mode: {}", mode),
            Self::ModeMismatch { expected, found } => write!(
                f,
                "Learning modes do not match: store is {}, other is {}",
                expected, found
            ),
            Self::Empty => write!(f, "Input contains no outcomes"),
            Self::InvalidEncoding(token) => {
                write!(f, "Invalid percent-encoding in label: {}", token)
            }
        }
    }
}
impl Error for OutcomeError {}

impl From<std::io::Error> for OutcomeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InvalidEncoding(pub(crate) String);

impl From<InvalidEncoding> for OutcomeError {
    fn from(value: InvalidEncoding) -> Self {
        Self::InvalidEncoding(value.0)
    }
}

/// Percent-decodes a label token ('+' stands for a space). No pack crate is
/// pulled in for this; the alphabet is the one Java's URLEncoder emits.
pub(crate) fn percent_decode(input: &str) -> Result<String, InvalidEncoding> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| InvalidEncoding(String::from(input)))?;
                decoded.push(hex);
                i += 3;
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(decoded).map_err(|_| InvalidEncoding(String::from(input)))
}

pub(crate) fn percent_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'*' | b'_' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{:02X}", byte));
            }
        }
    }
    encoded
}

/// Container of [`SingleOutcome`]s under one learning mode.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeStore {
    learning_mode: LearningMode,
    outcomes: Vec<SingleOutcome>,
}

impl OutcomeStore {
    pub fn new(learning_mode: LearningMode) -> Self {
        Self {
            learning_mode,
            outcomes: Vec::new(),
        }
    }

    pub fn learning_mode(&self) -> LearningMode {
        self.learning_mode
    }

    pub fn push(&mut self, outcome: SingleOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SingleOutcome> {
        self.outcomes.iter()
    }

    /// Adds every outcome of `other` to this store. The learning modes must
    /// agree.
    pub fn merge(&mut self, other: OutcomeStore) -> Result<(), OutcomeError> {
        if self.learning_mode != other.learning_mode {
            return Err(OutcomeError::ModeMismatch {
                expected: self.learning_mode,
                found: other.learning_mode,
            });
        }
        self.outcomes.extend(other.outcomes);
        Ok(())
    }

    /// The sorted union of every label list in the store.
    pub fn labels(&self) -> Vec<String> {
        let mut all = BTreeSet::new();
        for outcome in &self.outcomes {
            all.extend(outcome.labels.iter().cloned());
        }
        all.into_iter().collect()
    }

    /// Re-projects every outcome onto the aggregated label universe. Labels
    /// an outcome never saw take the weight -1, below any sane threshold.
    pub fn homogenize(&self) -> OutcomeStore {
        let universe = self.labels();
        let mut homogenized = OutcomeStore::new(self.learning_mode);
        for outcome in &self.outcomes {
            let mut gold = vec![-1.0; universe.len()];
            let mut prediction = vec![-1.0; universe.len()];
            for (new_index, label) in universe.iter().enumerate() {
                if let Some(old_index) = outcome.labels.iter().position(|l| l == label) {
                    gold[new_index] = outcome.gold[old_index];
                    prediction[new_index] = outcome.prediction[old_index];
                }
            }
            homogenized.push(
                SingleOutcome::new(gold, prediction, universe.clone(), outcome.id.clone())
                    .with_threshold(outcome.bipartition_threshold),
            );
        }
        homogenized
    }

    /// Reads a store from the report text format. Lines before the `#labels`
    /// header and other `#` comment lines are skipped; single-label lines
    /// carry one index per field, multi-label lines carry full weight
    /// vectors.
    pub fn from_reader<R: BufRead>(
        reader: R,
        learning_mode: LearningMode,
    ) -> Result<Self, OutcomeError> {
        let mut store = OutcomeStore::new(learning_mode);
        let mut labels: Option<Vec<String>> = None;
        for line in reader.lines() {
            let line = line?;
            if line.starts_with("#labels") {
                labels = Some(parse_label_header(&line)?);
            } else if line.starts_with('#') || line.trim().is_empty() {
                continue;
            } else {
                let labels = labels.as_ref().ok_or(OutcomeError::MissingLabelHeader)?;
                store.push(parse_outcome_line(&line, labels)?);
            }
        }
        if store.is_empty() {
            return Err(OutcomeError::Empty);
        }
        Ok(store)
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        learning_mode: LearningMode,
    ) -> Result<Self, OutcomeError> {
        let reader = BufReader::new(File::open(path)?);
        Self::from_reader(reader, learning_mode)
    }

    /// Serializes the store back to the report text format, homogenized onto
    /// the aggregated label universe.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutcomeError> {
        let homogenized = self.homogenize();
        let universe = homogenized.labels();
        writeln!(writer, "#ID=PREDICTION;GOLDSTANDARD;THRESHOLD")?;
        write!(writer, "#labels")?;
        for (index, label) in universe.iter().enumerate() {
            write!(writer, " {}={}", index, percent_encode(label))?;
        }
        writeln!(writer)?;
        for outcome in homogenized.iter() {
            match self.learning_mode {
                LearningMode::SingleLabel => {
                    let prediction = positive_index(&outcome.prediction, &outcome.id)?;
                    let gold = positive_index(&outcome.gold, &outcome.id)?;
                    writeln!(
                        writer,
                        "{}={};{};{}",
                        outcome.id, prediction, gold, outcome.bipartition_threshold
                    )?;
                }
                LearningMode::MultiLabel => {
                    writeln!(
                        writer,
                        "{}={};{};{}",
                        outcome.id,
                        join_weights(&outcome.prediction),
                        join_weights(&outcome.gold),
                        outcome.bipartition_threshold
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn positive_index(values: &[f64], id: &str) -> Result<usize, OutcomeError> {
    values
        .iter()
        .position(|v| *v == 1.0)
        .ok_or_else(|| OutcomeError::MalformedLine(String::from(id)))
}

fn join_weights(values: &[f64]) -> String {
    values.iter().map(|v| format!("{:.3}", v)).join(",")
}

/// `#labels 0=A 1=B ...`, names percent-encoded, indices ascending.
fn parse_label_header(line: &str) -> Result<Vec<String>, OutcomeError> {
    let mut labels = Vec::new();
    for token in line.split(' ').skip(1) {
        if token.is_empty() {
            continue;
        }
        let name = token
            .splitn(2, '=')
            .nth(1)
            .ok_or_else(|| OutcomeError::MalformedLine(String::from(line)))?;
        labels.push(percent_decode(name)?);
    }
    Ok(labels)
}

fn parse_number(token: &str) -> Result<f64, OutcomeError> {
    token
        .parse::<f64>()
        .map_err(|_| OutcomeError::MalformedNumber(String::from(token)))
}

fn parse_index(token: &str) -> Result<usize, OutcomeError> {
    token
        .parse::<usize>()
        .map_err(|_| OutcomeError::MalformedNumber(String::from(token)))
}

/// An id may contain `=`; the separator is the right-most one.
fn parse_outcome_line(line: &str, labels: &[String]) -> Result<SingleOutcome, OutcomeError> {
    let separator = line
        .rfind('=')
        .ok_or_else(|| OutcomeError::MalformedLine(String::from(line)))?;
    let id = &line[..separator];
    let data = &line[separator + 1..];

    let mut fields = data.split(';');
    let prediction_field = fields
        .next()
        .ok_or_else(|| OutcomeError::MalformedLine(String::from(line)))?;
    let gold_field = fields
        .next()
        .ok_or_else(|| OutcomeError::MalformedLine(String::from(line)))?;
    let threshold = match fields.next() {
        Some(token) => parse_number(token)?,
        None => DEFAULT_BIPARTITION_THRESHOLD,
    };

    let prediction_tokens: Vec<&str> = prediction_field.split(',').collect();
    let gold_tokens: Vec<&str> = gold_field.split(',').collect();

    let (gold, prediction) = if prediction_tokens.len() == 1 && gold_tokens.len() == 1 {
        // single-label: each field is the index of the positive label
        let mut gold = vec![0.0; labels.len()];
        let mut prediction = vec![0.0; labels.len()];
        let gold_index = parse_index(gold_tokens[0])?;
        let prediction_index = parse_index(prediction_tokens[0])?;
        if gold_index >= labels.len() || prediction_index >= labels.len() {
            return Err(OutcomeError::MalformedLine(String::from(line)));
        }
        gold[gold_index] = 1.0;
        prediction[prediction_index] = 1.0;
        (gold, prediction)
    } else {
        // multi-label: full weight vectors
        if prediction_tokens.len() != labels.len() || gold_tokens.len() != labels.len() {
            return Err(OutcomeError::MalformedLine(String::from(line)));
        }
        let gold = gold_tokens
            .iter()
            .map(|t| parse_number(t))
            .collect::<Result<Vec<f64>, _>>()?;
        let prediction = prediction_tokens
            .iter()
            .map(|t| parse_number(t))
            .collect::<Result<Vec<f64>, _>>()?;
        (gold, prediction)
    };

    Ok(
        SingleOutcome::new(gold, prediction, labels.to_vec(), id)
            .with_threshold(threshold),
    )
}
