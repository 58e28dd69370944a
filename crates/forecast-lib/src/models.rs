//! Core data models for the forecaster

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One scalar value of a raw input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    /// Explicit "no data" marker for a numeric column
    Missing,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Missing => f.write_str("<missing>"),
        }
    }
}

/// One user-supplied record, keyed by input column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputRow {
    values: HashMap<String, RawValue>,
}

impl RawInputRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        self.values.insert(column.into(), value);
    }

    pub fn with(mut self, column: impl Into<String>, value: RawValue) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Model-ready features: `[numeric block][encoded block]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
    numeric_width: usize,
}

impl FeatureVector {
    /// Concatenate the numeric block and the encoded block, numeric first
    pub fn concat(numeric: Vec<f64>, encoded: Vec<f64>) -> Self {
        let numeric_width = numeric.len();
        let mut values = numeric;
        values.extend(encoded);
        Self {
            values,
            numeric_width,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn numeric_block(&self) -> &[f64] {
        &self.values[..self.numeric_width]
    }

    pub fn encoded_block(&self) -> &[f64] {
        &self.values[self.numeric_width..]
    }
}

/// Rain-tomorrow class tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    No,
    Yes,
}

impl Label {
    pub const NEGATIVE: &'static str = "No";
    pub const POSITIVE: &'static str = "Yes";

    pub fn from_class(class: &str) -> Option<Self> {
        match class {
            Self::NEGATIVE => Some(Label::No),
            Self::POSITIVE => Some(Label::Yes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::No => Self::NEGATIVE,
            Label::Yes => Self::POSITIVE,
        }
    }

    /// Human phrase shown next to the probability
    pub fn phrase(&self) -> &'static str {
        match self {
            Label::Yes => "☔ Rain",
            Label::No => "⛅ No Rain",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,
    /// P(rain tomorrow)
    pub probability: f64,
    pub generated_at: i64,
}

impl PredictionResult {
    pub fn new(label: Label, probability: f64) -> Self {
        Self {
            label,
            probability,
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Probability as a percentage with one decimal place
    pub fn probability_percent(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }
}
