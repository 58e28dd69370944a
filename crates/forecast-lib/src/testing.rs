//! Small fixture bundles for tests
//!
//! The fixture mirrors the shape of the real weather bundle on a handful of
//! columns, with input columns deliberately interleaved so that projection
//! order is exercised.

use crate::bundle::{ArtifactBundle, BundleFile};
use crate::error::InferenceError;
use crate::inference::Classifier;
use crate::models::{RawInputRow, RawValue};
use std::path::Path;

/// Three numeric and two categorical columns, min-max scaled
pub const FIXTURE_BUNDLE_JSON: &str = r#"{
  "model": {
    "kind": "logistic_regression",
    "classes": ["No", "Yes"],
    "coef": [-0.5, 2.0, 3.0, 0.1, -0.2, 0.1, -0.4, 0.6],
    "intercept": -1.5
  },
  "imputer": { "strategy": "mean", "statistics": [12.0, 2.0, 50.0] },
  "scaler": { "kind": "min_max", "min": [0.2, 0.0, 0.0], "scale": [0.02, 0.01, 0.01] },
  "encoder": {
    "categories": [["N", "S", "W"], ["No", "Yes"]],
    "handle_unknown": "error"
  },
  "input_cols": ["MinTemp", "Rainfall", "WindDir9am", "Humidity3pm", "RainToday"],
  "numeric_cols": ["MinTemp", "Rainfall", "Humidity3pm"],
  "categorical_cols": ["WindDir9am", "RainToday"],
  "encoded_cols": ["WindDir9am_N", "WindDir9am_S", "WindDir9am_W", "RainToday_No", "RainToday_Yes"]
}"#;

pub fn fixture_bundle_file() -> BundleFile {
    serde_json::from_str(FIXTURE_BUNDLE_JSON).expect("fixture bundle is valid JSON")
}

pub fn fixture_bundle() -> ArtifactBundle {
    ArtifactBundle::from_file(fixture_bundle_file(), Path::new("."))
        .expect("fixture bundle is valid")
}

/// Classifier whose every call fails with a runtime error
pub struct FailingClassifier {
    classes: Vec<String>,
    n_features: usize,
}

impl FailingClassifier {
    pub fn new(n_features: usize) -> Self {
        Self {
            classes: vec!["No".to_string(), "Yes".to_string()],
            n_features,
        }
    }
}

impl Classifier for FailingClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "failing"
    }

    fn predict_proba(&self, _batch: &[&[f64]]) -> Result<Vec<Vec<f64>>, InferenceError> {
        Err(InferenceError::Runtime("session closed".to_string()))
    }
}

/// Fixture bundle whose classifier always fails
pub fn failing_bundle() -> ArtifactBundle {
    let bundle = fixture_bundle();
    let width = bundle.n_features();
    bundle
        .with_classifier(Box::new(FailingClassifier::new(width)))
        .expect("failing classifier matches the fixture width")
}

/// Fixture with every categorical column removed
pub fn numeric_only_bundle() -> ArtifactBundle {
    let mut file = fixture_bundle_file();
    file.input_cols.retain(|c| file.numeric_cols.contains(c));
    file.categorical_cols.clear();
    file.encoded_cols.clear();
    file.encoder.categories = Some(Vec::new());
    if let crate::inference::ModelSpec::LogisticRegression(lr) = &mut file.model {
        lr.coef.truncate(3);
    }
    ArtifactBundle::from_file(file, Path::new(".")).expect("numeric-only fixture is valid")
}

/// A complete, valid row for the fixture bundle
pub fn fixture_row() -> RawInputRow {
    RawInputRow::new()
        .with("MinTemp", RawValue::Number(15.0))
        .with("Rainfall", RawValue::Number(10.0))
        .with("WindDir9am", RawValue::Text("S".to_string()))
        .with("Humidity3pm", RawValue::Number(80.0))
        .with("RainToday", RawValue::Text("Yes".to_string()))
}
