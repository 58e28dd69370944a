//! Binary classifier backends and the inference step
//!
//! Two backends are supported: a native logistic regression whose weights
//! live in the bundle itself, and an ONNX graph loaded with tract for
//! models that were exported separately.

use crate::bundle::ArtifactBundle;
use crate::error::{InferenceError, LoadError, PredictError};
use crate::models::{FeatureVector, Label, PredictionResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Column of `predict_proba` holding P(rain)
pub const POSITIVE_CLASS_INDEX: usize = 1;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// A fitted binary classifier
pub trait Classifier: Send + Sync {
    /// Class tags in probability-column order
    fn classes(&self) -> &[String];

    /// Number of input features expected per row
    fn n_features(&self) -> usize;

    /// Backend name for logs and metrics
    fn kind(&self) -> &'static str;

    /// Per-row class probabilities, one column per class
    fn predict_proba(&self, batch: &[&[f64]]) -> Result<Vec<Vec<f64>>, InferenceError>;

    /// Per-row class tag with the highest probability
    fn predict(&self, batch: &[&[f64]]) -> Result<Vec<String>, InferenceError> {
        let classes = self.classes();
        self.predict_proba(batch)?
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
                        Some((_, bp)) if bp >= *p => best,
                        _ => Some((i, *p)),
                    })
                    .map(|(i, _)| i)
                    .ok_or(InferenceError::MalformedOutput {
                        expected: classes.len(),
                        actual: 0,
                    })?;
                classes
                    .get(best)
                    .cloned()
                    .ok_or(InferenceError::MalformedOutput {
                        expected: classes.len(),
                        actual: row.len(),
                    })
            })
            .collect()
    }
}

fn check_width(expected: usize, row: &[f64]) -> Result<(), InferenceError> {
    if row.len() != expected {
        return Err(InferenceError::FeatureMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Serialized model section of the bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression(LogisticRegression),
    Onnx {
        /// Path to the `.onnx` file, relative to the bundle
        path: PathBuf,
        classes: Vec<String>,
        n_features: usize,
        /// Index of the graph output holding class probabilities
        #[serde(default = "default_probability_output")]
        probability_output: usize,
    },
}

fn default_probability_output() -> usize {
    1
}

impl ModelSpec {
    /// Materialize the classifier. Relative ONNX paths resolve against `base_dir`.
    pub fn into_classifier(self, base_dir: &Path) -> Result<Box<dyn Classifier>, LoadError> {
        match self {
            ModelSpec::LogisticRegression(lr) => {
                lr.check()
                    .map_err(|m| LoadError::component("model", m))?;
                Ok(Box::new(lr))
            }
            ModelSpec::Onnx {
                path,
                classes,
                n_features,
                probability_output,
            } => {
                let path = base_dir.join(path);
                let bytes = std::fs::read(&path).map_err(|e| LoadError::Onnx {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                let classifier =
                    OnnxClassifier::new(&bytes, classes, n_features, probability_output)
                        .map_err(|e| LoadError::Onnx {
                            path,
                            message: format!("{:#}", e),
                        })?;
                Ok(Box::new(classifier))
            }
        }
    }
}

/// Binary logistic regression: `p = sigmoid(coef · x + intercept)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<String>,
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    fn check(&self) -> Result<(), String> {
        if self.classes.len() != 2 {
            return Err(format!(
                "logistic regression must have 2 classes, found {}",
                self.classes.len()
            ));
        }
        if !self.intercept.is_finite() || self.coef.iter().any(|c| !c.is_finite()) {
            return Err("coefficients must be finite".to_string());
        }
        Ok(())
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.coef.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + self.intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn predict_proba(&self, batch: &[&[f64]]) -> Result<Vec<Vec<f64>>, InferenceError> {
        batch
            .iter()
            .map(|row| {
                check_width(self.coef.len(), row)?;
                let p = sigmoid(self.decision(row));
                Ok(vec![1.0 - p, p])
            })
            .collect()
    }
}

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// ONNX classifier run through tract, one row per invocation
pub struct OnnxClassifier {
    model: TractModel,
    classes: Vec<String>,
    n_features: usize,
    probability_output: usize,
}

impl OnnxClassifier {
    pub fn new(
        model_bytes: &[u8],
        classes: Vec<String>,
        n_features: usize,
        probability_output: usize,
    ) -> anyhow::Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?;
        Self::from_typed(model, classes, n_features, probability_output)
    }

    /// Wrap an already typed graph taking one `[1, n_features]` f32 input
    pub fn from_typed(
        model: TypedModel,
        classes: Vec<String>,
        n_features: usize,
        probability_output: usize,
    ) -> anyhow::Result<Self> {
        let model = model
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self {
            model,
            classes,
            n_features,
            probability_output,
        })
    }

    fn run_row(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_width(self.n_features, row)?;
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)
            .map_err(|e| InferenceError::Runtime(e.to_string()))?
            .into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let output = outputs
            .get(self.probability_output)
            .ok_or_else(|| {
                InferenceError::Runtime("no probability output from model".to_string())
            })?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let values: Vec<f64> = view.iter().map(|v| *v as f64).collect();

        if values.len() != self.classes.len() {
            return Err(InferenceError::MalformedOutput {
                expected: self.classes.len(),
                actual: values.len(),
            });
        }
        Ok(values)
    }
}

impl Classifier for OnnxClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn predict_proba(&self, batch: &[&[f64]]) -> Result<Vec<Vec<f64>>, InferenceError> {
        batch.iter().map(|row| self.run_row(row)).collect()
    }
}

/// Run the bundle's classifier on one processed feature vector.
///
/// `predict` and `predict_proba` both see the same single-row batch; the
/// label comes from the former and P(rain) from the positive column of
/// the latter.
pub fn infer(
    features: &FeatureVector,
    bundle: &ArtifactBundle,
) -> Result<PredictionResult, PredictError> {
    let start = Instant::now();
    let model = bundle.model();
    let batch = [features.as_slice()];

    let labels = model.predict(&batch)?;
    let probabilities = model.predict_proba(&batch)?;

    let class = labels.first().ok_or(InferenceError::MalformedOutput {
        expected: 1,
        actual: 0,
    })?;
    let label = Label::from_class(class)
        .ok_or_else(|| InferenceError::Runtime(format!("unexpected class '{}'", class)))?;

    let row = probabilities.first().ok_or(InferenceError::MalformedOutput {
        expected: 1,
        actual: 0,
    })?;
    let probability = *row
        .get(POSITIVE_CLASS_INDEX)
        .ok_or(InferenceError::MalformedOutput {
            expected: model.classes().len(),
            actual: row.len(),
        })?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(InferenceError::ProbabilityOutOfRange(probability).into());
    }

    let elapsed = start.elapsed();
    if elapsed.as_millis() > MAX_INFERENCE_MS {
        warn!(
            elapsed_ms = elapsed.as_millis(),
            "Inference exceeded {}ms target", MAX_INFERENCE_MS
        );
    } else {
        debug!(
            elapsed_us = elapsed.as_micros(),
            model = model.kind(),
            "Inference completed"
        );
    }

    Ok(PredictionResult::new(label, probability))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lr(coef: Vec<f64>, intercept: f64) -> LogisticRegression {
        LogisticRegression {
            classes: vec!["No".to_string(), "Yes".to_string()],
            coef,
            intercept,
        }
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_probabilities_sum_to_one() {
        let model = lr(vec![0.5, -1.0], 0.25);
        let row: &[f64] = &[1.0, 2.0];
        let proba = model.predict_proba(&[row]).unwrap();
        assert_eq!(proba.len(), 1);
        assert!((proba[0][0] + proba[0][1] - 1.0).abs() < 1e-12);
        // z = 0.5 - 2.0 + 0.25 = -1.25
        assert!((proba[0][1] - sigmoid(-1.25)).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_predict_follows_probability() {
        let model = lr(vec![1.0], 0.0);
        let (wet, dry, even): (&[f64], &[f64], &[f64]) = (&[3.0], &[-3.0], &[0.0]);
        assert_eq!(model.predict(&[wet]).unwrap(), vec!["Yes".to_string()]);
        assert_eq!(model.predict(&[dry]).unwrap(), vec!["No".to_string()]);
        // ties go to the first class
        assert_eq!(model.predict(&[even]).unwrap(), vec!["No".to_string()]);
    }

    #[test]
    fn test_feature_mismatch() {
        let model = lr(vec![1.0, 1.0], 0.0);
        let row: &[f64] = &[1.0];
        let err = model.predict_proba(&[row]).unwrap_err();
        assert_eq!(
            err,
            InferenceError::FeatureMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_logistic_check() {
        let mut model = lr(vec![1.0], 0.0);
        assert!(model.check().is_ok());
        model.classes.push("Maybe".to_string());
        assert!(model.check().is_err());
        let model = lr(vec![f64::NAN], 0.0);
        assert!(model.check().is_err());
    }

    #[test]
    fn test_model_spec_deserialize() {
        let spec: ModelSpec = serde_json::from_str(
            r#"{"kind": "logistic_regression", "classes": ["No", "Yes"],
                "coef": [0.1], "intercept": -0.2}"#,
        )
        .unwrap();
        let classifier = spec.into_classifier(Path::new(".")).unwrap();
        assert_eq!(classifier.kind(), "logistic_regression");
        assert_eq!(classifier.n_features(), 1);
    }

    #[test]
    fn test_missing_onnx_file_is_load_error() {
        let spec = ModelSpec::Onnx {
            path: PathBuf::from("does-not-exist.onnx"),
            classes: vec!["No".to_string(), "Yes".to_string()],
            n_features: 3,
            probability_output: 1,
        };
        let err = spec.into_classifier(Path::new("/nonexistent")).err().unwrap();
        assert!(matches!(err, LoadError::Onnx { .. }));
    }

    /// Graph whose only output is its `[1, width]` input
    fn passthrough_graph(width: usize) -> TypedModel {
        let mut model = TypedModel::default();
        let input = model.add_source("features", f32::fact([1, width])).unwrap();
        model.set_output_outlets(&[input]).unwrap();
        model
    }

    fn classes() -> Vec<String> {
        vec!["No".to_string(), "Yes".to_string()]
    }

    #[test]
    fn test_onnx_classifier_runs_graph() {
        let model = OnnxClassifier::from_typed(passthrough_graph(2), classes(), 2, 0).unwrap();
        assert_eq!(model.kind(), "onnx");
        assert_eq!(model.n_features(), 2);

        let row: &[f64] = &[0.25, 0.75];
        let proba = model.predict_proba(&[row]).unwrap();
        assert_eq!(proba.len(), 1);
        assert!((proba[0][0] - 0.25).abs() < 1e-6);
        assert!((proba[0][1] - 0.75).abs() < 1e-6);
        assert_eq!(model.predict(&[row]).unwrap(), vec!["Yes".to_string()]);
    }

    #[test]
    fn test_onnx_missing_probability_output() {
        let model = OnnxClassifier::from_typed(passthrough_graph(2), classes(), 2, 1).unwrap();
        let row: &[f64] = &[0.5, 0.5];
        let err = model.predict_proba(&[row]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Runtime(ref m) if m.contains("no probability output")
        ));
    }

    #[test]
    fn test_onnx_output_width_must_match_classes() {
        let model = OnnxClassifier::from_typed(passthrough_graph(3), classes(), 3, 0).unwrap();
        let row: &[f64] = &[0.2, 0.3, 0.5];
        assert_eq!(
            model.predict_proba(&[row]).unwrap_err(),
            InferenceError::MalformedOutput {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_onnx_row_width_checked_before_running() {
        let model = OnnxClassifier::from_typed(passthrough_graph(2), classes(), 2, 0).unwrap();
        let row: &[f64] = &[1.0];
        assert_eq!(
            model.predict_proba(&[row]).unwrap_err(),
            InferenceError::FeatureMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_invalid_onnx_bytes_rejected() {
        let result = OnnxClassifier::new(b"not a protobuf", classes(), 2, 0);
        assert!(result.is_err());
    }
}
