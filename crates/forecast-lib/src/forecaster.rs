//! Request boundary: collect → process → infer, with error capture
//!
//! `Forecaster` is the constructed-once context shared by every request.
//! It owns a reference to the immutable bundle plus the derived schema, so
//! concurrent callers need no locking.

use crate::bundle::ArtifactBundle;
use crate::error::PredictError;
use crate::inference::infer;
use crate::input::{InputCollector, InputSource};
use crate::models::{PredictionResult, RawInputRow};
use crate::observability::{ForecastMetrics, StructuredLogger};
use crate::pipeline::process;
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Shown under every failed prediction
pub const REMEDIATION_HINT: &str = "Check if all parameters are entered correctly. \
If the error persists, please contact the developer.";

/// Shown under every successful prediction
pub const FORECAST_NOTE: &str = "Note: The model takes into account all entered parameters. \
The closer the probability is to 100%, the higher the model's confidence in predicting rain.";

/// Result of one submitted form, as presented to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Forecast(PredictionResult),
    Failure {
        kind: String,
        message: String,
        hint: String,
    },
}

impl Outcome {
    pub fn is_forecast(&self) -> bool {
        matches!(self, Outcome::Forecast(_))
    }

    /// Human-readable summary, one line per fact
    pub fn render_text(&self) -> String {
        match self {
            Outcome::Forecast(result) => format!(
                "Prediction: {}\nRain probability: {}",
                result.label.phrase(),
                result.probability_percent()
            ),
            Outcome::Failure { message, hint, .. } => format!("{}\n{}", message, hint),
        }
    }
}

pub struct Forecaster {
    bundle: Arc<ArtifactBundle>,
    schema: SchemaRegistry,
    metrics: ForecastMetrics,
    logger: StructuredLogger,
}

impl Forecaster {
    pub fn new(bundle: Arc<ArtifactBundle>) -> Self {
        Self::with_logger(bundle, StructuredLogger::new("rain-forecast"))
    }

    pub fn with_logger(bundle: Arc<ArtifactBundle>, logger: StructuredLogger) -> Self {
        let schema = SchemaRegistry::from_bundle(&bundle);
        let metrics = ForecastMetrics::new();
        metrics.set_bundle(bundle.version(), bundle.model().kind());
        Self {
            bundle,
            schema,
            metrics,
            logger,
        }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Gather one raw row from a presentation-layer source
    pub fn collect(&self, source: &dyn InputSource) -> RawInputRow {
        InputCollector::new(&self.schema).collect(source)
    }

    /// Row of presentation defaults (the documented example observation)
    pub fn default_row(&self) -> RawInputRow {
        InputCollector::new(&self.schema).defaults()
    }

    /// Preprocess and classify one row
    pub fn predict(&self, row: &RawInputRow) -> Result<PredictionResult, PredictError> {
        let features = process(row, &self.bundle)?;
        infer(&features, &self.bundle)
    }

    /// The single catch boundary: every per-request error becomes a
    /// user-visible failure and the forecaster keeps serving.
    pub fn submit(&self, row: &RawInputRow) -> Outcome {
        let start = Instant::now();
        let result = self.predict(row);
        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());

        match result {
            Ok(prediction) => {
                self.metrics.inc_forecast(prediction.label.as_str());
                self.logger.log_prediction(
                    prediction.label.as_str(),
                    prediction.probability,
                    elapsed.as_micros(),
                    self.bundle.version(),
                );
                Outcome::Forecast(prediction)
            }
            Err(err) => {
                self.metrics.inc_failure(err.kind());
                self.logger.log_prediction_failure(err.kind(), &err.to_string());
                Outcome::Failure {
                    kind: err.kind().to_string(),
                    message: format!("Error: {}", err),
                    hint: REMEDIATION_HINT.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::FormInput;
    use crate::models::{Label, RawValue};
    use crate::testing::{failing_bundle, fixture_bundle, fixture_row, numeric_only_bundle};

    fn forecaster() -> Forecaster {
        Forecaster::new(Arc::new(fixture_bundle()))
    }

    #[test]
    fn test_submit_default_row() {
        let f = forecaster();
        let outcome = f.submit(&f.default_row());
        match outcome {
            Outcome::Forecast(result) => {
                assert!((0.0..=1.0).contains(&result.probability));
            }
            other => panic!("expected forecast, got {:?}", other),
        }
    }

    #[test]
    fn test_predict_matches_hand_computation() {
        let f = forecaster();
        let result = f.predict(&fixture_row()).unwrap();
        // features [0.5, 0.1, 0.8, 0, 1, 0, 0, 1]
        let z: f64 = -0.5 * 0.5 + 2.0 * 0.1 + 3.0 * 0.8 - 0.2 + 0.6 - 1.5;
        let p = 1.0 / (1.0 + (-z).exp());
        assert!((result.probability - p).abs() < 1e-9);
        assert_eq!(result.label, Label::Yes);
    }

    #[test]
    fn test_failure_then_recovery() {
        let f = forecaster();
        let bad = fixture_row().with("WindDir9am", RawValue::Text("XYZ".into()));
        let outcome = f.submit(&bad);
        match &outcome {
            Outcome::Failure {
                kind,
                message,
                hint,
            } => {
                assert_eq!(kind, "transform");
                assert!(message.starts_with("Error: "));
                assert!(message.contains("XYZ"));
                assert_eq!(hint, REMEDIATION_HINT);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(f.submit(&fixture_row()).is_forecast());
    }

    #[test]
    fn test_failures_are_counted() {
        let f = forecaster();
        let before = f.metrics.failure_count("validation");
        f.submit(&fixture_row().with("MinTemp", RawValue::Text("abc".into())));
        assert!(f.metrics.failure_count("validation") > before);
    }

    #[test]
    fn test_collect_from_form() {
        let f = forecaster();
        let mut form = FormInput::new();
        for col in ["MinTemp", "Rainfall", "Humidity3pm"] {
            form.mark_missing(col);
        }
        let row = f.collect(&form);
        let result = f.predict(&row).unwrap();
        assert!((0.0..=1.0).contains(&result.probability));
    }

    #[test]
    fn test_nan_text_is_rejected_not_imputed() {
        let f = forecaster();
        let mut form = FormInput::new();
        form.set("MinTemp", "NaN");
        match f.submit(&f.collect(&form)) {
            Outcome::Failure { kind, message, .. } => {
                assert_eq!(kind, "validation");
                assert!(message.contains("NaN"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // declaring "no data" is the only way to reach the imputer
        let mut form = FormInput::new();
        form.mark_missing("MinTemp");
        assert!(f.submit(&f.collect(&form)).is_forecast());
    }

    #[test]
    fn test_infinite_text_is_validation_failure() {
        let f = forecaster();
        let mut form = FormInput::new();
        form.set("Rainfall", "inf");
        match f.submit(&f.collect(&form)) {
            Outcome::Failure { kind, .. } => assert_eq!(kind, "validation"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_classifier_fault_is_inference_failure() {
        let f = Forecaster::new(Arc::new(failing_bundle()));
        match f.submit(&fixture_row()) {
            Outcome::Failure { kind, message, hint } => {
                assert_eq!(kind, "inference");
                assert!(message.contains("session closed"));
                assert_eq!(hint, REMEDIATION_HINT);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_only_bundle() {
        let f = Forecaster::new(Arc::new(numeric_only_bundle()));
        assert!(f.submit(&fixture_row()).is_forecast());
    }

    #[test]
    fn test_render_text() {
        let outcome = Outcome::Forecast(PredictionResult::new(Label::No, 0.123));
        assert_eq!(
            outcome.render_text(),
            "Prediction: ⛅ No Rain\nRain probability: 12.3%"
        );
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let failure = Outcome::Failure {
            kind: "validation".into(),
            message: "Error: x".into(),
            hint: REMEDIATION_HINT.into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["outcome"], "failure");

        let forecast = Outcome::Forecast(PredictionResult::new(Label::Yes, 0.9));
        let json = serde_json::to_value(&forecast).unwrap();
        assert_eq!(json["outcome"], "forecast");
        assert_eq!(json["label"], "Yes");
    }
}
