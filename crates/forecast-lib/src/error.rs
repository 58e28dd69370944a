//! Error taxonomy for bundle loading and prediction
//!
//! `LoadError` is fatal at startup. Everything that can go wrong while
//! serving a single prediction is a `PredictError`, which the request
//! boundary converts into a user-visible message.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load or validate the artifact bundle
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bundle {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse bundle {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("bundle checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid bundle schema: {0}")]
    Schema(String),

    #[error("invalid {component}: {message}")]
    Component {
        component: &'static str,
        message: String,
    },

    #[error("failed to load ONNX model {path}: {message}")]
    Onnx { path: PathBuf, message: String },
}

impl LoadError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        LoadError::Schema(message.into())
    }

    pub(crate) fn component(component: &'static str, message: impl Into<String>) -> Self {
        LoadError::Component {
            component,
            message: message.into(),
        }
    }
}

/// Malformed user input detected at the prediction boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("column '{0}' is missing from the input row")]
    MissingColumn(String),

    #[error("column '{column}' expects a number, got '{value}'")]
    NotNumeric { column: String, value: String },

    #[error("column '{0}' expects a category value")]
    NotCategorical(String),
}

/// Failure raised by the imputer, scaler or encoder
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("{transformer} expects {expected} columns, got {actual}")]
    WidthMismatch {
        transformer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("found unknown category '{value}' in column '{column}' during transform")]
    UnknownCategory { column: String, value: String },

    #[error("encoder was fitted without category lists")]
    NoCategories,

    #[error("{transformer} produced a non-finite value for column {index}")]
    NonFinite {
        transformer: &'static str,
        index: usize,
    },
}

/// Failure raised by the classifier
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("model expects {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("model returned {actual} probabilities, expected {expected}")]
    MalformedOutput { expected: usize, actual: usize },

    #[error("probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),

    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// Any failure while serving one prediction request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Short kind label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation",
            PredictError::Transform(_) => "transform",
            PredictError::Inference(_) => "inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_error_is_transparent() {
        let err: PredictError = TransformError::UnknownCategory {
            column: "WindDir9am".to_string(),
            value: "XYZ".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "found unknown category 'XYZ' in column 'WindDir9am' during transform"
        );
        assert_eq!(err.kind(), "transform");
    }

    #[test]
    fn test_error_kinds() {
        let v: PredictError = ValidationError::MissingColumn("MinTemp".into()).into();
        let i: PredictError = InferenceError::FeatureMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(v.kind(), "validation");
        assert_eq!(i.kind(), "inference");
    }
}
