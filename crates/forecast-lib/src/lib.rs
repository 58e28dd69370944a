//! Rain-tomorrow forecasting library
//!
//! This crate provides the core functionality for:
//! - Loading and validating the artifact bundle (model, transformers, schema)
//! - Collecting raw input rows against the column schema
//! - The preprocessing pipeline (impute, scale, encode, concatenate)
//! - Binary classification with a rain probability
//! - Health checks and observability

pub mod bundle;
pub mod error;
pub mod forecaster;
pub mod health;
pub mod inference;
pub mod input;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod schema;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transform;

pub use bundle::{ArtifactBundle, BundleFile, DEFAULT_BUNDLE_PATH};
pub use error::{InferenceError, LoadError, PredictError, TransformError, ValidationError};
pub use forecaster::{Forecaster, Outcome, FORECAST_NOTE, REMEDIATION_HINT};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use input::{FormInput, InputCollector, InputSource};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger};
pub use schema::{ColumnKind, ColumnSpec, SchemaRegistry};
