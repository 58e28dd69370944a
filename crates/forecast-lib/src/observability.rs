//! Observability infrastructure for the forecaster
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, loaded bundle)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, GaugeVec, Histogram,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    prediction_latency_seconds: Histogram,
    forecasts: IntCounterVec,
    prediction_failures: IntCounterVec,
    bundle_info: GaugeVec,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "rain_forecast_prediction_latency_seconds",
                "Time spent preprocessing and running inference for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            forecasts: register_int_counter_vec!(
                "rain_forecast_forecasts_total",
                "Forecasts served, by predicted label",
                &["label"]
            )
            .expect("Failed to register forecasts_total"),

            prediction_failures: register_int_counter_vec!(
                "rain_forecast_prediction_failures_total",
                "Prediction requests that failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_failures_total"),

            bundle_info: register_gauge_vec!(
                "rain_forecast_bundle_info",
                "Information about the loaded artifact bundle",
                &["version", "model"]
            )
            .expect("Failed to register bundle_info"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share the same metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    _private: (),
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecastMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_forecast(&self, label: &str) {
        self.inner().forecasts.with_label_values(&[label]).inc();
    }

    pub fn inc_failure(&self, kind: &str) {
        self.inner().prediction_failures.with_label_values(&[kind]).inc();
    }

    pub fn forecast_count(&self, label: &str) -> u64 {
        self.inner().forecasts.with_label_values(&[label]).get()
    }

    pub fn failure_count(&self, kind: &str) -> u64 {
        self.inner().prediction_failures.with_label_values(&[kind]).get()
    }

    pub fn set_bundle(&self, version: &str, model: &str) {
        self.inner().bundle_info.reset();
        self.inner()
            .bundle_info
            .with_label_values(&[version, model])
            .set(1.0);
    }
}

/// Structured logger for forecaster events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, bundle_version: &str) {
        info!(
            event = "forecaster_started",
            instance = %self.instance,
            app_version = %version,
            bundle_version = %bundle_version,
            "Rain forecaster started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "forecaster_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Rain forecaster shutting down"
        );
    }

    pub fn log_bundle_loaded(
        &self,
        path: &str,
        bundle_version: &str,
        model: &str,
        n_features: usize,
    ) {
        info!(
            event = "bundle_loaded",
            instance = %self.instance,
            path = %path,
            bundle_version = %bundle_version,
            model = %model,
            n_features = n_features,
            "Artifact bundle ready"
        );
    }

    pub fn log_prediction(
        &self,
        label: &str,
        probability: f64,
        latency_us: u128,
        bundle_version: &str,
    ) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            label = %label,
            probability = probability,
            latency_us = latency_us as u64,
            bundle_version = %bundle_version,
            "Generated rain forecast"
        );
    }

    pub fn log_prediction_failure(&self, kind: &str, details: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            kind = %kind,
            details = %details,
            "Prediction request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_metrics() {
        let metrics = ForecastMetrics::new();
        metrics.observe_prediction_latency(0.0002);
        metrics.set_bundle("sha256:abc", "logistic_regression");

        let before = metrics.failure_count("validation");
        metrics.inc_failure("validation");
        assert_eq!(metrics.failure_count("validation"), before + 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
    }
}
