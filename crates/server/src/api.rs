//! HTTP API: the prediction form, the JSON API, health checks and metrics

use crate::form::{FormRenderer, FormState, MISSING_PREFIX};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use forecast_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    Forecaster, FormInput, Outcome, RawInputRow,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub forecaster: Arc<Forecaster>,
    pub health_registry: HealthRegistry,
    renderer: Arc<FormRenderer>,
}

impl AppState {
    pub fn new(
        forecaster: Arc<Forecaster>,
        health_registry: HealthRegistry,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            forecaster,
            health_registry,
            renderer: Arc::new(FormRenderer::new()?),
        })
    }

    fn page(&self, state: &FormState<'_>, outcome: Option<&Outcome>) -> Response {
        match self
            .renderer
            .render_page(self.forecaster.schema(), state, outcome)
        {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to render form page");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }

    /// Submit one row and reflect model faults in the pipeline health.
    /// Bad user input leaves health untouched.
    async fn submit(&self, row: &RawInputRow) -> Outcome {
        let outcome = self.forecaster.submit(row);
        match &outcome {
            Outcome::Forecast(_) => {
                self.health_registry.set_healthy(components::PIPELINE).await;
            }
            Outcome::Failure { kind, message, .. } if kind == "inference" => {
                warn!(error = %message, "Classifier failed a request");
                self.health_registry
                    .set_degraded(components::PIPELINE, message.clone())
                    .await;
            }
            Outcome::Failure { .. } => {}
        }
        outcome
    }
}

/// Form page with presentation defaults
async fn index(State(state): State<Arc<AppState>>) -> Response {
    let row = state.forecaster.default_row();
    let missing = HashSet::new();
    state.page(
        &FormState {
            row: &row,
            missing: &missing,
        },
        None,
    )
}

/// Form submission: `<column>=<value>` fields plus `nan_<column>=on`
/// checkboxes for declared-missing numeric columns
async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let mut input = FormInput::new();
    let mut missing = HashSet::new();
    for (key, value) in fields {
        match key.strip_prefix(MISSING_PREFIX) {
            Some(column) => {
                missing.insert(column.to_string());
                input.mark_missing(column);
            }
            None => input.set(key, value),
        }
    }

    let row = state.forecaster.collect(&input);
    let outcome = state.submit(&row).await;
    state.page(
        &FormState {
            row: &row,
            missing: &missing,
        },
        Some(&outcome),
    )
}

/// Column schema with presentation metadata, in training order
async fn schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.forecaster.schema().clone())
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub values: RawInputRow,
}

/// JSON prediction: 200 with a forecast, 422 with a failure
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let row = state.forecaster.collect(&request.values);
    let outcome = state.submit(&row).await;

    let status = if outcome.is_forecast() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    match serde_json::to_value(&outcome) {
        Ok(mut body) => {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("text".to_string(), outcome.render_text().into());
            }
            (status, Json(body)).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit_form))
        .route("/api/v1/schema", get(schema))
        .route("/api/v1/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the server and run until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting forecast server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
