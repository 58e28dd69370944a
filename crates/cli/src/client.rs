//! API client for the forecast server's JSON API

use anyhow::{Context, Result};
use forecast_lib::{Outcome, RawInputRow, SchemaRegistry};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use url::Url;

/// API client for the forecast server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    values: &'a RawInputRow,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn schema(&self) -> Result<SchemaRegistry> {
        self.get("api/v1/schema").await
    }

    /// Submit one row. A rejected row (422) is an `Outcome::Failure`, not an error.
    pub async fn predict(&self, values: &RawInputRow) -> Result<Outcome> {
        let url = self.base_url.join("api/v1/predict").context("Invalid path")?;
        debug!(url = %url, columns = values.len(), "POST");

        let response = self
            .client
            .post(url)
            .json(&PredictRequest { values })
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}
