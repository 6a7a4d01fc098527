use anyhow::{Context, Result};
use pushkit_core::{UpdateCheckRequest, UpdateCheckResponse, UpdateOracle};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::transport::build_client;

/// Legacy update server that decides on the device's behalf.
#[derive(Debug, Clone)]
pub struct HttpUpdateOracle {
    endpoint: String,
    client: Client,
}

impl HttpUpdateOracle {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            client: build_client()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl UpdateOracle for HttpUpdateOracle {
    fn check(&self, request: &UpdateCheckRequest) -> Result<UpdateCheckResponse> {
        let body = serde_json::to_vec(request).context("failed to encode update check request")?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .with_context(|| format!("update check request failed: {}", self.endpoint))?
            .error_for_status()
            .with_context(|| format!("update check rejected: {}", self.endpoint))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("failed reading update check response: {}", self.endpoint))?;

        let response: UpdateCheckResponse = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed parsing update check response: {}", self.endpoint))?;
        debug!(
            endpoint = %self.endpoint,
            has_update = response.update_info.is_some(),
            "update check answered"
        );
        Ok(response)
    }
}
