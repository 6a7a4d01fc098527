use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

/// GETs `url`; a 404 is reported as `None`.
pub(crate) fn get_optional(client: &Client, url: &str) -> Result<Option<Vec<u8>>> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {url}"))?;
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let response = response
        .error_for_status()
        .with_context(|| format!("request rejected: {url}"))?;
    let body = response
        .bytes()
        .with_context(|| format!("failed reading response body: {url}"))?;
    Ok(Some(body.to_vec()))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
