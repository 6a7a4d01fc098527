use anyhow::{anyhow, Context, Result};
use pushkit_core::{Platform, ReleaseHistory, ReleaseHistoryFetcher, UpdateCheckRequest};
use reqwest::blocking::Client;
use tracing::debug;

use crate::history_path::history_path;
use crate::signed::verify_history_signature;
use crate::transport::{build_client, get_optional, join_url};

/// Release histories served over HTTP(S) from a static base URL.
#[derive(Debug, Clone)]
pub struct HttpHistorySource {
    base_url: String,
    platform: Platform,
    identifier: String,
    public_key: Option<String>,
    client: Client,
}

impl HttpHistorySource {
    pub fn new(
        base_url: impl Into<String>,
        platform: Platform,
        identifier: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            platform,
            identifier: identifier.into(),
            public_key: None,
            client: build_client()?,
        })
    }

    pub fn with_public_key(mut self, public_key_hex: impl Into<String>) -> Self {
        self.public_key = Some(public_key_hex.into());
        self
    }

    pub fn history_url(&self, app_version: &str) -> Result<String> {
        let relative = history_path(self.platform, &self.identifier, app_version)?;
        Ok(join_url(&self.base_url, &relative))
    }
}

impl ReleaseHistoryFetcher for HttpHistorySource {
    fn fetch_history(&self, request: &UpdateCheckRequest) -> Result<ReleaseHistory> {
        let url = self.history_url(&request.app_version)?;
        let Some(bytes) = get_optional(&self.client, &url)? else {
            debug!(url = %url, "no release history published");
            return Ok(ReleaseHistory::new());
        };

        if let Some(public_key) = &self.public_key {
            let signature_url = format!("{url}.sig");
            let signature = get_optional(&self.client, &signature_url)?.ok_or_else(|| {
                anyhow!("release history signature is missing: {signature_url}")
            })?;
            verify_history_signature(&bytes, public_key, &signature, &url)?;
        }

        let history = ReleaseHistory::from_json_slice(&bytes)
            .with_context(|| format!("failed parsing release history: {url}"))?;
        debug!(url = %url, releases = history.len(), "loaded release history");
        Ok(history)
    }
}
