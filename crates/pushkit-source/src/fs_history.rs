use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pushkit_core::{Platform, ReleaseHistory, ReleaseHistoryFetcher, UpdateCheckRequest};
use tracing::debug;

use crate::history_path::history_path;
use crate::signed::verify_history_signature;

/// Release histories published as files under a local directory.
#[derive(Debug, Clone)]
pub struct FsHistorySource {
    root: PathBuf,
    platform: Platform,
    identifier: String,
    public_key: Option<String>,
}

impl FsHistorySource {
    pub fn new(root: impl Into<PathBuf>, platform: Platform, identifier: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            platform,
            identifier: identifier.into(),
            public_key: None,
        }
    }

    /// Requires every history to carry a valid `<file>.sig` for this key.
    pub fn with_public_key(mut self, public_key_hex: impl Into<String>) -> Self {
        self.public_key = Some(public_key_hex.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_file(&self, app_version: &str) -> Result<PathBuf> {
        let relative = history_path(self.platform, &self.identifier, app_version)?;
        Ok(self.root.join(relative))
    }
}

impl ReleaseHistoryFetcher for FsHistorySource {
    fn fetch_history(&self, request: &UpdateCheckRequest) -> Result<ReleaseHistory> {
        let path = self.history_file(&request.app_version)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no release history published");
                return Ok(ReleaseHistory::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading release history: {}", path.display()));
            }
        };

        if let Some(public_key) = &self.public_key {
            let mut signature_path = path.clone().into_os_string();
            signature_path.push(".sig");
            let signature_path = PathBuf::from(signature_path);
            let signature = fs::read(&signature_path).with_context(|| {
                format!(
                    "failed reading release history signature: {}",
                    signature_path.display()
                )
            })?;
            verify_history_signature(
                &bytes,
                public_key,
                &signature,
                &path.display().to_string(),
            )?;
        }

        let history = ReleaseHistory::from_json_slice(&bytes)
            .with_context(|| format!("failed parsing release history: {}", path.display()))?;
        debug!(
            path = %path.display(),
            releases = history.len(),
            "loaded release history"
        );
        Ok(history)
    }
}
