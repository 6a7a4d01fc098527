use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use pushkit_core::{CheckFrequency, ConfigProvider, Platform, RuntimeConfig, SyncOptions};
use pushkit_source::{FsHistorySource, HttpHistorySource, HttpUpdateOracle};
use pushkit_sync::ReleaseSource;
use serde::Deserialize;

/// Contents of `pushkit.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CliConfig {
    #[serde(default)]
    pub(crate) check_frequency: CheckFrequency,
    pub(crate) runtime: RuntimeConfig,
    pub(crate) source: SourceConfig,
    #[serde(default)]
    pub(crate) sync: SyncOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SourceConfig {
    pub(crate) kind: SourceKind,
    /// Base URL or directory of release histories, or the check endpoint of
    /// an oracle.
    pub(crate) location: String,
    #[serde(default)]
    pub(crate) identifier: String,
    #[serde(default)]
    pub(crate) public_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SourceKind {
    History,
    Oracle,
}

impl CliConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed loading config: {}", path.display()))
    }

    pub(crate) fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse pushkit config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.runtime.app_version.trim().is_empty() {
            return Err(anyhow!("runtime.app_version must not be empty"));
        }
        if let Some(retry) = &self.sync.rollback_retry {
            retry.validate()?;
        }
        if self.source.location.trim().is_empty() {
            return Err(anyhow!("source.location must not be empty"));
        }
        match self.source.kind {
            SourceKind::History if self.source.identifier.trim().is_empty() => Err(anyhow!(
                "source.identifier is required for history sources"
            )),
            SourceKind::Oracle if !is_http_location(&self.source.location) => Err(anyhow!(
                "oracle source location must be an http(s) url: {}",
                self.source.location
            )),
            _ => Ok(()),
        }
    }
}

impl SourceConfig {
    pub(crate) fn build(&self, platform: Platform) -> Result<ReleaseSource> {
        match self.kind {
            SourceKind::Oracle => Ok(ReleaseSource::oracle(HttpUpdateOracle::new(
                self.location.clone(),
            )?)),
            SourceKind::History if is_http_location(&self.location) => {
                let mut source =
                    HttpHistorySource::new(self.location.clone(), platform, self.identifier.clone())?;
                if let Some(key) = &self.public_key {
                    source = source.with_public_key(key.clone());
                }
                Ok(ReleaseSource::history(source))
            }
            SourceKind::History => {
                let root = PathBuf::from(self.location.trim_start_matches("file://"));
                let mut source = FsHistorySource::new(root, platform, self.identifier.clone());
                if let Some(key) = &self.public_key {
                    source = source.with_public_key(key.clone());
                }
                Ok(ReleaseSource::history(source))
            }
        }
    }
}

fn is_http_location(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Serves the runtime table of the config file as the native configuration.
pub(crate) struct StaticConfig {
    runtime: RuntimeConfig,
}

impl StaticConfig {
    pub(crate) fn new(runtime: RuntimeConfig) -> Self {
        Self { runtime }
    }
}

impl ConfigProvider for StaticConfig {
    fn runtime_config(&self) -> Result<RuntimeConfig> {
        Ok(self.runtime.clone())
    }
}
