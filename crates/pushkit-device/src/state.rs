use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use pushkit_core::InstallMode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Which releases the emulated runtime runs, keyed by package hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentState {
    pub running: Option<String>,
    pub previous: Option<String>,
    pub pending: Option<String>,
    pub pending_mode: Option<InstallMode>,
    pub minimum_background_duration: u32,
    /// Set when a release is applied; cleared by `notify_ready`. Still set at
    /// the next launch means the release never came up healthy.
    pub awaiting_confirmation: bool,
    pub first_run: Option<String>,
    pub restart_allowed: bool,
    /// `only_if_pending` of a restart requested while restarts were
    /// disallowed.
    pub queued_restart: Option<bool>,
    /// App version of the binary that installed the current releases.
    pub binary_version: Option<String>,
}

impl Default for CurrentState {
    fn default() -> Self {
        Self {
            running: None,
            previous: None,
            pending: None,
            pending_mode: None,
            minimum_background_duration: 0,
            awaiting_confirmation: false,
            first_run: None,
            restart_allowed: true,
            queued_restart: None,
            binary_version: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct FailedInstalls {
    pub(crate) hashes: Vec<String>,
}

/// Identity of the last successfully reported deployment: a release label,
/// or the app version when the binary itself was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastReport {
    pub identity: String,
}

pub(crate) fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let value = toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

pub(crate) fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = toml::to_string(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    write_atomically(path, payload.as_bytes())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let value =
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    write_atomically(path, &payload)
}

pub(crate) fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

fn write_atomically(path: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = Path::new(&tmp_path);
    fs::write(tmp_path, payload)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(tmp_path, path).with_context(|| format!("failed to replace {}", path.display()))
}
