use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout of an emulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    root: PathBuf,
}

impl DeviceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.root.join("releases")
    }

    pub fn release_dir(&self, package_hash: &str) -> PathBuf {
        self.releases_dir().join(package_hash)
    }

    pub fn release_metadata_path(&self, package_hash: &str) -> PathBuf {
        self.release_dir(package_hash).join("release.toml")
    }

    pub fn release_bundle_path(&self, package_hash: &str) -> PathBuf {
        self.release_dir(package_hash).join("bundle")
    }

    pub fn release_partial_bundle_path(&self, package_hash: &str) -> PathBuf {
        self.release_dir(package_hash).join("bundle.part")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn current_state_path(&self) -> PathBuf {
        self.state_dir().join("current.toml")
    }

    pub fn failed_path(&self) -> PathBuf {
        self.state_dir().join("failed.toml")
    }

    pub fn rollback_path(&self) -> PathBuf {
        self.state_dir().join("rollback.toml")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.state_dir().join("reports")
    }

    pub fn pending_report_path(&self) -> PathBuf {
        self.reports_dir().join("pending.json")
    }

    pub fn retry_report_path(&self) -> PathBuf {
        self.reports_dir().join("retry.json")
    }

    pub fn last_report_path(&self) -> PathBuf {
        self.reports_dir().join("last.toml")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.releases_dir(), self.state_dir(), self.reports_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Package hashes name release directories, so they must be a single plain
/// path segment.
pub(crate) fn validate_package_hash(package_hash: &str) -> Result<()> {
    if package_hash.is_empty() || package_hash.len() > 128 {
        anyhow::bail!("invalid package hash: must be 1-128 characters");
    }
    let is_valid = package_hash
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !is_valid {
        anyhow::bail!("invalid package hash: '{package_hash}'");
    }
    Ok(())
}
