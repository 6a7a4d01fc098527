use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// A release installed or pending on the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalRelease {
    pub label: String,
    pub app_version: String,
    pub package_hash: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deployment_key: String,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_first_run: bool,
    #[serde(default)]
    pub failed_install: bool,
    #[serde(default)]
    pub is_debug_only: bool,
}

/// A release offered by an update check. Built per check, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOffer {
    pub label: String,
    pub app_version: String,
    pub download_url: String,
    pub is_mandatory: bool,
    pub package_hash: String,
    pub package_size: u64,
    pub description: String,
    pub deployment_key: String,
    pub failed_install: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateState {
    Running,
    Pending,
    Latest,
}

impl UpdateState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Latest => "latest",
        }
    }
}

/// When an installed release takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMode {
    Immediate,
    OnNextRestart,
    OnNextResume,
    OnNextSuspend,
}

impl InstallMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::OnNextRestart => "on-next-restart",
            Self::OnNextResume => "on-next-resume",
            Self::OnNextSuspend => "on-next-suspend",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "immediate" => Ok(Self::Immediate),
            "on-next-restart" => Ok(Self::OnNextRestart),
            "on-next-resume" => Ok(Self::OnNextResume),
            "on-next-suspend" => Ok(Self::OnNextSuspend),
            _ => Err(anyhow!(
                "invalid install mode: {value}; expected immediate, on-next-restart, on-next-resume or on-next-suspend"
            )),
        }
    }
}

/// Most recent rollback of a release, keyed by its package hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RollbackInfo {
    pub package_hash: String,
    /// Unix time of the rollback in milliseconds.
    pub time: u64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received_bytes: u64,
    pub total_bytes: Option<u64>,
}
