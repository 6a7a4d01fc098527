use serde::{Deserialize, Serialize};

/// Query sent to a release source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateCheckRequest {
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_hash: Option<String>,
    pub is_companion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub client_unique_id: String,
}

/// Response envelope of the legacy update oracle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateCheckResponse {
    #[serde(default)]
    pub update_info: Option<RawUpdateInfo>,
}

/// Single update descriptor as returned by the legacy oracle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawUpdateInfo {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub package_hash: Option<String>,
    #[serde(default)]
    pub package_size: Option<u64>,
    #[serde(default)]
    pub target_binary_range: Option<String>,
    #[serde(default)]
    pub update_app_version: bool,
    #[serde(default)]
    pub should_run_binary_version: bool,
}
