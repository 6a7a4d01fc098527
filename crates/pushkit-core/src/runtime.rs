use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            _ => Err(anyhow!("invalid platform: {value}; expected ios or android")),
        }
    }

    /// iOS sends the binary's embedded hash with update checks so the source
    /// never offers content the binary already ships. Android omits it
    /// because it cannot apply diffs against the binary.
    pub fn forwards_binary_hash(self) -> bool {
        matches!(self, Self::Ios)
    }
}

/// Configuration reported by the native runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub app_version: String,
    pub client_unique_id: String,
    #[serde(default)]
    pub package_hash: Option<String>,
    #[serde(default)]
    pub ignore_app_version: bool,
    pub platform: Platform,
}
