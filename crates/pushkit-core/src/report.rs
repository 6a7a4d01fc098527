use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentStatus {
    #[serde(rename = "DeploymentSucceeded")]
    Succeeded,
    #[serde(rename = "DeploymentFailed")]
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "DeploymentSucceeded",
            Self::Failed => "DeploymentFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportedRelease {
    pub label: String,
    pub package_hash: String,
}

/// Outcome of the previous run, produced by the native layer after a launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StatusReport {
    Release {
        package: ReportedRelease,
        status: DeploymentStatus,
    },
    #[serde(rename_all = "camelCase")]
    Binary {
        app_version: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<DeploymentStatus>,
    },
}

impl StatusReport {
    pub fn release(label: &str, package_hash: &str, status: DeploymentStatus) -> Self {
        Self::Release {
            package: ReportedRelease {
                label: label.to_string(),
                package_hash: package_hash.to_string(),
            },
            status,
        }
    }

    pub fn binary(app_version: &str) -> Self {
        Self::Binary {
            app_version: app_version.to_string(),
            status: None,
        }
    }
}
