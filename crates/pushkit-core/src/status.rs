use serde::{Deserialize, Serialize};

/// Status values emitted by a sync, in pipeline order where applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    UpToDate,
    UpdateInstalled,
    UpdateIgnored,
    UnknownError,
    SyncInProgress,
    CheckingForUpdate,
    AwaitingUserAction,
    DownloadingPackage,
    InstallingUpdate,
}

impl SyncStatus {
    /// Numeric code shared with host applications.
    pub fn code(self) -> u8 {
        match self {
            Self::UpToDate => 0,
            Self::UpdateInstalled => 1,
            Self::UpdateIgnored => 2,
            Self::UnknownError => 3,
            Self::SyncInProgress => 4,
            Self::CheckingForUpdate => 5,
            Self::AwaitingUserAction => 6,
            Self::DownloadingPackage => 7,
            Self::InstallingUpdate => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpToDate => "UP_TO_DATE",
            Self::UpdateInstalled => "UPDATE_INSTALLED",
            Self::UpdateIgnored => "UPDATE_IGNORED",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::SyncInProgress => "SYNC_IN_PROGRESS",
            Self::CheckingForUpdate => "CHECKING_FOR_UPDATE",
            Self::AwaitingUserAction => "AWAITING_USER_ACTION",
            Self::DownloadingPackage => "DOWNLOADING_PACKAGE",
            Self::InstallingUpdate => "INSTALLING_UPDATE",
        }
    }

    /// Whether a sync can resolve with this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::UpToDate
                | Self::UpdateInstalled
                | Self::UpdateIgnored
                | Self::UnknownError
                | Self::SyncInProgress
        )
    }
}

/// How a host drives syncs from its lifecycle events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckFrequency {
    #[default]
    OnAppStart,
    OnAppResume,
    Manual,
}
