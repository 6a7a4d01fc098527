mod bridge;
mod check;
mod history;
mod label;
mod options;
mod release;
mod report;
mod runtime;
mod status;

pub use bridge::{
    Clock, ConfigProvider, InstallPipeline, LifecycleBridge, ReleaseHistoryFetcher, ReleaseStore,
    SystemClock, UpdateDialog, UpdateOracle,
};
pub use check::{RawUpdateInfo, UpdateCheckRequest, UpdateCheckResponse};
pub use history::{ReleaseEntry, ReleaseHistory};
pub use label::ReleaseLabel;
pub use options::{
    DialogButton, DialogChoice, DialogPrompt, RollbackRetryOptions, SyncOptions,
    UpdateDialogOptions,
};
pub use release::{
    DownloadProgress, InstallMode, LocalRelease, RemoteOffer, RollbackInfo, UpdateState,
};
pub use report::{DeploymentStatus, ReportedRelease, StatusReport};
pub use runtime::{Platform, RuntimeConfig};
pub use status::{CheckFrequency, SyncStatus};

#[cfg(test)]
mod tests;
