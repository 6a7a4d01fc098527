//! Capabilities the update client consumes from its host: the native
//! runtime, the device's release store, a release source and the install
//! pipeline. Every trait is object safe and `Send + Sync` so a client can be
//! shared across threads behind an `Arc`.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::check::{UpdateCheckRequest, UpdateCheckResponse};
use crate::history::ReleaseHistory;
use crate::options::{DialogChoice, DialogPrompt};
use crate::release::{
    DownloadProgress, InstallMode, LocalRelease, RemoteOffer, RollbackInfo, UpdateState,
};
use crate::report::StatusReport;
use crate::runtime::RuntimeConfig;

pub trait ConfigProvider: Send + Sync {
    fn runtime_config(&self) -> Result<RuntimeConfig>;
}

pub trait ReleaseStore: Send + Sync {
    fn installed(&self, state: UpdateState) -> Result<Option<LocalRelease>>;
    fn is_failed_install(&self, package_hash: &str) -> Result<bool>;
    fn is_first_run(&self, package_hash: &str) -> Result<bool>;
}

/// Fetches the release history scoped to the requesting binary version.
pub trait ReleaseHistoryFetcher: Send + Sync {
    fn fetch_history(&self, request: &UpdateCheckRequest) -> Result<ReleaseHistory>;
}

/// Legacy single-call update check.
pub trait UpdateOracle: Send + Sync {
    fn check(&self, request: &UpdateCheckRequest) -> Result<UpdateCheckResponse>;
}

pub trait InstallPipeline: Send + Sync {
    fn download(
        &self,
        offer: &RemoteOffer,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<LocalRelease>;

    fn install(
        &self,
        release: &LocalRelease,
        mode: InstallMode,
        minimum_background_duration: u32,
        on_installed: &mut dyn FnMut(),
    ) -> Result<()>;
}

/// Native lifecycle hooks and the status report store.
pub trait LifecycleBridge: Send + Sync {
    fn notify_ready(&self) -> Result<()>;
    fn pending_report(&self) -> Result<Option<StatusReport>>;
    fn record_report(&self, report: &StatusReport) -> Result<()>;
    fn persist_report_for_retry(&self, report: &StatusReport) -> Result<()>;
    fn latest_rollback_info(&self) -> Result<Option<RollbackInfo>>;
    fn set_latest_rollback_info(&self, package_hash: &str) -> Result<()>;
    fn restart(&self, only_if_pending: bool) -> Result<()>;
    fn clear_installed(&self) -> Result<()>;
    fn allow_restart(&self) -> Result<()>;
    fn disallow_restart(&self) -> Result<()>;
}

/// Presents the update confirmation and blocks until the user picks a button.
pub trait UpdateDialog: Send + Sync {
    fn present(&self, prompt: &DialogPrompt) -> Result<DialogChoice>;
}

pub trait Clock: Send + Sync {
    fn now_unix_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}
