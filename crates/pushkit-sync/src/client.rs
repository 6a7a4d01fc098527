use std::sync::Arc;

use anyhow::{Context, Result};
use pushkit_core::{
    Clock, ConfigProvider, InstallPipeline, LifecycleBridge, LocalRelease, ReleaseStore,
    RemoteOffer, RuntimeConfig, StatusReport, SystemClock, UpdateDialog, UpdateState,
};

use crate::checker::UpdateChecker;
use crate::coordinator::{SyncGate, SyncState};
use crate::policy::RollbackRetryPolicy;
use crate::reporter::StatusReporter;
use crate::source::ReleaseSource;

/// Over-the-air update client for one app process.
///
/// Collaborators are supplied once at construction; the client is `Send +
/// Sync` and meant to be shared behind an `Arc` by the host.
pub struct UpdateClient {
    checker: UpdateChecker,
    policy: RollbackRetryPolicy,
    reporter: StatusReporter,
    store: Arc<dyn ReleaseStore>,
    pipeline: Arc<dyn InstallPipeline>,
    lifecycle: Arc<dyn LifecycleBridge>,
    dialog: Option<Arc<dyn UpdateDialog>>,
    sync_gate: SyncGate,
}

impl UpdateClient {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        store: Arc<dyn ReleaseStore>,
        source: ReleaseSource,
        pipeline: Arc<dyn InstallPipeline>,
        lifecycle: Arc<dyn LifecycleBridge>,
    ) -> Self {
        Self {
            checker: UpdateChecker::new(config, store.clone(), source, lifecycle.clone()),
            policy: RollbackRetryPolicy::new(lifecycle.clone(), Arc::new(SystemClock)),
            reporter: StatusReporter::new(lifecycle.clone()),
            store,
            pipeline,
            lifecycle,
            dialog: None,
            sync_gate: SyncGate::default(),
        }
    }

    pub fn with_dialog(mut self, dialog: Arc<dyn UpdateDialog>) -> Self {
        self.dialog = Some(dialog);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.policy = RollbackRetryPolicy::new(self.lifecycle.clone(), clock);
        self
    }

    pub fn check_for_update(
        &self,
        on_version_mismatch: Option<&dyn Fn(&RemoteOffer)>,
    ) -> Result<Option<RemoteOffer>> {
        self.checker.check_for_update(on_version_mismatch)
    }

    /// The newest release on the device, pending or running.
    pub fn current_release(&self) -> Result<Option<LocalRelease>> {
        self.installed(UpdateState::Latest)
    }

    pub fn installed(&self, state: UpdateState) -> Result<Option<LocalRelease>> {
        let Some(mut release) = self
            .store
            .installed(state)
            .with_context(|| format!("failed to read {} release", state.as_str()))?
        else {
            return Ok(None);
        };
        release.failed_install = self.store.is_failed_install(&release.package_hash)?;
        release.is_first_run = self.store.is_first_run(&release.package_hash)?;
        Ok(Some(release))
    }

    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        self.checker.runtime_config()
    }

    /// Tells the native layer this launch is healthy and reports the previous
    /// run's outcome. Runs once per client.
    pub fn notify_ready(&self) -> Result<Option<StatusReport>> {
        self.reporter.notify_ready()
    }

    /// Host hook for the app returning to the foreground.
    pub fn on_app_foreground(&self) {
        self.reporter.handle_foreground();
    }

    pub fn restart(&self, only_if_pending: bool) -> Result<()> {
        self.lifecycle.restart(only_if_pending)
    }

    pub fn clear_installed(&self) -> Result<()> {
        self.lifecycle.clear_installed()
    }

    pub fn allow_restart(&self) -> Result<()> {
        self.lifecycle.allow_restart()
    }

    pub fn disallow_restart(&self) -> Result<()> {
        self.lifecycle.disallow_restart()
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_gate.state()
    }

    pub fn reporter(&self) -> &StatusReporter {
        &self.reporter
    }

    pub(crate) fn checker(&self) -> &UpdateChecker {
        &self.checker
    }

    pub(crate) fn policy(&self) -> &RollbackRetryPolicy {
        &self.policy
    }

    pub(crate) fn store(&self) -> &dyn ReleaseStore {
        self.store.as_ref()
    }

    pub(crate) fn pipeline(&self) -> &dyn InstallPipeline {
        self.pipeline.as_ref()
    }

    pub(crate) fn dialog(&self) -> Option<&dyn UpdateDialog> {
        self.dialog.as_deref()
    }

    pub(crate) fn sync_gate(&self) -> &SyncGate {
        &self.sync_gate
    }
}
