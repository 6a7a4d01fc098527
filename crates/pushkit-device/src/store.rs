use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use pushkit_core::{
    Clock, DeploymentStatus, DownloadProgress, InstallMode, InstallPipeline, LifecycleBridge,
    LocalRelease, ReleaseStore, RemoteOffer, RollbackInfo, StatusReport, SystemClock, UpdateState,
};
use pushkit_security::is_sha256_hex;
use tracing::{debug, info, warn};

use crate::download::fetch_bundle;
use crate::layout::{validate_package_hash, DeviceLayout};
use crate::state::{
    read_json, read_toml, remove_file_if_exists, write_json, write_toml, CurrentState,
    FailedInstalls, LastReport,
};

/// What a cold start did before the app code ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Release that never confirmed its previous launch and was rolled back.
    pub rolled_back: Option<LocalRelease>,
    /// Pending release that took effect on this start.
    pub applied: Option<LocalRelease>,
    pub running: Option<LocalRelease>,
}

/// Native-layer emulation backed by a [`DeviceLayout`] directory.
///
/// One store per device root; operations are serialized by an in-process
/// lock and every state file is replaced atomically.
pub struct FsDeviceStore {
    layout: DeviceLayout,
    app_version: String,
    clock: Arc<dyn Clock>,
    state_lock: Mutex<()>,
}

impl FsDeviceStore {
    pub fn open(root: impl Into<PathBuf>, app_version: impl Into<String>) -> Result<Self> {
        let layout = DeviceLayout::new(root);
        layout.ensure_base_dirs()?;
        Ok(Self {
            layout,
            app_version: app_version.into(),
            clock: Arc::new(SystemClock),
            state_lock: Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn layout(&self) -> &DeviceLayout {
        &self.layout
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn current_state(&self) -> Result<CurrentState> {
        let _guard = self.lock();
        self.load_state()
    }

    /// Cold start: rolls back a release that never confirmed its last launch,
    /// then applies any pending release.
    pub fn launch(&self) -> Result<LaunchOutcome> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        let mut outcome = LaunchOutcome::default();

        if self.installed_by_other_binary(&state) {
            info!(
                installed_by = state.binary_version.as_deref().unwrap_or_default(),
                app_version = %self.app_version,
                "app binary changed; clearing releases installed by the previous binary"
            );
            self.clear_releases(&mut state)?;
        }

        if state.awaiting_confirmation {
            if let Some(failed_hash) = state.running.take() {
                let release = self.read_release(&failed_hash)?;
                let label = release
                    .as_ref()
                    .map(|release| release.label.clone())
                    .unwrap_or_default();
                warn!(
                    label = %label,
                    package_hash = %failed_hash,
                    "release did not confirm its launch; rolling back"
                );
                self.mark_failed(&failed_hash)?;
                self.queue_report(StatusReport::release(
                    &label,
                    &failed_hash,
                    DeploymentStatus::Failed,
                ))?;
                state.running = state.previous.take();
                outcome.rolled_back = release;
            }
            state.awaiting_confirmation = false;
        }

        state.first_run = None;
        state.restart_allowed = true;
        state.queued_restart = None;
        if let Some(hash) = apply_pending(&mut state) {
            outcome.applied = self.read_release(&hash)?;
        }

        self.save_state(&state)?;
        outcome.running = match &state.running {
            Some(hash) => self.read_release(hash)?,
            None => None,
        };
        info!(
            running = outcome
                .running
                .as_ref()
                .map_or("binary", |release| release.label.as_str()),
            "app launched"
        );
        Ok(outcome)
    }

    /// App returned to the foreground after `background_seconds` in the
    /// background. Returns whether a pending release was applied.
    pub fn on_resume(&self, background_seconds: u32) -> Result<bool> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        let applies_on_resume = matches!(
            state.pending_mode,
            Some(InstallMode::OnNextResume | InstallMode::OnNextSuspend)
        );
        if !applies_on_resume || background_seconds < state.minimum_background_duration {
            return Ok(false);
        }

        let restarted = restart_locked(&mut state, true);
        self.save_state(&state)?;
        Ok(restarted)
    }

    /// App moved to the background. Applies an `on-next-suspend` release that
    /// has no minimum background duration.
    pub fn on_suspend(&self) -> Result<bool> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        if state.pending_mode != Some(InstallMode::OnNextSuspend)
            || state.minimum_background_duration > 0
        {
            return Ok(false);
        }

        let restarted = restart_locked(&mut state, true);
        self.save_state(&state)?;
        Ok(restarted)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.state_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn load_state(&self) -> Result<CurrentState> {
        Ok(read_toml(&self.layout.current_state_path())?.unwrap_or_default())
    }

    fn save_state(&self, state: &CurrentState) -> Result<()> {
        write_toml(&self.layout.current_state_path(), state)
    }

    fn installed_by_other_binary(&self, state: &CurrentState) -> bool {
        (state.running.is_some() || state.pending.is_some())
            && state
                .binary_version
                .as_deref()
                .is_some_and(|version| version != self.app_version)
    }

    /// Drops every installed release and its metadata. Restart flags are
    /// left alone.
    fn clear_releases(&self, state: &mut CurrentState) -> Result<()> {
        state.running = None;
        state.previous = None;
        state.pending = None;
        state.pending_mode = None;
        state.minimum_background_duration = 0;
        state.awaiting_confirmation = false;
        state.first_run = None;
        state.binary_version = None;
        self.save_state(state)?;

        let releases_dir = self.layout.releases_dir();
        if releases_dir.exists() {
            fs::remove_dir_all(&releases_dir)
                .with_context(|| format!("failed to remove {}", releases_dir.display()))?;
        }
        fs::create_dir_all(&releases_dir)
            .with_context(|| format!("failed to create {}", releases_dir.display()))
    }

    fn read_release(&self, package_hash: &str) -> Result<Option<LocalRelease>> {
        validate_package_hash(package_hash)?;
        read_toml(&self.layout.release_metadata_path(package_hash))
    }

    fn failed_installs(&self) -> Result<FailedInstalls> {
        Ok(read_toml(&self.layout.failed_path())?.unwrap_or_default())
    }

    fn mark_failed(&self, package_hash: &str) -> Result<()> {
        let mut failed = self.failed_installs()?;
        if !failed.hashes.iter().any(|hash| hash == package_hash) {
            failed.hashes.push(package_hash.to_string());
            write_toml(&self.layout.failed_path(), &failed)?;
        }
        Ok(())
    }

    fn report_queue(&self) -> Result<Vec<StatusReport>> {
        Ok(read_json(&self.layout.pending_report_path())?.unwrap_or_default())
    }

    fn queue_report(&self, report: StatusReport) -> Result<()> {
        let mut queue = self.report_queue()?;
        debug!(report = ?report, "queued status report");
        queue.push(report);
        write_json(&self.layout.pending_report_path(), &queue)
    }

    fn queue_binary_report_if_new(&self) -> Result<()> {
        let last: Option<LastReport> = read_toml(&self.layout.last_report_path())?;
        if last.is_some_and(|last| last.identity == self.app_version) {
            return Ok(());
        }
        if !self.report_queue()?.is_empty() {
            return Ok(());
        }
        self.queue_report(StatusReport::binary(&self.app_version))
    }
}

/// Moves the pending release into place. Returns its hash when one was
/// applied.
fn apply_pending(state: &mut CurrentState) -> Option<String> {
    let hash = state.pending.take()?;
    state.pending_mode = None;
    state.minimum_background_duration = 0;
    if state.running.as_deref() != Some(hash.as_str()) {
        state.previous = state.running.take();
    }
    state.running = Some(hash.clone());
    state.awaiting_confirmation = true;
    state.first_run = Some(hash.clone());
    info!(package_hash = %hash, "applied pending release");
    Some(hash)
}

fn restart_locked(state: &mut CurrentState, only_if_pending: bool) -> bool {
    if only_if_pending && state.pending.is_none() {
        debug!("restart skipped; no pending release");
        return false;
    }
    if !state.restart_allowed {
        let queued = state.queued_restart.unwrap_or(true) && only_if_pending;
        state.queued_restart = Some(queued);
        info!("restart queued until restarts are allowed");
        return false;
    }

    state.queued_restart = None;
    apply_pending(state);
    info!("app restarted");
    true
}

impl ReleaseStore for FsDeviceStore {
    fn installed(&self, which: UpdateState) -> Result<Option<LocalRelease>> {
        let _guard = self.lock();
        let state = self.load_state()?;
        if self.installed_by_other_binary(&state) {
            debug!("installed releases belong to another app binary");
            return Ok(None);
        }
        let (hash, is_pending) = match which {
            UpdateState::Running => (state.running.clone(), false),
            UpdateState::Pending => (state.pending.clone(), true),
            UpdateState::Latest => match &state.pending {
                Some(pending) => (Some(pending.clone()), true),
                None => (state.running.clone(), false),
            },
        };
        let Some(hash) = hash else {
            return Ok(None);
        };

        let mut release = self
            .read_release(&hash)?
            .with_context(|| format!("release metadata is missing for package {hash}"))?;
        release.is_pending = is_pending;
        release.is_first_run = state.first_run.as_deref() == Some(hash.as_str());
        release.failed_install = self.failed_installs()?.hashes.contains(&hash);
        Ok(Some(release))
    }

    fn is_failed_install(&self, package_hash: &str) -> Result<bool> {
        let _guard = self.lock();
        Ok(self
            .failed_installs()?
            .hashes
            .iter()
            .any(|hash| hash == package_hash))
    }

    fn is_first_run(&self, package_hash: &str) -> Result<bool> {
        let _guard = self.lock();
        Ok(self.load_state()?.first_run.as_deref() == Some(package_hash))
    }
}

impl InstallPipeline for FsDeviceStore {
    fn download(
        &self,
        offer: &RemoteOffer,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<LocalRelease> {
        let hash = offer.package_hash.as_str();
        validate_package_hash(hash)?;
        let release_dir = self.layout.release_dir(hash);
        fs::create_dir_all(&release_dir)
            .with_context(|| format!("failed to create {}", release_dir.display()))?;

        let partial_path = self.layout.release_partial_bundle_path(hash);
        let fetched = match fetch_bundle(&offer.download_url, &partial_path, on_progress) {
            Ok(fetched) => fetched,
            Err(err) => {
                let _ = remove_file_if_exists(&partial_path);
                return Err(err)
                    .with_context(|| format!("failed to download release {}", offer.label));
            }
        };

        if is_sha256_hex(hash) && !fetched.sha256.eq_ignore_ascii_case(hash) {
            let _ = remove_file_if_exists(&partial_path);
            anyhow::bail!(
                "sha256 mismatch for release {}: expected {hash}, got {}",
                offer.label,
                fetched.sha256
            );
        }

        let bundle_path = self.layout.release_bundle_path(hash);
        fs::rename(&partial_path, &bundle_path).with_context(|| {
            format!(
                "failed to move downloaded bundle into place: {}",
                bundle_path.display()
            )
        })?;

        let app_version = if offer.app_version.is_empty() {
            self.app_version.clone()
        } else {
            offer.app_version.clone()
        };
        let release = LocalRelease {
            label: offer.label.clone(),
            app_version,
            package_hash: offer.package_hash.clone(),
            description: offer.description.clone(),
            deployment_key: offer.deployment_key.clone(),
            is_mandatory: offer.is_mandatory,
            is_pending: false,
            is_first_run: false,
            failed_install: false,
            is_debug_only: false,
        };
        write_toml(&self.layout.release_metadata_path(hash), &release)?;
        info!(
            label = %release.label,
            bytes = fetched.bytes,
            "downloaded release"
        );
        Ok(release)
    }

    fn install(
        &self,
        release: &LocalRelease,
        mode: InstallMode,
        minimum_background_duration: u32,
        on_installed: &mut dyn FnMut(),
    ) -> Result<()> {
        let hash = release.package_hash.as_str();
        validate_package_hash(hash)?;
        let bundle_path = self.layout.release_bundle_path(hash);
        if !bundle_path.is_file() {
            anyhow::bail!(
                "release {} has not been downloaded: {}",
                release.label,
                bundle_path.display()
            );
        }

        {
            let _guard = self.lock();
            let mut state = self.load_state()?;
            state.pending = Some(hash.to_string());
            state.pending_mode = Some(mode);
            state.minimum_background_duration = minimum_background_duration;
            state.binary_version = Some(self.app_version.clone());
            self.save_state(&state)?;
        }
        info!(
            label = %release.label,
            install_mode = mode.as_str(),
            "release installed"
        );

        on_installed();

        if mode == InstallMode::Immediate {
            self.restart(false)?;
        }
        Ok(())
    }
}

impl LifecycleBridge for FsDeviceStore {
    fn notify_ready(&self) -> Result<()> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        if !state.awaiting_confirmation {
            if state.running.is_none() {
                self.queue_binary_report_if_new()?;
            }
            return Ok(());
        }

        state.awaiting_confirmation = false;
        self.save_state(&state)?;
        if let Some(hash) = &state.running {
            let label = self
                .read_release(hash)?
                .map(|release| release.label)
                .unwrap_or_default();
            info!(label = %label, "release confirmed");
            self.queue_report(StatusReport::release(
                &label,
                hash,
                DeploymentStatus::Succeeded,
            ))?;
        }
        Ok(())
    }

    fn pending_report(&self) -> Result<Option<StatusReport>> {
        let _guard = self.lock();
        if let Some(report) = self.report_queue()?.into_iter().next() {
            return Ok(Some(report));
        }
        read_json(&self.layout.retry_report_path())
    }

    fn record_report(&self, report: &StatusReport) -> Result<()> {
        let _guard = self.lock();
        let mut queue = self.report_queue()?;
        if let Some(position) = queue.iter().position(|queued| queued == report) {
            queue.remove(position);
            if queue.is_empty() {
                remove_file_if_exists(&self.layout.pending_report_path())?;
            } else {
                write_json(&self.layout.pending_report_path(), &queue)?;
            }
        }

        let retry: Option<StatusReport> = read_json(&self.layout.retry_report_path())?;
        if retry.as_ref() == Some(report) {
            remove_file_if_exists(&self.layout.retry_report_path())?;
        }

        let identity = match report {
            StatusReport::Release {
                status: DeploymentStatus::Failed,
                ..
            } => return Ok(()),
            StatusReport::Release { package, .. } => package.label.clone(),
            StatusReport::Binary { app_version, .. } => app_version.clone(),
        };
        write_toml(&self.layout.last_report_path(), &LastReport { identity })
    }

    fn persist_report_for_retry(&self, report: &StatusReport) -> Result<()> {
        let _guard = self.lock();
        write_json(&self.layout.retry_report_path(), report)
    }

    fn latest_rollback_info(&self) -> Result<Option<RollbackInfo>> {
        let _guard = self.lock();
        read_toml(&self.layout.rollback_path())
    }

    fn set_latest_rollback_info(&self, package_hash: &str) -> Result<()> {
        let _guard = self.lock();
        let previous: Option<RollbackInfo> = read_toml(&self.layout.rollback_path())?;
        let count = match previous {
            Some(info) if info.package_hash == package_hash => info.count.saturating_add(1),
            _ => 1,
        };
        write_toml(
            &self.layout.rollback_path(),
            &RollbackInfo {
                package_hash: package_hash.to_string(),
                time: self.clock.now_unix_millis(),
                count,
            },
        )
    }

    fn restart(&self, only_if_pending: bool) -> Result<()> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        restart_locked(&mut state, only_if_pending);
        self.save_state(&state)
    }

    fn clear_installed(&self) -> Result<()> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        self.clear_releases(&mut state)?;
        info!("cleared installed releases");
        Ok(())
    }

    fn allow_restart(&self) -> Result<()> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        state.restart_allowed = true;
        if let Some(only_if_pending) = state.queued_restart.take() {
            restart_locked(&mut state, only_if_pending);
        }
        self.save_state(&state)
    }

    fn disallow_restart(&self) -> Result<()> {
        let _guard = self.lock();
        let mut state = self.load_state()?;
        state.restart_allowed = false;
        self.save_state(&state)
    }
}
