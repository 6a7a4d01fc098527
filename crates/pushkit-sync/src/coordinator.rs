use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use pushkit_core::{
    DialogChoice, DownloadProgress, InstallMode, RemoteOffer, SyncOptions, SyncStatus,
    UpdateState,
};
use tracing::{error, info, warn};

use crate::client::UpdateClient;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Running,
}

/// Process-wide single-flight gate for syncs.
#[derive(Debug, Default)]
pub(crate) struct SyncGate {
    state: Mutex<SyncState>,
}

pub(crate) struct SyncPermit<'a> {
    gate: &'a SyncGate,
}

impl SyncGate {
    pub(crate) fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_begin(&self) -> Option<SyncPermit<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            SyncState::Running => None,
            SyncState::Idle => {
                *state = SyncState::Running;
                Some(SyncPermit { gate: self })
            }
        }
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        *self.gate.state.lock().unwrap_or_else(PoisonError::into_inner) = SyncState::Idle;
    }
}

/// Optional observers of a sync. A panicking observer is logged and the sync
/// carries on.
#[derive(Clone, Copy, Default)]
pub struct SyncCallbacks<'a> {
    pub on_status: Option<&'a dyn Fn(SyncStatus)>,
    pub on_progress: Option<&'a dyn Fn(DownloadProgress)>,
    pub on_version_mismatch: Option<&'a dyn Fn(&RemoteOffer)>,
}

struct StatusEmitter<'a> {
    on_status: Option<&'a dyn Fn(SyncStatus)>,
    install_mode: Cell<Option<InstallMode>>,
    minimum_background_duration: u32,
}

impl StatusEmitter<'_> {
    fn emit(&self, status: SyncStatus) {
        match self.on_status {
            Some(callback) => guarded("status", || callback(status)),
            None => self.log(status),
        }
    }

    fn log(&self, status: SyncStatus) {
        match status {
            SyncStatus::CheckingForUpdate => info!("checking for update"),
            SyncStatus::AwaitingUserAction => info!("awaiting user action"),
            SyncStatus::DownloadingPackage => info!("downloading package"),
            SyncStatus::InstallingUpdate => info!("installing update"),
            SyncStatus::UpToDate => info!("app is up to date"),
            SyncStatus::UpdateIgnored => info!("user cancelled the update"),
            SyncStatus::UpdateInstalled => match self.install_mode.get() {
                Some(InstallMode::OnNextRestart) => {
                    info!("update is installed and will be run on the next app restart")
                }
                Some(InstallMode::OnNextResume) if self.minimum_background_duration > 0 => info!(
                    seconds = self.minimum_background_duration,
                    "update is installed and will be run after the app has been in the background"
                ),
                Some(InstallMode::OnNextResume) => {
                    info!("update is installed and will be run when the app next resumes")
                }
                _ => info!("update is installed"),
            },
            SyncStatus::UnknownError => info!("an unknown error occurred"),
            SyncStatus::SyncInProgress => info!("sync already in progress"),
        }
    }
}

fn guarded(kind: &str, call: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(call)).is_err() {
        error!(callback = kind, "sync callback panicked; continuing");
    }
}

impl UpdateClient {
    /// Checks for, confirms, downloads and installs an update.
    ///
    /// At most one sync runs at a time; a call made while another is running
    /// returns [`SyncStatus::SyncInProgress`] immediately without side
    /// effects. Failures emit [`SyncStatus::UnknownError`] before returning.
    pub fn sync(
        &self,
        options: &SyncOptions,
        callbacks: SyncCallbacks<'_>,
    ) -> Result<SyncStatus, SyncError> {
        let emitter = StatusEmitter {
            on_status: callbacks.on_status,
            install_mode: Cell::new(None),
            minimum_background_duration: options.minimum_background_duration,
        };

        let Some(_permit) = self.sync_gate().try_begin() else {
            emitter.emit(SyncStatus::SyncInProgress);
            return Ok(SyncStatus::SyncInProgress);
        };

        match self.run_sync(options, &callbacks, &emitter) {
            Ok(status) => Ok(status),
            Err(err) => {
                emitter.emit(SyncStatus::UnknownError);
                error!(error = %format!("{err:#}"), "sync failed");
                Err(err)
            }
        }
    }

    fn run_sync(
        &self,
        options: &SyncOptions,
        callbacks: &SyncCallbacks<'_>,
        emitter: &StatusEmitter<'_>,
    ) -> Result<SyncStatus, SyncError> {
        self.notify_ready()?;

        emitter.emit(SyncStatus::CheckingForUpdate);
        let on_version_mismatch = |offer: &RemoteOffer| {
            if let Some(callback) = callbacks.on_version_mismatch {
                guarded("version mismatch", || callback(offer));
            }
        };
        let offer = self.checker().check_for_update(Some(&on_version_mismatch))?;
        let ignored = self.policy().should_ignore(offer.as_ref(), options);

        let offer = match offer {
            Some(offer) if !ignored => offer,
            _ => {
                if ignored {
                    info!("an update is available, but it is being ignored due to having been previously rolled back");
                }
                let current = self.store().installed(UpdateState::Latest)?;
                let status = if current.is_some_and(|release| release.is_pending) {
                    SyncStatus::UpdateInstalled
                } else {
                    SyncStatus::UpToDate
                };
                emitter.emit(status);
                return Ok(status);
            }
        };

        if let Some(dialog_options) = &options.update_dialog {
            let dialog = self.dialog().ok_or(SyncError::DialogUnavailable)?;
            let prompt = dialog_options.prompt_for(&offer);

            emitter.emit(SyncStatus::AwaitingUserAction);
            match dialog.present(&prompt)? {
                DialogChoice::Ignore if !offer.is_mandatory => {
                    emitter.emit(SyncStatus::UpdateIgnored);
                    return Ok(SyncStatus::UpdateIgnored);
                }
                DialogChoice::Ignore => {
                    warn!(label = %offer.label, "mandatory update cannot be ignored; installing");
                }
                DialogChoice::Install => {}
            }
        }

        self.download_and_install(&offer, options, callbacks, emitter)
    }

    fn download_and_install(
        &self,
        offer: &RemoteOffer,
        options: &SyncOptions,
        callbacks: &SyncCallbacks<'_>,
        emitter: &StatusEmitter<'_>,
    ) -> Result<SyncStatus, SyncError> {
        emitter.emit(SyncStatus::DownloadingPackage);
        let mut on_progress = |progress: DownloadProgress| {
            if let Some(callback) = callbacks.on_progress {
                guarded("download progress", || callback(progress));
            }
        };
        let release = self.pipeline().download(offer, &mut on_progress)?;

        let install_mode = options.install_mode_for(release.is_mandatory);
        emitter.install_mode.set(Some(install_mode));

        emitter.emit(SyncStatus::InstallingUpdate);
        let mut on_installed = || emitter.emit(SyncStatus::UpdateInstalled);
        self.pipeline().install(
            &release,
            install_mode,
            options.minimum_background_duration,
            &mut on_installed,
        )?;

        Ok(SyncStatus::UpdateInstalled)
    }
}
