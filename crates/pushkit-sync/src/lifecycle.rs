use std::sync::Arc;

use pushkit_core::{CheckFrequency, SyncOptions, SyncStatus};
use tracing::debug;

use crate::client::UpdateClient;
use crate::coordinator::SyncCallbacks;
use crate::error::SyncError;

/// Drives an [`UpdateClient`] from a host application's lifecycle events.
pub struct AppLifecycle {
    client: Arc<UpdateClient>,
    options: SyncOptions,
    frequency: CheckFrequency,
}

impl AppLifecycle {
    pub fn new(client: Arc<UpdateClient>, options: SyncOptions, frequency: CheckFrequency) -> Self {
        Self {
            client,
            options,
            frequency,
        }
    }

    pub fn client(&self) -> &Arc<UpdateClient> {
        &self.client
    }

    /// Called once the host UI is up. Returns the sync outcome, or `None`
    /// when syncs are manual and only the ready notification was sent.
    pub fn on_app_ready(
        &self,
        callbacks: SyncCallbacks<'_>,
    ) -> Result<Option<SyncStatus>, SyncError> {
        if self.frequency == CheckFrequency::Manual {
            self.client.notify_ready()?;
            return Ok(None);
        }
        self.client.sync(&self.options, callbacks).map(Some)
    }

    /// Called each time the app becomes active again.
    pub fn on_app_foreground(
        &self,
        callbacks: SyncCallbacks<'_>,
    ) -> Result<Option<SyncStatus>, SyncError> {
        self.client.on_app_foreground();
        if self.frequency != CheckFrequency::OnAppResume {
            debug!("foreground sync skipped for this check frequency");
            return Ok(None);
        }

        let callbacks = SyncCallbacks {
            on_version_mismatch: None,
            ..callbacks
        };
        self.client.sync(&self.options, callbacks).map(Some)
    }
}
