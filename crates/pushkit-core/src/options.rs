use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::release::{InstallMode, RemoteOffer};

/// Caller configuration for a single sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub ignore_failed_updates: bool,
    pub rollback_retry: Option<RollbackRetryOptions>,
    pub install_mode: InstallMode,
    pub mandatory_install_mode: InstallMode,
    /// Seconds the app must spend in the background before a resume/suspend
    /// install is applied.
    pub minimum_background_duration: u32,
    pub update_dialog: Option<UpdateDialogOptions>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            ignore_failed_updates: true,
            rollback_retry: None,
            install_mode: InstallMode::OnNextRestart,
            mandatory_install_mode: InstallMode::Immediate,
            minimum_background_duration: 0,
            update_dialog: None,
        }
    }
}

impl SyncOptions {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        toml::from_str(input).context("failed to parse sync options")
    }

    pub fn install_mode_for(&self, is_mandatory: bool) -> InstallMode {
        if is_mandatory {
            self.mandatory_install_mode
        } else {
            self.install_mode
        }
    }
}

/// Retry policy for releases that were previously rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackRetryOptions {
    pub delay_in_hours: f64,
    pub max_retry_attempts: i64,
}

impl Default for RollbackRetryOptions {
    fn default() -> Self {
        Self {
            delay_in_hours: 24.0,
            max_retry_attempts: 1,
        }
    }
}

impl RollbackRetryOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.delay_in_hours.is_finite() || self.delay_in_hours < 0.0 {
            anyhow::bail!(
                "rollback retry delay_in_hours must be a non-negative number, got {}",
                self.delay_in_hours
            );
        }
        if self.max_retry_attempts < 1 {
            anyhow::bail!(
                "rollback retry max_retry_attempts cannot be less than 1, got {}",
                self.max_retry_attempts
            );
        }
        Ok(())
    }
}

/// Texts of the confirmation dialog shown before an update is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateDialogOptions {
    pub append_release_description: bool,
    pub description_prefix: String,
    pub mandatory_continue_button_label: String,
    pub mandatory_update_message: String,
    pub optional_ignore_button_label: String,
    pub optional_install_button_label: String,
    pub optional_update_message: String,
    pub title: String,
}

impl Default for UpdateDialogOptions {
    fn default() -> Self {
        Self {
            append_release_description: false,
            description_prefix: " Description: ".to_string(),
            mandatory_continue_button_label: "Continue".to_string(),
            mandatory_update_message: "An update is available that must be installed."
                .to_string(),
            optional_ignore_button_label: "Ignore".to_string(),
            optional_install_button_label: "Install".to_string(),
            optional_update_message: "An update is available. Would you like to install it?"
                .to_string(),
            title: "Update available".to_string(),
        }
    }
}

impl UpdateDialogOptions {
    pub fn prompt_for(&self, offer: &RemoteOffer) -> DialogPrompt {
        let mut buttons = Vec::new();
        let mut message = if offer.is_mandatory {
            self.mandatory_update_message.clone()
        } else {
            buttons.push(DialogButton {
                label: self.optional_ignore_button_label.clone(),
                choice: DialogChoice::Ignore,
            });
            self.optional_update_message.clone()
        };

        let install_label = if offer.is_mandatory {
            &self.mandatory_continue_button_label
        } else {
            &self.optional_install_button_label
        };
        // Install stays the last (right-most) button.
        buttons.push(DialogButton {
            label: install_label.clone(),
            choice: DialogChoice::Install,
        });

        if self.append_release_description && !offer.description.is_empty() {
            message.push_str(&format!("{} {}", self.description_prefix, offer.description));
        }

        DialogPrompt {
            title: self.title.clone(),
            message,
            buttons,
            is_mandatory: offer.is_mandatory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogChoice {
    Install,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogButton {
    pub label: String,
    pub choice: DialogChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogPrompt {
    pub title: String,
    pub message: String,
    pub buttons: Vec<DialogButton>,
    pub is_mandatory: bool,
}
