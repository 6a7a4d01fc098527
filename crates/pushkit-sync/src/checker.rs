use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use pushkit_core::{
    ConfigProvider, LifecycleBridge, LocalRelease, RawUpdateInfo, ReleaseLabel, ReleaseStore,
    RemoteOffer, RuntimeConfig, UpdateCheckRequest, UpdateState,
};
use pushkit_resolver::{resolve_release, ResolveQuery};
use tracing::{debug, info, warn};

use crate::source::ReleaseSource;

/// Asks the configured release source whether the device should update.
pub struct UpdateChecker {
    config: Arc<dyn ConfigProvider>,
    cached_config: Mutex<Option<RuntimeConfig>>,
    store: Arc<dyn ReleaseStore>,
    source: ReleaseSource,
    lifecycle: Arc<dyn LifecycleBridge>,
}

/// A descriptor mapped into an offer, before the "already installed" filters.
#[derive(Debug)]
struct MappedUpdate {
    offer: RemoteOffer,
    update_app_version: bool,
}

impl UpdateChecker {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        store: Arc<dyn ReleaseStore>,
        source: ReleaseSource,
        lifecycle: Arc<dyn LifecycleBridge>,
    ) -> Self {
        Self {
            config,
            cached_config: Mutex::new(None),
            store,
            source,
            lifecycle,
        }
    }

    /// Runtime configuration, fetched from the provider on first use only.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let mut cached = self
            .cached_config
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = cached.as_ref() {
            return Ok(config.clone());
        }

        let config = self
            .config
            .runtime_config()
            .context("failed to read runtime configuration")?;
        *cached = Some(config.clone());
        Ok(config)
    }

    /// Returns the release to install, or `None` when the device is up to
    /// date. Source failures are logged and reported as "no update".
    pub fn check_for_update(
        &self,
        on_version_mismatch: Option<&dyn Fn(&RemoteOffer)>,
    ) -> Result<Option<RemoteOffer>> {
        let config = self.runtime_config()?;
        let local = self
            .store
            .installed(UpdateState::Latest)
            .context("failed to read the installed release")?;
        let request = build_check_request(&config, local.as_ref());

        let mapped = match self.query_source(&request) {
            Ok(mapped) => mapped,
            Err(err) => {
                warn!(
                    source = self.source.kind(),
                    error = %format!("{err:#}"),
                    "update check failed; treating as no update"
                );
                None
            }
        };

        let Some(MappedUpdate {
            mut offer,
            update_app_version,
        }) = mapped
        else {
            return Ok(None);
        };

        if update_app_version {
            info!(
                label = %offer.label,
                "an update is available but it is not targeting the binary version of this app"
            );
            if let Some(callback) = on_version_mismatch {
                callback(&offer);
            }
            return Ok(None);
        }

        if local
            .as_ref()
            .is_some_and(|release| release.package_hash == offer.package_hash)
        {
            debug!(package_hash = %offer.package_hash, "offer matches the installed release");
            return Ok(None);
        }

        let on_binary = local.as_ref().map_or(true, |release| release.is_debug_only);
        if !config.platform.forwards_binary_hash()
            && on_binary
            && config.package_hash.as_deref() == Some(offer.package_hash.as_str())
        {
            debug!(
                package_hash = %offer.package_hash,
                "offer matches the content embedded in the binary"
            );
            return Ok(None);
        }

        offer.failed_install = self
            .store
            .is_failed_install(&offer.package_hash)
            .context("failed to read failed-install state")?;
        Ok(Some(offer))
    }

    fn query_source(&self, request: &UpdateCheckRequest) -> Result<Option<MappedUpdate>> {
        match &self.source {
            ReleaseSource::Oracle(oracle) => {
                let response = oracle.check(request)?;
                Ok(response.update_info.and_then(map_update_info))
            }
            ReleaseSource::History(fetcher) => {
                let history = fetcher.fetch_history(request)?;
                let runtime_label = request
                    .label
                    .as_deref()
                    .filter(|label| !label.is_empty())
                    .map(ReleaseLabel::parse)
                    .transpose()
                    .context("running release has an invalid label")?;
                let client_id = Some(request.client_unique_id.as_str()).filter(|id| !id.is_empty());

                let resolution = resolve_release(
                    &history,
                    &ResolveQuery {
                        runtime_label: runtime_label.as_ref(),
                        running_hash: request.package_hash.as_deref(),
                        client_unique_id: client_id,
                    },
                );

                if resolution.rollback_to_binary {
                    self.rollback_to_binary()?;
                }

                let Some(resolved) = resolution.offer else {
                    return Ok(None);
                };

                // A history is scoped to the binary that asked for it, so the
                // offer always targets the running binary version.
                let info = RawUpdateInfo {
                    download_url: Some(resolved.entry.download_url),
                    description: resolved.entry.description,
                    is_available: resolved.entry.enabled,
                    is_mandatory: resolution.is_mandatory,
                    label: Some(resolved.label.to_string()),
                    package_hash: Some(resolved.entry.package_hash),
                    target_binary_range: Some(request.app_version.clone()),
                    ..RawUpdateInfo::default()
                };
                Ok(map_update_info(info))
            }
        }
    }

    fn rollback_to_binary(&self) -> Result<()> {
        info!("running release was pulled from the release history; rolling back to the binary");
        self.lifecycle
            .clear_installed()
            .context("failed to clear installed releases")?;
        self.lifecycle
            .allow_restart()
            .context("failed to allow restart")?;
        self.lifecycle
            .restart(false)
            .context("failed to restart onto the binary")
    }
}

fn build_check_request(config: &RuntimeConfig, local: Option<&LocalRelease>) -> UpdateCheckRequest {
    match local {
        Some(release) => UpdateCheckRequest {
            app_version: release.app_version.clone(),
            package_hash: Some(release.package_hash.clone()),
            is_companion: config.ignore_app_version,
            label: Some(release.label.clone()),
            client_unique_id: config.client_unique_id.clone(),
        },
        None => UpdateCheckRequest {
            app_version: config.app_version.clone(),
            package_hash: config
                .package_hash
                .clone()
                .filter(|_| config.platform.forwards_binary_hash()),
            is_companion: config.ignore_app_version,
            label: None,
            client_unique_id: config.client_unique_id.clone(),
        },
    }
}

fn map_update_info(info: RawUpdateInfo) -> Option<MappedUpdate> {
    let download_url = match info.download_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => {
            debug!("update descriptor has no download_url");
            return None;
        }
    };
    if !info.is_available || info.is_disabled {
        return None;
    }
    let package_hash = match info.package_hash {
        Some(hash) if !hash.trim().is_empty() => hash,
        _ => {
            warn!(download_url = %download_url, "update descriptor has no package_hash");
            return None;
        }
    };

    Some(MappedUpdate {
        offer: RemoteOffer {
            label: info.label.unwrap_or_default(),
            app_version: info.target_binary_range.unwrap_or_default(),
            download_url,
            is_mandatory: info.is_mandatory,
            package_hash,
            package_size: info.package_size.unwrap_or(0),
            description: info.description.unwrap_or_default(),
            deployment_key: String::new(),
            failed_install: false,
        },
        update_app_version: info.update_app_version,
    })
}
