use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use pushkit_core::{
    DownloadProgress, LifecycleBridge, RemoteOffer, StatusReport, SyncOptions, SyncStatus,
    UpdateDialogOptions, UpdateState,
};
use pushkit_device::FsDeviceStore;
use pushkit_sync::{AppLifecycle, SyncCallbacks, UpdateClient};
use tracing::debug;

use crate::completion::write_completions_script;
use crate::config::{CliConfig, StaticConfig};
use crate::dialog::TerminalDialog;
use crate::render::{
    current_output_style, format_offer_lines, format_release_line, TerminalRenderer,
};
use crate::{Cli, Commands};

/// Client and device store wired together for one command.
struct Host {
    config: CliConfig,
    store: Arc<FsDeviceStore>,
    client: Arc<UpdateClient>,
}

impl Host {
    fn open(device_root: &Path, config: CliConfig, options: &SyncOptions) -> Result<Self> {
        let store = Arc::new(FsDeviceStore::open(
            device_root,
            config.runtime.app_version.clone(),
        )?);
        let source = config.source.build(config.runtime.platform)?;
        debug!(
            source = source.kind(),
            device_root = %device_root.display(),
            "opening update client"
        );

        let mut client = UpdateClient::new(
            Arc::new(StaticConfig::new(config.runtime.clone())),
            store.clone(),
            source,
            store.clone(),
            store.clone(),
        );
        if options.update_dialog.is_some() {
            client = client.with_dialog(Arc::new(TerminalDialog));
        }

        Ok(Self {
            config,
            store,
            client: Arc::new(client),
        })
    }

    fn lifecycle(&self, options: SyncOptions) -> AppLifecycle {
        AppLifecycle::new(self.client.clone(), options, self.config.check_frequency)
    }
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::from_style(current_output_style());

    if let Commands::Completions { shell } = cli.command {
        let stdout = io::stdout();
        return write_completions_script(shell, &mut stdout.lock());
    }

    let config = CliConfig::load(&cli.config)?;
    let mut options = config.sync.clone();
    if let Commands::Sync {
        install_mode,
        mandatory_install_mode,
        prompt,
    } = &cli.command
    {
        if let Some(mode) = install_mode {
            options.install_mode = (*mode).into();
        }
        if let Some(mode) = mandatory_install_mode {
            options.mandatory_install_mode = (*mode).into();
        }
        if *prompt && options.update_dialog.is_none() {
            options.update_dialog = Some(UpdateDialogOptions::default());
        }
    }

    let host = Host::open(&cli.device_root, config, &options)?;

    match cli.command {
        Commands::Check => {
            let on_mismatch = |offer: &RemoteOffer| print_version_mismatch(renderer, offer);
            match host.client.check_for_update(Some(&on_mismatch))? {
                Some(offer) => {
                    renderer.print_section("Update available");
                    renderer.print_lines(&format_offer_lines(&offer));
                }
                None => renderer.print_status("ok", "no update available"),
            }
        }
        Commands::Sync { .. } => {
            run_with_callbacks(renderer, |callbacks| host.client.sync(&options, callbacks))?;
        }
        Commands::Status => {
            let running = host.client.installed(UpdateState::Running)?;
            let pending = host.client.installed(UpdateState::Pending)?;
            let state = host.store.current_state()?;

            renderer.print_section("Device");
            let mut lines = vec![
                format!("app_version: {}", host.store.app_version()),
                format_release_line("running", running.as_ref()),
                format_release_line("pending", pending.as_ref()),
            ];
            if let Some(mode) = state.pending_mode {
                lines.push(format!("pending_mode: {}", mode.as_str()));
            }
            lines.push(format!("restart_allowed: {}", state.restart_allowed));
            if let Some(only_if_pending) = state.queued_restart {
                lines.push(format!("queued_restart: only_if_pending={only_if_pending}"));
            }
            if let Some(info) = host.store.latest_rollback_info()? {
                lines.push(format!(
                    "last_rollback: {} count={} at={}",
                    info.package_hash, info.count, info.time
                ));
            }
            if let Some(report) = host.store.pending_report()? {
                lines.push(format!("pending_report: {}", describe_report(&report)));
            }
            renderer.print_lines(&lines);
        }
        Commands::Launch { skip_ready } => {
            let outcome = host.store.launch()?;
            if let Some(release) = &outcome.rolled_back {
                renderer.print_status(
                    "warn",
                    &format!(
                        "rolled back {} ({}); it never confirmed a healthy launch",
                        release.label, release.package_hash
                    ),
                );
            }
            if let Some(release) = &outcome.applied {
                renderer.print_status("ok", &format!("applied pending release {}", release.label));
            }
            renderer.print_status(
                "step",
                &format_release_line("running", outcome.running.as_ref()),
            );
            if skip_ready {
                return Ok(());
            }

            let lifecycle = host.lifecycle(options);
            let status =
                run_with_callbacks(renderer, |callbacks| lifecycle.on_app_ready(callbacks))?;
            if status.is_none() {
                renderer.print_status("ok", "app ready; syncs are manual");
            }
        }
        Commands::Foreground { background_secs } => {
            if host.store.on_resume(background_secs)? {
                renderer.print_status("ok", "applied the release waiting for resume");
            }
            let lifecycle = host.lifecycle(options);
            run_with_callbacks(renderer, |callbacks| lifecycle.on_app_foreground(callbacks))?;
        }
        Commands::Suspend => {
            if host.store.on_suspend()? {
                renderer.print_status("ok", "applied the release waiting for suspend");
            } else {
                renderer.print_status("step", "no release waiting for suspend");
            }
        }
        Commands::NotifyReady => match host.client.notify_ready()? {
            Some(report) => {
                renderer.print_status("ok", &format!("reported {}", describe_report(&report)))
            }
            None => renderer.print_status("ok", "nothing to report"),
        },
        Commands::Restart { only_if_pending } => {
            host.client.restart(only_if_pending)?;
            let state = host.store.current_state()?;
            if state.queued_restart.is_some() {
                renderer.print_status("warn", "restarts are disallowed; restart queued");
            } else {
                let running = host.client.installed(UpdateState::Running)?;
                renderer.print_status("ok", &format_release_line("running", running.as_ref()));
            }
        }
        Commands::Clear => {
            host.client.clear_installed()?;
            renderer.print_status("ok", "removed all installed releases");
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Runs `call` with status, progress and version mismatch observers that
/// draw on the terminal.
fn run_with_callbacks<T, E>(
    renderer: TerminalRenderer,
    call: impl FnOnce(SyncCallbacks<'_>) -> Result<T, E>,
) -> Result<T, E> {
    let download = renderer.download_view();
    let on_status = |status: SyncStatus| renderer.print_sync_status(status);
    let on_progress = |progress: DownloadProgress| download.update(progress);
    let on_mismatch = |offer: &RemoteOffer| print_version_mismatch(renderer, offer);

    let result = call(SyncCallbacks {
        on_status: Some(&on_status),
        on_progress: Some(&on_progress),
        on_version_mismatch: Some(&on_mismatch),
    });
    download.finish();
    result
}

fn print_version_mismatch(renderer: TerminalRenderer, offer: &RemoteOffer) {
    renderer.print_status(
        "warn",
        &format!(
            "release {} targets app version {}; install a newer app binary to receive it",
            offer.label, offer.app_version
        ),
    );
}

pub(crate) fn describe_report(report: &StatusReport) -> String {
    match report {
        StatusReport::Release { package, status } => format!(
            "{} {} ({})",
            status.as_str(),
            package.label,
            package.package_hash
        ),
        StatusReport::Binary { app_version, .. } => format!("binary update to {app_version}"),
    }
}
