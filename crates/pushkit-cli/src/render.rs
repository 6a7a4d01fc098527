use std::cell::{Cell, OnceCell};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use pushkit_core::{DownloadProgress, LocalRelease, RemoteOffer, SyncStatus};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(std::io::stdout().is_terminal(), no_color)
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Rich {
            println!("{}", colorize(section_style(), &format!("== {title} ==")));
        }
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn print_sync_status(self, status: SyncStatus) {
        println!("{}", render_sync_status(self.style, status));
    }

    pub(crate) fn download_view(self) -> DownloadView {
        DownloadView {
            style: self.style,
            progress_bar: OnceCell::new(),
            received: Cell::new(0),
            started_at: Instant::now(),
        }
    }
}

/// Progress of a bundle download, drawn lazily on the first progress event.
pub(crate) struct DownloadView {
    style: OutputStyle,
    progress_bar: OnceCell<ProgressBar>,
    received: Cell<u64>,
    started_at: Instant,
}

impl DownloadView {
    pub(crate) fn update(&self, progress: DownloadProgress) {
        self.received.set(progress.received_bytes);
        if self.style == OutputStyle::Plain {
            return;
        }

        let progress_bar = self.progress_bar.get_or_init(|| {
            let progress_bar = ProgressBar::new(progress.total_bytes.unwrap_or(0).max(1));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<10} [{bar:24.cyan/blue}] {bytes:>10}/{total_bytes:10} {elapsed_precise}",
            ) {
                progress_bar.set_style(style.tick_chars("|/-\\ ").progress_chars("=>-"));
            }
            progress_bar.set_message("download");
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            progress_bar
        });

        let total = progress
            .total_bytes
            .unwrap_or(progress.received_bytes)
            .max(1);
        progress_bar.set_length(total);
        progress_bar.set_position(progress.received_bytes.min(total));
    }

    pub(crate) fn finish(self) {
        let Some(progress_bar) = self.progress_bar.into_inner() else {
            return;
        };
        progress_bar.finish_and_clear();
        println!(
            "{}",
            render_download_line(
                self.style,
                self.received.get(),
                Some(self.started_at.elapsed())
            )
        );
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => {
            let badge = format!("[{}]", status.to_ascii_uppercase());
            format!("{} {message}", colorize(badge_style(status), &badge))
        }
    }
}

pub(crate) fn render_sync_status(style: OutputStyle, status: SyncStatus) -> String {
    let badge = match status {
        SyncStatus::UpToDate | SyncStatus::UpdateInstalled => "ok",
        SyncStatus::UpdateIgnored | SyncStatus::SyncInProgress => "warn",
        SyncStatus::UnknownError => "error",
        SyncStatus::CheckingForUpdate
        | SyncStatus::AwaitingUserAction
        | SyncStatus::DownloadingPackage
        | SyncStatus::InstallingUpdate => "step",
    };
    let message = match style {
        OutputStyle::Plain => status.as_str().to_string(),
        OutputStyle::Rich => describe_sync_status(status).to_string(),
    };
    render_status_line(style, badge, &message)
}

fn describe_sync_status(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::UpToDate => "app is up to date",
        SyncStatus::UpdateInstalled => "update installed",
        SyncStatus::UpdateIgnored => "update ignored",
        SyncStatus::UnknownError => "sync failed",
        SyncStatus::SyncInProgress => "another sync is in progress",
        SyncStatus::CheckingForUpdate => "checking for update",
        SyncStatus::AwaitingUserAction => "awaiting confirmation",
        SyncStatus::DownloadingPackage => "downloading package",
        SyncStatus::InstallingUpdate => "installing update",
    }
}

pub(crate) fn render_download_line(
    style: OutputStyle,
    received: u64,
    elapsed: Option<Duration>,
) -> String {
    let suffix = elapsed
        .map(|value| format!(" in {}", format_elapsed(value)))
        .unwrap_or_default();
    let message = format!("downloaded {}{suffix}", HumanBytes(received));
    render_status_line(style, "ok", &message)
}

pub(crate) fn format_offer_lines(offer: &RemoteOffer) -> Vec<String> {
    let mut lines = vec![
        format!("label: {}", offer.label),
        format!("app_version: {}", offer.app_version),
        format!("package_hash: {}", offer.package_hash),
        format!("mandatory: {}", offer.is_mandatory),
        format!("size: {}", HumanBytes(offer.package_size)),
    ];
    if !offer.description.is_empty() {
        lines.push(format!("description: {}", offer.description));
    }
    if offer.failed_install {
        lines.push("previously failed: true".to_string());
    }
    lines
}

pub(crate) fn format_release_line(kind: &str, release: Option<&LocalRelease>) -> String {
    match release {
        Some(release) => {
            let mut flags = Vec::new();
            if release.is_pending {
                flags.push("pending");
            }
            if release.is_first_run {
                flags.push("first-run");
            }
            if release.failed_install {
                flags.push("failed");
            }
            if release.is_mandatory {
                flags.push("mandatory");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            format!(
                "{kind}: {} {} app_version={}{flags}",
                release.label, release.package_hash, release.app_version
            )
        }
        None => format!("{kind}: none"),
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "error" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightCyan,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

pub(crate) fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
