use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use pushkit_core::InstallMode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod completion;
mod config;
mod dialog;
mod dispatch;
mod render;

use dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "pushkit")]
#[command(about = "Over-the-air bundle update client", long_about = None)]
struct Cli {
    /// Directory holding installed releases and device state.
    #[arg(long, global = true, default_value = ".pushkit")]
    device_root: PathBuf,
    #[arg(long, global = true, default_value = "pushkit.toml")]
    config: PathBuf,
    /// Tracing filter, e.g. `info` or `pushkit_sync=debug`.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the configured source whether an update is available.
    Check,
    /// Check, download and install an update.
    Sync {
        #[arg(long, value_enum)]
        install_mode: Option<CliInstallMode>,
        #[arg(long, value_enum)]
        mandatory_install_mode: Option<CliInstallMode>,
        /// Confirm the update on the terminal before installing.
        #[arg(long)]
        prompt: bool,
    },
    Status,
    /// Simulate a cold start of the app.
    Launch {
        /// Stop before the app reports itself ready, as a crash would.
        #[arg(long)]
        skip_ready: bool,
    },
    /// Simulate the app returning from the background.
    Foreground {
        #[arg(long, default_value_t = 0)]
        background_secs: u32,
    },
    /// Simulate the app moving to the background.
    Suspend,
    NotifyReady,
    Restart {
        #[arg(long)]
        only_if_pending: bool,
    },
    /// Remove every installed release.
    Clear,
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CliInstallMode {
    Immediate,
    OnNextRestart,
    OnNextResume,
    OnNextSuspend,
}

impl From<CliInstallMode> for InstallMode {
    fn from(value: CliInstallMode) -> Self {
        match value {
            CliInstallMode::Immediate => Self::Immediate,
            CliInstallMode::OnNextRestart => Self::OnNextRestart,
            CliInstallMode::OnNextResume => Self::OnNextResume,
            CliInstallMode::OnNextSuspend => Self::OnNextSuspend,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl From<CliCompletionShell> for Shell {
    fn from(value: CliCompletionShell) -> Self {
        match value {
            CliCompletionShell::Bash => Shell::Bash,
            CliCompletionShell::Zsh => Shell::Zsh,
            CliCompletionShell::Fish => Shell::Fish,
            CliCompletionShell::Powershell => Shell::PowerShell,
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    run_cli(cli)
}

#[cfg(test)]
mod tests;
