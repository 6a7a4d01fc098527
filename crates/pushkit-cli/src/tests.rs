use std::io::Cursor;

use clap::Parser;
use pushkit_core::{
    CheckFrequency, ConfigProvider, DeploymentStatus, DialogChoice, InstallMode, LocalRelease,
    Platform, StatusReport, SyncStatus, UpdateDialogOptions,
};

use super::*;
use crate::completion::write_completions_script;
use crate::config::{CliConfig, SourceKind, StaticConfig};
use crate::dialog::present_prompt;
use crate::dispatch::describe_report;
use crate::render::{
    colorize, format_release_line, render_status_line, render_sync_status,
    resolve_output_style, OutputStyle,
};

const HISTORY_CONFIG: &str = r#"
check_frequency = "on-app-resume"

[runtime]
app_version = "1.0.0"
client_unique_id = "device-1"
platform = "android"

[source]
kind = "history"
location = "/srv/releases"
identifier = "production"

[sync]
install_mode = "on-next-resume"
minimum_background_duration = 30

[sync.rollback_retry]
max_retry_attempts = 3
"#;

fn sample_release() -> LocalRelease {
    LocalRelease {
        label: "v3".to_string(),
        app_version: "1.0.0".to_string(),
        package_hash: "abc123".to_string(),
        description: String::new(),
        deployment_key: String::new(),
        is_mandatory: false,
        is_pending: true,
        is_first_run: false,
        failed_install: false,
        is_debug_only: false,
    }
}

#[test]
fn cli_parses_sync_overrides() {
    let cli = Cli::try_parse_from([
        "pushkit",
        "sync",
        "--install-mode",
        "on-next-resume",
        "--mandatory-install-mode",
        "on-next-restart",
        "--prompt",
    ])
    .expect("sync command should parse");

    match cli.command {
        Commands::Sync {
            install_mode,
            mandatory_install_mode,
            prompt,
        } => {
            assert_eq!(install_mode, Some(CliInstallMode::OnNextResume));
            assert_eq!(mandatory_install_mode, Some(CliInstallMode::OnNextRestart));
            assert!(prompt);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_accepts_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "pushkit",
        "status",
        "--device-root",
        "/tmp/device",
        "--config",
        "/tmp/pushkit.toml",
        "--log-level",
        "debug",
    ])
    .expect("global flags should parse after the subcommand");

    assert_eq!(cli.device_root, PathBuf::from("/tmp/device"));
    assert_eq!(cli.config, PathBuf::from("/tmp/pushkit.toml"));
    assert_eq!(cli.log_level, "debug");
    assert!(matches!(cli.command, Commands::Status));
}

#[test]
fn cli_defaults_device_root_and_config() {
    let cli = Cli::try_parse_from(["pushkit", "launch", "--skip-ready"])
        .expect("launch should parse");

    assert_eq!(cli.device_root, PathBuf::from(".pushkit"));
    assert_eq!(cli.config, PathBuf::from("pushkit.toml"));
    assert_eq!(cli.log_level, "warn");
    assert!(matches!(cli.command, Commands::Launch { skip_ready: true }));
}

#[test]
fn cli_rejects_unknown_install_mode() {
    let err = Cli::try_parse_from(["pushkit", "sync", "--install-mode", "later"])
        .expect_err("unknown install mode must fail");
    assert!(err.to_string().contains("later"));
}

#[test]
fn cli_parses_foreground_background_seconds() {
    let cli = Cli::try_parse_from(["pushkit", "foreground", "--background-secs", "45"])
        .expect("foreground should parse");
    assert!(matches!(
        cli.command,
        Commands::Foreground {
            background_secs: 45
        }
    ));
}

#[test]
fn cli_install_modes_map_to_core_modes() {
    assert_eq!(
        InstallMode::from(CliInstallMode::Immediate),
        InstallMode::Immediate
    );
    assert_eq!(
        InstallMode::from(CliInstallMode::OnNextRestart),
        InstallMode::OnNextRestart
    );
    assert_eq!(
        InstallMode::from(CliInstallMode::OnNextResume),
        InstallMode::OnNextResume
    );
    assert_eq!(
        InstallMode::from(CliInstallMode::OnNextSuspend),
        InstallMode::OnNextSuspend
    );
}

#[test]
fn config_parses_history_source_and_sync_table() {
    let config = CliConfig::from_toml_str(HISTORY_CONFIG).expect("config should parse");

    assert_eq!(config.check_frequency, CheckFrequency::OnAppResume);
    assert_eq!(config.runtime.app_version, "1.0.0");
    assert_eq!(config.runtime.platform, Platform::Android);
    assert_eq!(config.runtime.package_hash, None);
    assert_eq!(config.source.kind, SourceKind::History);
    assert_eq!(config.source.identifier, "production");
    assert_eq!(config.sync.install_mode, InstallMode::OnNextResume);
    assert_eq!(config.sync.mandatory_install_mode, InstallMode::Immediate);
    assert_eq!(config.sync.minimum_background_duration, 30);
    assert!(config.sync.ignore_failed_updates);

    let retry = config
        .sync
        .rollback_retry
        .expect("rollback retry table should be present");
    assert_eq!(retry.max_retry_attempts, 3);
    assert_eq!(retry.delay_in_hours, 24.0);
}

#[test]
fn config_defaults_check_frequency_and_sync_options() {
    let config = CliConfig::from_toml_str(
        r#"
[runtime]
app_version = "2.1.0"
client_unique_id = "device-2"
platform = "ios"
package_hash = "binaryhash"

[source]
kind = "oracle"
location = "https://updates.example.test/check"
"#,
    )
    .expect("config should parse");

    assert_eq!(config.check_frequency, CheckFrequency::OnAppStart);
    assert_eq!(config.runtime.package_hash.as_deref(), Some("binaryhash"));
    assert_eq!(config.source.kind, SourceKind::Oracle);
    assert_eq!(config.sync, pushkit_core::SyncOptions::default());
}

#[test]
fn config_requires_identifier_for_history_sources() {
    let err = CliConfig::from_toml_str(
        r#"
[runtime]
app_version = "1.0.0"
client_unique_id = "device-1"
platform = "ios"

[source]
kind = "history"
location = "/srv/releases"
"#,
    )
    .expect_err("missing identifier must fail");
    assert!(err.to_string().contains("source.identifier"));
}

#[test]
fn config_rejects_oracle_without_http_location() {
    let err = CliConfig::from_toml_str(
        r#"
[runtime]
app_version = "1.0.0"
client_unique_id = "device-1"
platform = "ios"

[source]
kind = "oracle"
location = "/srv/oracle"
"#,
    )
    .expect_err("oracle paths must fail");
    assert!(err.to_string().contains("http(s) url"));
}

#[test]
fn config_rejects_invalid_rollback_retry() {
    let input = HISTORY_CONFIG.replace("max_retry_attempts = 3", "max_retry_attempts = 0");
    let err = CliConfig::from_toml_str(&input).expect_err("zero retry attempts must fail");
    assert!(err.to_string().contains("max_retry_attempts"));
}

#[test]
fn config_rejects_unknown_fields() {
    let input = HISTORY_CONFIG.replace("[source]", "[source]\nmirror = \"x\"");
    CliConfig::from_toml_str(&input).expect_err("unknown source keys must fail");
}

#[test]
fn source_config_builds_matching_release_source() {
    let config = CliConfig::from_toml_str(HISTORY_CONFIG).expect("config should parse");
    let source = config
        .source
        .build(config.runtime.platform)
        .expect("filesystem history source should build");
    assert_eq!(source.kind(), "history");

    let mut http = config.source.clone();
    http.location = "https://cdn.example.test/releases".to_string();
    let source = http
        .build(Platform::Ios)
        .expect("http history source should build");
    assert_eq!(source.kind(), "history");

    let mut oracle = config.source.clone();
    oracle.kind = SourceKind::Oracle;
    oracle.location = "https://updates.example.test/check".to_string();
    let source = oracle.build(Platform::Ios).expect("oracle should build");
    assert_eq!(source.kind(), "oracle");
}

#[test]
fn static_config_serves_runtime_table() {
    let config = CliConfig::from_toml_str(HISTORY_CONFIG).expect("config should parse");
    let provider = StaticConfig::new(config.runtime.clone());
    let runtime = provider
        .runtime_config()
        .expect("static config never fails");
    assert_eq!(runtime, config.runtime);
}

#[test]
fn config_load_reports_missing_file() {
    let path = std::env::temp_dir().join(format!(
        "pushkit-cli-missing-{}.toml",
        std::process::id()
    ));
    let err = CliConfig::load(&path).expect_err("missing config must fail");
    assert!(err.to_string().contains("failed reading config"));
}

#[test]
fn prompt_accepts_button_number() {
    let prompt = UpdateDialogOptions::default().prompt_for(&sample_offer(false));
    let mut input = Cursor::new(b"2\n".to_vec());
    let mut output = Vec::new();

    let choice = present_prompt(&prompt, &mut input, &mut output).expect("prompt should answer");

    assert_eq!(choice, DialogChoice::Install);
    let rendered = String::from_utf8(output).expect("prompt output is utf-8");
    assert!(rendered.contains("Update available"));
    assert!(rendered.contains("[1] Ignore  [2] Install"));
}

#[test]
fn prompt_accepts_label_and_retries_unknown_answers() {
    let prompt = UpdateDialogOptions::default().prompt_for(&sample_offer(false));
    let mut input = Cursor::new(b"maybe\n\nignore\n".to_vec());
    let mut output = Vec::new();

    let choice = present_prompt(&prompt, &mut input, &mut output).expect("prompt should answer");

    assert_eq!(choice, DialogChoice::Ignore);
    let rendered = String::from_utf8(output).expect("prompt output is utf-8");
    assert!(rendered.contains("unrecognized answer: 'maybe'"));
}

#[test]
fn prompt_end_of_input_ignores_optional_updates() {
    let prompt = UpdateDialogOptions::default().prompt_for(&sample_offer(false));
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();

    let choice = present_prompt(&prompt, &mut input, &mut output).expect("prompt should answer");
    assert_eq!(choice, DialogChoice::Ignore);
}

#[test]
fn prompt_end_of_input_continues_mandatory_updates() {
    let prompt = UpdateDialogOptions::default().prompt_for(&sample_offer(true));
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();

    let choice = present_prompt(&prompt, &mut input, &mut output).expect("prompt should answer");
    assert_eq!(choice, DialogChoice::Install);
    let rendered = String::from_utf8(output).expect("prompt output is utf-8");
    assert!(rendered.contains("[1] Continue"));
}

fn sample_offer(is_mandatory: bool) -> pushkit_core::RemoteOffer {
    pushkit_core::RemoteOffer {
        label: "v4".to_string(),
        app_version: "1.0.0".to_string(),
        download_url: "https://cdn.example.test/v4".to_string(),
        is_mandatory,
        package_hash: "def456".to_string(),
        package_size: 2048,
        description: "fixes".to_string(),
        deployment_key: "production".to_string(),
        failed_install: false,
    }
}

#[test]
fn resolve_output_style_uses_rich_only_on_a_color_terminal() {
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "update installed"),
        "update installed"
    );
}

#[test]
fn render_status_line_rich_includes_badge() {
    let line = render_status_line(OutputStyle::Rich, "warn", "restart queued");
    assert!(line.contains("[WARN]"));
    assert!(line.ends_with(" restart queued"));
}

#[test]
fn render_sync_status_plain_uses_status_names() {
    assert_eq!(
        render_sync_status(OutputStyle::Plain, SyncStatus::UpdateInstalled),
        "UPDATE_INSTALLED"
    );
    assert_eq!(
        render_sync_status(OutputStyle::Plain, SyncStatus::CheckingForUpdate),
        "CHECKING_FOR_UPDATE"
    );
}

#[test]
fn render_sync_status_rich_describes_status() {
    let line = render_sync_status(OutputStyle::Rich, SyncStatus::UnknownError);
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("sync failed"));
}

#[test]
fn colorize_wraps_text_in_style_codes() {
    let style = anstyle::Style::new().bold();
    let rendered = colorize(style, "text");
    assert!(rendered.starts_with(&style.render().to_string()));
    assert!(rendered.contains("text"));
    assert!(rendered.ends_with(&style.render_reset().to_string()));
}

#[test]
fn format_release_line_lists_flags() {
    let release = sample_release();
    assert_eq!(
        format_release_line("pending", Some(&release)),
        "pending: v3 abc123 app_version=1.0.0 (pending)"
    );

    let mut failed = release.clone();
    failed.is_pending = false;
    failed.failed_install = true;
    failed.is_mandatory = true;
    assert_eq!(
        format_release_line("running", Some(&failed)),
        "running: v3 abc123 app_version=1.0.0 (failed, mandatory)"
    );
    assert_eq!(format_release_line("running", None), "running: none");
}

#[test]
fn describe_report_names_release_and_binary_reports() {
    let release = StatusReport::release("v3", "abc123", DeploymentStatus::Failed);
    assert_eq!(
        describe_report(&release),
        "DeploymentFailed v3 (abc123)"
    );
    assert_eq!(
        describe_report(&StatusReport::binary("2.0.0")),
        "binary update to 2.0.0"
    );
}

#[test]
fn completions_script_names_binary() {
    let mut output = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut output)
        .expect("bash completions should render");
    let script = String::from_utf8(output).expect("completion script is utf-8");
    assert!(script.contains("pushkit"));
    assert!(script.contains("notify-ready"));
}
