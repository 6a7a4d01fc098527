use super::*;

fn label(raw: &str) -> ReleaseLabel {
    ReleaseLabel::parse(raw).expect("label must parse")
}

fn offer(is_mandatory: bool, description: &str) -> RemoteOffer {
    RemoteOffer {
        label: "1.0.1".to_string(),
        app_version: "1.0.0".to_string(),
        download_url: "https://example.test/bundles/1.0.1.zip".to_string(),
        is_mandatory,
        package_hash: "hash-1".to_string(),
        package_size: 0,
        description: description.to_string(),
        deployment_key: String::new(),
        failed_install: false,
    }
}

#[test]
fn labels_order_by_semver_precedence_not_string_order() {
    assert!(label("1.9.0") < label("1.10.0"));
    assert!(label("1.0.0-beta.1") < label("1.0.0"));
    assert!(label("v1.2") < label("1.2.1"));
    assert!(label("2") > label("1.99.99"));
}

#[test]
fn free_form_labels_use_natural_order() {
    assert!(label("v2") < label("v10"));
    assert!(label("build-9") < label("build-10"));
    assert!(!label("v2").is_semver());
    assert!(label("v2.0.0").is_semver());
}

#[test]
fn label_rejects_empty_and_whitespace() {
    assert!(ReleaseLabel::parse("").is_err());
    assert!(ReleaseLabel::parse("   ").is_err());
    assert!(ReleaseLabel::parse("1.0 beta").is_err());
}

#[test]
fn label_displays_raw_text() {
    assert_eq!(label(" v1.2 ").to_string(), "v1.2");
    assert_eq!(label("1.0.0").as_str(), "1.0.0");
}

#[test]
fn parse_release_history_json() {
    let history = ReleaseHistory::from_json_str(
        r#"{
  "1.0.1": {
    "enabled": true,
    "mandatory": false,
    "downloadUrl": "https://example.test/bundles/1.0.1.zip",
    "packageHash": "h1"
  },
  "1.0.10": {
    "enabled": true,
    "mandatory": true,
    "downloadUrl": "https://example.test/bundles/1.0.10.zip",
    "packageHash": "h10",
    "rollout": 50
  },
  "1.0.2": {
    "enabled": false,
    "mandatory": false,
    "downloadUrl": "https://example.test/bundles/1.0.2.zip",
    "packageHash": "h2"
  }
}"#,
    )
    .expect("history must parse");

    let labels: Vec<&str> = history.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, vec!["1.0.1", "1.0.2", "1.0.10"]);
    assert!(history.is_enabled(&label("1.0.1")));
    assert!(!history.is_enabled(&label("1.0.2")));
    assert!(!history.is_enabled(&label("9.9.9")));
    assert_eq!(
        history.get(&label("1.0.10")).and_then(|entry| entry.rollout),
        Some(50)
    );
}

#[test]
fn empty_json_object_is_an_empty_history() {
    let history = ReleaseHistory::from_json_str("{}").expect("empty history must parse");
    assert!(history.is_empty());
    assert_eq!(history.len(), 0);
}

#[test]
fn release_history_rejects_rollout_above_one_hundred() {
    let err = ReleaseHistory::from_json_str(
        r#"{"1.0.1": {"enabled": true, "downloadUrl": "u", "packageHash": "h", "rollout": 101}}"#,
    )
    .expect_err("must reject rollout above 100");
    assert!(err.to_string().contains("rollout must be between 0 and 100"));
}

#[test]
fn between_excludes_lower_and_includes_upper() {
    let history: ReleaseHistory = ["v1", "v2", "v3", "v4"]
        .into_iter()
        .map(|raw| (label(raw), ReleaseEntry {
            download_url: format!("https://example.test/{raw}"),
            enabled: true,
            package_hash: raw.to_string(),
            mandatory: false,
            rollout: None,
            description: None,
        }))
        .collect();

    let from_v1: Vec<&str> = history
        .between(Some(&label("v1")), &label("v3"))
        .map(|(label, _)| label.as_str())
        .collect();
    assert_eq!(from_v1, vec!["v2", "v3"]);

    let from_binary: Vec<&str> = history
        .between(None, &label("v2"))
        .map(|(label, _)| label.as_str())
        .collect();
    assert_eq!(from_binary, vec!["v1", "v2"]);

    assert_eq!(history.between(Some(&label("v4")), &label("v2")).count(), 0);
    assert_eq!(history.between(Some(&label("v2")), &label("v2")).count(), 0);
}

#[test]
fn sync_options_defaults_match_client_defaults() {
    let options = SyncOptions::default();
    assert!(options.ignore_failed_updates);
    assert!(options.rollback_retry.is_none());
    assert_eq!(options.install_mode, InstallMode::OnNextRestart);
    assert_eq!(options.mandatory_install_mode, InstallMode::Immediate);
    assert_eq!(options.minimum_background_duration, 0);
    assert!(options.update_dialog.is_none());
    assert_eq!(options.install_mode_for(true), InstallMode::Immediate);
    assert_eq!(options.install_mode_for(false), InstallMode::OnNextRestart);
}

#[test]
fn sync_options_merge_partial_tables_with_defaults() {
    let options = SyncOptions::from_toml_str(
        r#"
install_mode = "on-next-resume"
minimum_background_duration = 30

[rollback_retry]
delay_in_hours = 2

[update_dialog]
title = "New version"
"#,
    )
    .expect("options must parse");

    assert_eq!(options.install_mode, InstallMode::OnNextResume);
    assert_eq!(options.mandatory_install_mode, InstallMode::Immediate);
    assert_eq!(options.minimum_background_duration, 30);
    let retry = options.rollback_retry.expect("retry options must be present");
    assert_eq!(retry.delay_in_hours, 2.0);
    assert_eq!(retry.max_retry_attempts, 1);
    let dialog = options.update_dialog.expect("dialog must be present");
    assert_eq!(dialog.title, "New version");
    assert_eq!(dialog.optional_install_button_label, "Install");
}

#[test]
fn sync_options_reject_unknown_install_mode() {
    let err = SyncOptions::from_toml_str(r#"install_mode = "whenever""#)
        .expect_err("must reject unknown mode");
    assert!(err.to_string().contains("failed to parse sync options"));
}

#[test]
fn rollback_retry_options_validation() {
    assert!(RollbackRetryOptions::default().validate().is_ok());

    let err = RollbackRetryOptions {
        delay_in_hours: f64::NAN,
        max_retry_attempts: 1,
    }
    .validate()
    .expect_err("NaN delay must be rejected");
    assert!(err.to_string().contains("delay_in_hours"));

    let err = RollbackRetryOptions {
        delay_in_hours: 1.0,
        max_retry_attempts: 0,
    }
    .validate()
    .expect_err("zero attempts must be rejected");
    assert!(err.to_string().contains("cannot be less than 1"));
}

#[test]
fn optional_prompt_offers_ignore_before_install() {
    let prompt = UpdateDialogOptions::default().prompt_for(&offer(false, "bug fixes"));
    assert_eq!(prompt.title, "Update available");
    assert_eq!(
        prompt.message,
        "An update is available. Would you like to install it?"
    );
    let choices: Vec<DialogChoice> = prompt.buttons.iter().map(|b| b.choice).collect();
    assert_eq!(choices, vec![DialogChoice::Ignore, DialogChoice::Install]);
    assert_eq!(prompt.buttons[1].label, "Install");
    assert!(!prompt.is_mandatory);
}

#[test]
fn mandatory_prompt_has_only_continue_and_appends_description() {
    let options = UpdateDialogOptions {
        append_release_description: true,
        ..UpdateDialogOptions::default()
    };
    let prompt = options.prompt_for(&offer(true, "security fix"));
    assert_eq!(prompt.buttons.len(), 1);
    assert_eq!(prompt.buttons[0].label, "Continue");
    assert_eq!(prompt.buttons[0].choice, DialogChoice::Install);
    assert_eq!(
        prompt.message,
        "An update is available that must be installed. Description:  security fix"
    );
}

#[test]
fn status_report_json_shapes() {
    let release: StatusReport = serde_json::from_str(
        r#"{"package": {"label": "v2", "packageHash": "h2"}, "status": "DeploymentFailed"}"#,
    )
    .expect("release report must parse");
    assert_eq!(
        release,
        StatusReport::release("v2", "h2", DeploymentStatus::Failed)
    );

    let binary: StatusReport =
        serde_json::from_str(r#"{"appVersion": "1.0.0"}"#).expect("binary report must parse");
    assert_eq!(binary, StatusReport::binary("1.0.0"));
}

#[test]
fn sync_status_codes_are_stable() {
    assert_eq!(SyncStatus::UpToDate.code(), 0);
    assert_eq!(SyncStatus::SyncInProgress.code(), 4);
    assert_eq!(SyncStatus::InstallingUpdate.code(), 8);
    assert!(SyncStatus::UpdateIgnored.is_terminal());
    assert!(!SyncStatus::DownloadingPackage.is_terminal());
}

#[test]
fn install_mode_round_trips_through_str() {
    for mode in [
        InstallMode::Immediate,
        InstallMode::OnNextRestart,
        InstallMode::OnNextResume,
        InstallMode::OnNextSuspend,
    ] {
        assert_eq!(InstallMode::parse(mode.as_str()).expect("mode"), mode);
    }
    assert!(InstallMode::parse("later").is_err());
}

#[test]
fn only_ios_forwards_binary_hash() {
    assert!(Platform::Ios.forwards_binary_hash());
    assert!(!Platform::Android.forwards_binary_hash());
    assert_eq!(Platform::parse("android").expect("platform"), Platform::Android);
}
