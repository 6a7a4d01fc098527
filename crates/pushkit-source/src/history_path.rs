use anyhow::Result;
use pushkit_core::Platform;

/// Location of a binary version's release history, relative to the root of
/// a history store: `histories/<platform>/<identifier>/<app_version>.json`.
pub fn history_path(platform: Platform, identifier: &str, app_version: &str) -> Result<String> {
    validate_segment("deployment identifier", identifier)?;
    validate_segment("app version", app_version)?;
    Ok(format!(
        "histories/{}/{identifier}/{app_version}.json",
        platform.as_str()
    ))
}

fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.len() > 128 {
        anyhow::bail!("invalid {kind}: must be 1-128 characters");
    }
    if value == "." || value == ".." {
        anyhow::bail!("invalid {kind}: '{value}'");
    }

    let is_valid = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '+'));
    if !is_valid {
        anyhow::bail!("invalid {kind}: '{value}'");
    }

    Ok(())
}
