use pushkit_core::{ReleaseEntry, ReleaseHistory, ReleaseLabel};
use pushkit_security::rollout_bucket;
use tracing::debug;

use crate::types::{ResolveQuery, Resolution, ResolvedRelease};

/// Picks the release a device should move to from a binary version's history.
pub fn resolve_release(history: &ReleaseHistory, query: &ResolveQuery<'_>) -> Resolution {
    if history.is_empty() {
        debug!("release history is empty");
        return Resolution::no_update();
    }

    let candidate = history
        .iter()
        .rev()
        .find(|(label, entry)| is_eligible(label, entry, query));

    let Some((label, entry)) = candidate else {
        let rollback_to_binary = query
            .runtime_label
            .is_some_and(|running| !history.is_enabled(running));
        debug!(
            rollback_to_binary,
            "release history has no enabled release for this device"
        );
        return Resolution {
            offer: None,
            is_mandatory: false,
            rollback_to_binary,
        };
    };

    if query.runtime_label == Some(label) || query.running_hash == Some(entry.package_hash.as_str())
    {
        debug!(label = %label, "running release is already the latest");
        return Resolution::no_update();
    }

    let is_mandatory = match query.runtime_label {
        // Running a release newer than the latest enabled one: it was pulled,
        // so moving back is not optional.
        Some(running) if running > label => true,
        runtime_label => history
            .between(runtime_label, label)
            .any(|(_, skipped)| skipped.enabled && skipped.mandatory),
    };

    debug!(label = %label, is_mandatory, "resolved release offer");
    Resolution {
        offer: Some(ResolvedRelease {
            label: label.clone(),
            entry: entry.clone(),
        }),
        is_mandatory,
        rollback_to_binary: false,
    }
}

fn is_eligible(label: &ReleaseLabel, entry: &ReleaseEntry, query: &ResolveQuery<'_>) -> bool {
    if !entry.enabled {
        return false;
    }
    if query.runtime_label == Some(label) {
        return true;
    }
    match (entry.rollout, query.client_unique_id) {
        (Some(percent), Some(client_id)) if percent < 100 => {
            rollout_bucket(client_id, label.as_str()) < percent
        }
        _ => true,
    }
}
