use pushkit_core::{ReleaseEntry, ReleaseLabel};

/// What the device is running when a history is resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveQuery<'a> {
    /// Label of the running release; `None` on the embedded binary.
    pub runtime_label: Option<&'a ReleaseLabel>,
    pub running_hash: Option<&'a str>,
    /// Enables percentage rollouts when present.
    pub client_unique_id: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub label: ReleaseLabel,
    pub entry: ReleaseEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub offer: Option<ResolvedRelease>,
    pub is_mandatory: bool,
    /// The running release is gone from the history and nothing replaces it.
    pub rollback_to_binary: bool,
}

impl Resolution {
    pub fn no_update() -> Self {
        Self::default()
    }
}
