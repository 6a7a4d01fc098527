use std::collections::BTreeMap;
use std::ops::Bound;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::label::ReleaseLabel;

/// One release as published in a binary version's release history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEntry {
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub package_hash: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Releases of a single binary version, ordered by label precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReleaseHistory {
    releases: BTreeMap<ReleaseLabel, ReleaseEntry>,
}

impl ReleaseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_slice(input: &[u8]) -> anyhow::Result<Self> {
        let history: Self =
            serde_json::from_slice(input).context("failed to parse release history")?;
        history.validate()?;
        Ok(history)
    }

    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        Self::from_json_slice(input.as_bytes())
    }

    pub fn insert(&mut self, label: ReleaseLabel, entry: ReleaseEntry) -> Option<ReleaseEntry> {
        self.releases.insert(label, entry)
    }

    pub fn get(&self, label: &ReleaseLabel) -> Option<&ReleaseEntry> {
        self.releases.get(label)
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&ReleaseLabel, &ReleaseEntry)> {
        self.releases.iter()
    }

    pub fn is_enabled(&self, label: &ReleaseLabel) -> bool {
        self.releases.get(label).is_some_and(|entry| entry.enabled)
    }

    /// Releases strictly after `after` (or from the start when `None`) up to
    /// and including `through`.
    pub fn between<'a>(
        &'a self,
        after: Option<&ReleaseLabel>,
        through: &ReleaseLabel,
    ) -> impl Iterator<Item = (&'a ReleaseLabel, &'a ReleaseEntry)> + 'a {
        let upper = Bound::Included(through.clone());
        let lower = match after {
            // A lower bound past the upper one would make `range` panic.
            Some(label) if label > through => Bound::Excluded(through.clone()),
            Some(label) => Bound::Excluded(label.clone()),
            None => Bound::Unbounded,
        };
        self.releases.range((lower, upper))
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (label, entry) in &self.releases {
            if let Some(rollout) = entry.rollout {
                if rollout > 100 {
                    return Err(anyhow!(
                        "release '{label}' has rollout {rollout}; rollout must be between 0 and 100"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<(ReleaseLabel, ReleaseEntry)> for ReleaseHistory {
    fn from_iter<T: IntoIterator<Item = (ReleaseLabel, ReleaseEntry)>>(iter: T) -> Self {
        Self {
            releases: iter.into_iter().collect(),
        }
    }
}
