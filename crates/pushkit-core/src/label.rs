use std::cmp::Ordering;
use std::fmt;

use anyhow::anyhow;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a release within one binary version.
///
/// Labels are ordered by release precedence rather than by string order:
/// semver-shaped labels (`1.2.0`, `v1.2`, `3`) compare by semver precedence,
/// anything else compares naturally so that `v2 < v10`.
#[derive(Debug, Clone)]
pub struct ReleaseLabel {
    raw: String,
    key: LabelKey,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LabelKey {
    Semver(Version),
    Natural(Vec<LabelChunk>),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LabelChunk {
    Number(u64),
    Text(String),
}

impl ReleaseLabel {
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(anyhow!("release label must not be empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(anyhow!("release label must not contain whitespace: '{raw}'"));
        }

        let key = match semver_key(raw) {
            Some(version) => LabelKey::Semver(version),
            None => LabelKey::Natural(natural_chunks(raw)),
        };
        Ok(Self {
            raw: raw.to_string(),
            key,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_semver(&self) -> bool {
        matches!(self.key, LabelKey::Semver(_))
    }
}

fn semver_key(raw: &str) -> Option<Version> {
    let stripped = raw
        .strip_prefix('v')
        .or_else(|| raw.strip_prefix('V'))
        .unwrap_or(raw);
    if let Ok(version) = Version::parse(stripped) {
        return Some(version);
    }

    let (core, rest) = match stripped.find(['-', '+']) {
        Some(index) => stripped.split_at(index),
        None => (stripped, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() > 2
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(rest);
    Version::parse(&padded).ok()
}

fn natural_chunks(raw: &str) -> Vec<LabelChunk> {
    let mut chunks = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();

    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            if !text.is_empty() {
                chunks.push(LabelChunk::Text(std::mem::take(&mut text)));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                chunks.push(number_chunk(&std::mem::take(&mut digits)));
            }
            text.push(ch);
        }
    }
    if !digits.is_empty() {
        chunks.push(number_chunk(&digits));
    }
    if !text.is_empty() {
        chunks.push(LabelChunk::Text(text));
    }
    chunks
}

fn number_chunk(digits: &str) -> LabelChunk {
    digits
        .parse::<u64>()
        .map(LabelChunk::Number)
        .unwrap_or_else(|_| LabelChunk::Text(digits.to_string()))
}

impl PartialEq for ReleaseLabel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseLabel {}

impl PartialOrd for ReleaseLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for ReleaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for ReleaseLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ReleaseLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ReleaseLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
