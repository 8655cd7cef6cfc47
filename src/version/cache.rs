//! Last-patched record (`version.json`).
//!
//! The patcher writes this after a successful patch. It is a hint, not the
//! source of truth: it may be missing after a cache wipe, or half-written
//! after a crash. A record that fails to parse is reported as
//! [`PatchCacheRead::Corrupt`] and callers treat it exactly like a missing one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::debug;

/// Contents of `version.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    /// `VersionDate` of the game at patch time
    #[serde(rename = "VersionDate")]
    pub version: String,

    /// `ClientVersion` of the game at patch time
    #[serde(rename = "Build", deserialize_with = "string_or_number")]
    pub build: String,

    /// When the patch was applied (older patchers omit it)
    #[serde(rename = "PatchedAt", default, skip_serializing_if = "Option::is_none")]
    pub patched_at: Option<DateTime<Utc>>,
}

/// Outcome of reading the patch cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchCacheRead {
    Found {
        record: PatchRecord,
        /// File modification time, used when the record has no `PatchedAt`
        modified: Option<DateTime<Utc>>,
    },
    Absent,
    Corrupt,
}

impl PatchCacheRead {
    /// The record, if one was read cleanly.
    pub fn record(&self) -> Option<&PatchRecord> {
        match self {
            PatchCacheRead::Found { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Best known patch time.
    pub fn patched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PatchCacheRead::Found { record, modified } => record.patched_at.or(*modified),
            _ => None,
        }
    }
}

/// Some patcher builds wrote `Build` as a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Reads the patch cache at `path`.
pub async fn read_patch_cache(path: &Path) -> PatchCacheRead {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PatchCacheRead::Absent,
        Err(e) => {
            debug!("Patch cache {} unreadable: {}", path.display(), e);
            return PatchCacheRead::Corrupt;
        }
    };

    let record: PatchRecord = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            debug!("Patch cache {} is corrupt: {}", path.display(), e);
            return PatchCacheRead::Corrupt;
        }
    };

    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    PatchCacheRead::Found { record, modified }
}
