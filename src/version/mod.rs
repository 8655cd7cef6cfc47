//! Version reconciliation.
//!
//! Three sources disagree about whether the modspack matches the running game:
//!
//! 1. `steam.inf`: ground truth, always wins
//! 2. `version.json`: what the patcher last saw, optional and may be stale
//! 3. the patched artifacts themselves: the VPK and the gameinfo marker
//!
//! [`reconcile`] reads them in that order. A missing descriptor is fatal.
//! A missing or corrupt cache is not: the artifacts decide instead, so an
//! install whose cache was wiped still reads as patched.

pub mod cache;
pub mod descriptor;

pub use cache::{read_patch_cache, PatchCacheRead, PatchRecord};
pub use descriptor::{read_version_descriptor, GameVersion, UNKNOWN};

use crate::games::{file_contains, GameLayout, Markers};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Errors that make a whole verification run meaningless.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("No readable version descriptor at {0}")]
    PathInvalid(PathBuf),
}

/// Raw version facts for one installation. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub current_version: String,
    pub current_build: String,
    pub last_patched_version: Option<String>,
    pub last_patched_date: Option<DateTime<Utc>>,
    /// Signatures file missing or not in the expected patch format
    pub digest_changed: bool,
    pub game_info_has_mod_entry: bool,
}

/// How the patch relates to the running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchState {
    /// Cache matches the descriptor.
    Current,
    /// No usable cache, but the VPK and gameinfo marker are both in place.
    ///
    /// The build number is not compared on this path, so a stale patch with
    /// a wiped cache reads as current.
    CurrentByHeuristic,
    /// Cache records a different version or build.
    Drifted {
        patched_version: String,
        patched_build: String,
    },
    NotPatched,
}

impl PatchState {
    pub fn is_current(&self) -> bool {
        matches!(self, PatchState::Current | PatchState::CurrentByHeuristic)
    }
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub current: GameVersion,
    pub info: VersionInfo,
    pub state: PatchState,
}

/// Reads the descriptor only. Used to reject a bad target before any check runs.
pub async fn read_ground_truth(layout: &GameLayout) -> Result<GameVersion, ReconcileError> {
    let path = layout.steam_inf();
    read_version_descriptor(&path)
        .await
        .ok_or(ReconcileError::PathInvalid(path))
}

/// Reconciles descriptor, patch cache and artifacts into one verdict.
pub async fn reconcile(
    layout: &GameLayout,
    markers: &Markers,
) -> Result<Reconciliation, ReconcileError> {
    let current = read_ground_truth(layout).await?;

    let cache = read_patch_cache(&layout.version_cache()).await;
    let game_info_has_mod_entry = file_contains(&layout.gameinfo_branch(), &markers.mod_marker).await;
    let digest_changed = !file_contains(&layout.signatures(), &markers.signature_marker).await;

    let state = match cache.record() {
        Some(record) => {
            if record.version == current.version && record.build == current.build {
                PatchState::Current
            } else {
                info!(
                    "Game changed since last patch: now {}, patched {} (build {})",
                    current, record.version, record.build
                );
                PatchState::Drifted {
                    patched_version: record.version.clone(),
                    patched_build: record.build.clone(),
                }
            }
        }
        None => {
            if cache == PatchCacheRead::Corrupt {
                debug!("Ignoring corrupt patch cache, falling back to artifact check");
            }
            let vpk_present = tokio::fs::try_exists(layout.mod_vpk()).await.unwrap_or(false);
            if vpk_present && game_info_has_mod_entry {
                PatchState::CurrentByHeuristic
            } else {
                PatchState::NotPatched
            }
        }
    };

    let info = VersionInfo {
        current_version: current.version.clone(),
        current_build: current.build.clone(),
        last_patched_version: cache.record().map(|r| r.version.clone()),
        last_patched_date: cache.patched_at(),
        digest_changed,
        game_info_has_mod_entry,
    };

    Ok(Reconciliation {
        current,
        info,
        state,
    })
}
