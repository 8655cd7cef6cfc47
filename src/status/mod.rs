//! Overall mod status.
//!
//! [`evaluate_status`] reduces an installation to one [`ModStatus`]. That
//! value is the single source of truth for everything shown about the
//! install; see [`diagnostics`] for how it gates the raw version fields.

pub mod diagnostics;

pub use diagnostics::{derive_diagnostics, DiagnosticsPayload};

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::games::{GameLayout, Markers};
use crate::version::{self, VersionInfo};

/// Re-runs the external patcher. Offered to the user after a failed check.
pub type PatchTrigger = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Overall state of the modspack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModStatus {
    Ready,
    NeedUpdate,
    Disabled,
    NotInstalled,
    Error,
}

impl ModStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ModStatus::Ready => "Ready",
            ModStatus::NeedUpdate => "Need Update",
            ModStatus::Disabled => "Disabled",
            ModStatus::NotInstalled => "Not Installed",
            ModStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for ModStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Status plus the text that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModStatusInfo {
    pub status: ModStatus,
    pub status_text: String,
    pub description: String,
    pub action_button_text: String,
    pub error_message: Option<String>,
}

impl ModStatusInfo {
    /// Standard texts for `status`.
    pub fn for_status(status: ModStatus) -> Self {
        let (description, action) = match status {
            ModStatus::Ready => (
                "Modspack is installed and patched for the current Dota build.",
                "Verify",
            ),
            ModStatus::NeedUpdate => (
                "Dota changed since the last patch. Patch again to re-enable mods.",
                "Patch Update",
            ),
            ModStatus::Disabled => (
                "Modspack is installed but not loaded by the game.",
                "Enable Mods",
            ),
            ModStatus::NotInstalled => ("Modspack is not installed.", "Install"),
            ModStatus::Error => ("Could not read the game installation.", "Retry"),
        };

        Self {
            status,
            status_text: status.label().to_string(),
            description: description.to_string(),
            action_button_text: action.to_string(),
            error_message: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            error_message: Some(message),
            ..Self::for_status(ModStatus::Error)
        }
    }
}

/// Evaluated status and, when the target was readable, its version facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub info: ModStatusInfo,
    pub version: Option<VersionInfo>,
}

/// Works out the overall status of the install at `layout`.
pub async fn evaluate_status(layout: &GameLayout, markers: &Markers) -> StatusReport {
    let rec = match version::reconcile(layout, markers).await {
        Ok(rec) => rec,
        Err(e) => {
            warn!("Status check failed: {}", e);
            return StatusReport {
                info: ModStatusInfo::error(e.to_string()),
                version: None,
            };
        }
    };

    let vpk_present = tokio::fs::try_exists(layout.mod_vpk()).await.unwrap_or(false);

    let status = if !vpk_present {
        ModStatus::NotInstalled
    } else if !rec.info.game_info_has_mod_entry {
        ModStatus::Disabled
    } else if rec.info.digest_changed || !rec.state.is_current() {
        ModStatus::NeedUpdate
    } else {
        ModStatus::Ready
    };

    info!("Mod status for {}: {}", layout.root().display(), status);

    StatusReport {
        info: ModStatusInfo::for_status(status),
        version: Some(rec.info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games;
    use crate::version::tests::{healthy_install, set};
    use tempfile::TempDir;

    async fn status_of(root: &std::path::Path) -> StatusReport {
        evaluate_status(&GameLayout::new(root), &Markers::default()).await
    }

    #[tokio::test]
    async fn test_healthy_is_ready() {
        let temp_dir = healthy_install();
        let report = status_of(temp_dir.path()).await;
        assert_eq!(report.info.status, ModStatus::Ready);
        assert_eq!(report.info.status_text, "Ready");
        assert!(report.version.is_some());
    }

    #[tokio::test]
    async fn test_ready_without_cache() {
        let temp_dir = healthy_install();
        std::fs::remove_file(temp_dir.path().join(games::VERSION_CACHE)).unwrap();

        let report = status_of(temp_dir.path()).await;
        assert_eq!(report.info.status, ModStatus::Ready);

        // Empty cache must not read as unhealthy
        let payload = derive_diagnostics(&report.info, report.version.as_ref().unwrap(), true);
        assert_eq!(payload.digest_ok, Some(true));
        assert_eq!(payload.game_info_ok, Some(true));
        assert!(!payload.version_mismatch);
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let report = status_of(temp_dir.path()).await;
        assert_eq!(report.info.status, ModStatus::Error);
        assert!(report.info.error_message.is_some());
        assert!(report.version.is_none());
    }

    #[tokio::test]
    async fn test_missing_vpk_is_not_installed() {
        let temp_dir = healthy_install();
        std::fs::remove_file(temp_dir.path().join(games::MOD_VPK)).unwrap();
        assert_eq!(status_of(temp_dir.path()).await.info.status, ModStatus::NotInstalled);
    }

    #[tokio::test]
    async fn test_missing_marker_is_disabled() {
        let temp_dir = healthy_install();
        set(temp_dir.path(), games::GAMEINFO_BRANCH, "\"GameInfo\" {}");
        assert_eq!(status_of(temp_dir.path()).await.info.status, ModStatus::Disabled);
    }

    #[tokio::test]
    async fn test_drift_or_bad_signature_needs_update() {
        let temp_dir = healthy_install();
        set(
            temp_dir.path(),
            games::VERSION_CACHE,
            r#"{"VersionDate": "Sep 18 2026", "Build": "6190"}"#,
        );
        assert_eq!(status_of(temp_dir.path()).await.info.status, ModStatus::NeedUpdate);

        let temp_dir = healthy_install();
        set(temp_dir.path(), games::SIGNATURES, "DIGEST:stock\n");
        assert_eq!(status_of(temp_dir.path()).await.info.status, ModStatus::NeedUpdate);
    }

    #[test]
    fn test_status_texts() {
        let info = ModStatusInfo::for_status(ModStatus::NeedUpdate);
        assert_eq!(info.status_text, "Need Update");
        assert_eq!(info.action_button_text, "Patch Update");
        assert!(info.error_message.is_none());
        assert_eq!(ModStatus::NotInstalled.to_string(), "Not Installed");
    }
}
