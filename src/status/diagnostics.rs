//! Diagnostics shown next to the status.
//!
//! The status decides what the raw version fields are allowed to say:
//!
//! - `Ready`: every flag reads healthy, whatever the raw fields hold. An empty
//!   cache on a working install must not show up as a problem.
//! - `NotInstalled`: flags are unknown (`None`), never `false`.
//! - anything else: the raw fields are shown as read.

use serde::Serialize;

use super::{ModStatus, ModStatusInfo};
use crate::version::VersionInfo;

/// Shown when no patch date is known.
pub const NEVER_PATCHED: &str = "Never";

/// Presentation-ready health flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsPayload {
    pub digest_ok: Option<bool>,
    pub game_info_ok: Option<bool>,
    pub version_mismatch: bool,
    pub patch_date: String,
    pub patched_version: String,
    pub show_patch_button: bool,
}

/// Derives diagnostics from the status and raw version facts. No I/O.
///
/// `patch_available` is whether the caller has a patch trigger to offer.
pub fn derive_diagnostics(
    status_info: &ModStatusInfo,
    version_info: &VersionInfo,
    patch_available: bool,
) -> DiagnosticsPayload {
    let status = status_info.status;

    let (digest_ok, game_info_ok) = match status {
        ModStatus::Ready => (Some(true), Some(true)),
        ModStatus::NotInstalled => (None, None),
        _ => (
            Some(!version_info.digest_changed),
            Some(version_info.game_info_has_mod_entry),
        ),
    };

    let version_mismatch = status != ModStatus::Ready
        && version_info
            .last_patched_version
            .as_deref()
            .is_some_and(|patched| patched != version_info.current_version);

    let show_patch_button =
        patch_available && matches!(status, ModStatus::NeedUpdate | ModStatus::Disabled);

    DiagnosticsPayload {
        digest_ok,
        game_info_ok,
        version_mismatch,
        patch_date: version_info
            .last_patched_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| NEVER_PATCHED.to_string()),
        patched_version: version_info
            .last_patched_version
            .clone()
            .unwrap_or_else(|| crate::version::UNKNOWN.to_string()),
        show_patch_button,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// Raw fields that would each read as broken on their own.
    fn broken_version_info() -> VersionInfo {
        VersionInfo {
            current_version: "Oct 02 2026".to_string(),
            current_build: "6213".to_string(),
            last_patched_version: Some("Sep 18 2026".to_string()),
            last_patched_date: None,
            digest_changed: true,
            game_info_has_mod_entry: false,
        }
    }

    fn empty_cache_info() -> VersionInfo {
        VersionInfo {
            last_patched_version: None,
            ..broken_version_info()
        }
    }

    #[test]
    fn test_ready_forces_healthy_flags() {
        let payload = derive_diagnostics(
            &ModStatusInfo::for_status(ModStatus::Ready),
            &broken_version_info(),
            true,
        );
        assert_eq!(payload.digest_ok, Some(true));
        assert_eq!(payload.game_info_ok, Some(true));
        assert!(!payload.version_mismatch);
        assert!(!payload.show_patch_button);
    }

    #[test]
    fn test_not_installed_is_unknown_not_false() {
        let payload = derive_diagnostics(
            &ModStatusInfo::for_status(ModStatus::NotInstalled),
            &broken_version_info(),
            true,
        );
        assert_eq!(payload.digest_ok, None);
        assert_eq!(payload.game_info_ok, None);
        assert!(!payload.show_patch_button);
    }

    #[test]
    fn test_need_update_shows_raw_flags() {
        let payload = derive_diagnostics(
            &ModStatusInfo::for_status(ModStatus::NeedUpdate),
            &broken_version_info(),
            true,
        );
        assert_eq!(payload.digest_ok, Some(false));
        assert_eq!(payload.game_info_ok, Some(false));
        assert!(payload.version_mismatch);
        assert!(payload.show_patch_button);
        assert_eq!(payload.patched_version, "Sep 18 2026");
    }

    #[test]
    fn test_mismatch_needs_a_patched_version() {
        let payload = derive_diagnostics(
            &ModStatusInfo::for_status(ModStatus::NeedUpdate),
            &empty_cache_info(),
            false,
        );
        assert!(!payload.version_mismatch);
        assert_eq!(payload.patched_version, "Unknown");
        assert_eq!(payload.patch_date, NEVER_PATCHED);
    }

    #[test]
    fn test_patch_button_rules() {
        let info = broken_version_info();
        for status in [ModStatus::NeedUpdate, ModStatus::Disabled] {
            let status_info = ModStatusInfo::for_status(status);
            assert!(derive_diagnostics(&status_info, &info, true).show_patch_button);
            assert!(!derive_diagnostics(&status_info, &info, false).show_patch_button);
        }
        let error = ModStatusInfo::for_status(ModStatus::Error);
        assert!(!derive_diagnostics(&error, &info, true).show_patch_button);
    }

    #[test]
    fn test_patch_date_format_and_json_keys() {
        let info = VersionInfo {
            last_patched_date: Some(Utc.with_ymd_and_hms(2026, 10, 3, 8, 30, 0).unwrap()),
            ..broken_version_info()
        };
        let payload = derive_diagnostics(&ModStatusInfo::for_status(ModStatus::Ready), &info, false);
        assert_eq!(payload.patch_date, "2026-10-03 08:30");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["digestOk"], true);
        assert_eq!(json["gameInfoOk"], true);
        assert_eq!(json["showPatchButton"], false);
    }
}
