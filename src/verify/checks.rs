//! The standard check set.
//!
//! Order matters: later checks assume the earlier ones established their
//! preconditions, and the failure text is written with that order in mind.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::games::{file_contains, GameLayout, Markers};
use crate::version::{self, PatchState};

/// Outcome of one check in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Every check the doctor knows, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CheckKind {
    /// Modspack VPK is on disk
    Package,
    /// Patch matches the running game
    Version,
    /// Signatures file exists next to the game binaries
    GamePatch,
    /// Gameinfo marker and signature format are both in place
    Integration,
}

impl CheckKind {
    pub const ALL: [CheckKind; 4] = [
        CheckKind::Package,
        CheckKind::Version,
        CheckKind::GamePatch,
        CheckKind::Integration,
    ];

    /// Short label shown next to the result.
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::Package => "Package",
            CheckKind::Version => "Version",
            CheckKind::GamePatch => "Game patch",
            CheckKind::Integration => "Mod integration",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One registered check with everything it needs captured up front.
#[derive(Debug, Clone)]
pub struct VerificationCheck {
    pub index: usize,
    pub kind: CheckKind,
    layout: GameLayout,
    markers: Markers,
}

impl VerificationCheck {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Runs the check. Errors are left to the runner to report.
    pub async fn execute(&self) -> Result<CheckResult> {
        match self.kind {
            CheckKind::Package => check_package(&self.layout).await,
            CheckKind::Version => check_version(&self.layout, &self.markers).await,
            CheckKind::GamePatch => check_game_patch(&self.layout).await,
            CheckKind::Integration => check_integration(&self.layout, &self.markers).await,
        }
    }
}

/// Builds the ordered check list for one run.
pub fn build_checks(layout: &GameLayout, markers: &Markers) -> Vec<VerificationCheck> {
    CheckKind::ALL
        .iter()
        .enumerate()
        .map(|(index, &kind)| VerificationCheck {
            index,
            kind,
            layout: layout.clone(),
            markers: markers.clone(),
        })
        .collect()
}

async fn exists(path: &std::path::Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("Cannot access {}", path.display()))
}

async fn check_package(layout: &GameLayout) -> Result<CheckResult> {
    if exists(&layout.mod_vpk()).await? {
        Ok(CheckResult::pass("pak01_dir.vpk found"))
    } else {
        Ok(CheckResult::fail("VPK not found — install modspack first"))
    }
}

async fn check_version(layout: &GameLayout, markers: &Markers) -> Result<CheckResult> {
    let rec = version::reconcile(layout, markers).await?;

    Ok(match rec.state {
        PatchState::Current => CheckResult::pass(rec.current.to_string()),
        PatchState::CurrentByHeuristic => {
            CheckResult::pass(format!("{} (patch active, no version record)", rec.current))
        }
        PatchState::Drifted {
            patched_version,
            patched_build,
        } => CheckResult::fail(format!(
            "Dota updated since last patch: now {}, patched {} (build {}). Run Patch Update",
            rec.current, patched_version, patched_build
        )),
        PatchState::NotPatched => {
            CheckResult::fail(format!("{} is not patched. Run Patch Update", rec.current))
        }
    })
}

async fn check_game_patch(layout: &GameLayout) -> Result<CheckResult> {
    if exists(&layout.signatures()).await? {
        Ok(CheckResult::pass("dota.signatures found"))
    } else {
        Ok(CheckResult::fail(
            "dota.signatures missing. Verify game files in Steam, then patch",
        ))
    }
}

async fn check_integration(layout: &GameLayout, markers: &Markers) -> Result<CheckResult> {
    let gameinfo = layout.gameinfo_branch();
    let signatures = layout.signatures();

    if !exists(&gameinfo).await? || !exists(&signatures).await? {
        return Ok(CheckResult::fail(
            "Core game files missing. Verify game files in Steam",
        ));
    }

    let has_marker = file_contains(&gameinfo, &markers.mod_marker).await;
    let signature_ok = file_contains(&signatures, &markers.signature_marker).await;

    Ok(match (has_marker, signature_ok) {
        (true, true) => CheckResult::pass("Mod integrated"),
        (true, false) => CheckResult::fail(
            "Signature format outdated. Re-patch required (no reinstall needed)",
        ),
        (false, _) => CheckResult::fail("Mod not integrated. Run Patch Update"),
    })
}
