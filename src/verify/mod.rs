//! Installation verification.
//!
//! A run is four checks, always in the same order:
//! 1. Package: modspack VPK present
//! 2. Version: patch matches the running game (see [`crate::version`])
//! 3. Game patch: `dota.signatures` present
//! 4. Integration: gameinfo marker and signature format in place
//!
//! [`run_verification`] rejects a target without a readable `steam.inf` up
//! front. Everything after that is reported per check and never aborts the run.

pub mod checks;
pub mod runner;

pub use checks::{build_checks, CheckKind, CheckResult, VerificationCheck};
pub use runner::{run_all, CancelFlag, RunOptions, StepEvent, VerificationSummary};

use futures::Stream;
use tracing::info;

use crate::games::{GameLayout, Markers};
use crate::version::{self, ReconcileError};

/// Starts a verification run against `layout`.
///
/// Fails only when the target has no usable version descriptor. The returned
/// stream yields a start and a completion event per check, then the summary.
pub async fn run_verification(
    layout: &GameLayout,
    markers: &Markers,
    options: RunOptions,
) -> Result<impl Stream<Item = StepEvent>, ReconcileError> {
    let current = version::read_ground_truth(layout).await?;
    info!(
        "Verifying {} against Dota {}",
        layout.root().display(),
        current
    );

    Ok(run_all(build_checks(layout, markers), options))
}

/// How a run's event stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stream ended without a summary
    Cancelled,
    Passed,
    Failed,
}

impl RunOutcome {
    /// `summary` is the `Finished` payload, if the stream produced one.
    pub fn from_summary(summary: Option<&VerificationSummary>) -> Self {
        match summary {
            None => RunOutcome::Cancelled,
            Some(s) if s.all_passed() => RunOutcome::Passed,
            Some(_) => RunOutcome::Failed,
        }
    }

    /// Only a completed, failing run may trigger the patcher.
    pub fn should_repatch(&self, requested: bool) -> bool {
        requested && *self == RunOutcome::Failed
    }

    /// Process exit code for the `verify` command.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Passed => 0,
            RunOutcome::Failed => 1,
            RunOutcome::Cancelled => 130,
        }
    }
}
