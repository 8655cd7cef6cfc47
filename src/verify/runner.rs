//! Sequential check runner.
//!
//! [`run_all`] turns a check list into a lazy stream of [`StepEvent`]s. Checks
//! run one at a time, in order, and only while the stream is being polled.
//! A check that errors or panics is reported as failed and the run carries on.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use anyhow::Result;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, warn};

use super::checks::{CheckResult, VerificationCheck};

/// Shared flag for stopping a run from the outside.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runner settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pause between checks so progress is visible. Zero in tests and JSON mode.
    pub step_delay: Duration,
    pub cancel: CancelFlag,
}

/// Pass count for a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    pub passed_count: usize,
    pub total_count: usize,
    pub results: Vec<CheckResult>,
}

impl VerificationSummary {
    pub fn all_passed(&self) -> bool {
        self.passed_count == self.total_count
    }
}

/// One step of a run, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum StepEvent {
    Started {
        index: usize,
        name: &'static str,
    },
    Completed {
        index: usize,
        name: &'static str,
        result: CheckResult,
    },
    /// Always last, unless the run was cancelled.
    Finished(VerificationSummary),
}

enum Phase {
    Next,
    Execute(VerificationCheck),
    Done,
}

struct RunState {
    pending: std::vec::IntoIter<VerificationCheck>,
    total: usize,
    results: Vec<CheckResult>,
    options: RunOptions,
    phase: Phase,
}

/// Awaits a check future, turning errors and panics into a failed result.
async fn execute_isolated<F>(name: &str, check: F) -> CheckResult
where
    F: Future<Output = Result<CheckResult>>,
{
    match AssertUnwindSafe(check).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!("Check '{}' errored: {:#}", name, e);
            CheckResult::fail(format!("Error: {:#}", e))
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "check panicked".to_string());
            warn!("Check '{}' panicked: {}", name, message);
            CheckResult::fail(format!("Error: {}", message))
        }
    }
}

/// Runs `checks` in order as a stream of step events.
///
/// The stream is finite and cannot be restarted; build a fresh check list
/// for every run. Cancellation is honoured before each check starts and
/// after each one completes, and ends the stream without a `Finished` event.
pub fn run_all(checks: Vec<VerificationCheck>, options: RunOptions) -> impl Stream<Item = StepEvent> {
    let state = RunState {
        total: checks.len(),
        pending: checks.into_iter(),
        results: Vec::new(),
        options,
        phase: Phase::Next,
    };

    stream::unfold(state, |mut st| async move {
        match std::mem::replace(&mut st.phase, Phase::Done) {
            Phase::Next => {
                if !st.results.is_empty()
                    && !st.pending.as_slice().is_empty()
                    && !st.options.step_delay.is_zero()
                {
                    tokio::time::sleep(st.options.step_delay).await;
                }
                if st.options.cancel.is_cancelled() {
                    debug!("Verification cancelled before check {}", st.results.len());
                    return None;
                }

                match st.pending.next() {
                    Some(check) => {
                        let event = StepEvent::Started {
                            index: check.index,
                            name: check.name(),
                        };
                        st.phase = Phase::Execute(check);
                        Some((event, st))
                    }
                    None => {
                        let passed_count = st.results.iter().filter(|r| r.passed).count();
                        let summary = VerificationSummary {
                            passed_count,
                            total_count: st.total,
                            results: std::mem::take(&mut st.results),
                        };
                        debug!(
                            "Verification finished: {}/{} passed",
                            summary.passed_count, summary.total_count
                        );
                        Some((StepEvent::Finished(summary), st))
                    }
                }
            }
            Phase::Execute(check) => {
                let result = execute_isolated(check.name(), check.execute()).await;
                debug!(
                    "Check {} '{}': passed={} ({})",
                    check.index,
                    check.name(),
                    result.passed,
                    result.detail
                );
                st.results.push(result.clone());

                if st.options.cancel.is_cancelled() {
                    debug!("Verification cancelled after check {}", check.index);
                    return None;
                }

                st.phase = Phase::Next;
                let event = StepEvent::Completed {
                    index: check.index,
                    name: check.name(),
                    result,
                };
                Some((event, st))
            }
            Phase::Done => None,
        }
    })
}
