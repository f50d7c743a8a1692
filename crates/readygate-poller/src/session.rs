//! The polling session loop.
//!
//! A session issues up to `max_attempts` probes, strictly in sequence,
//! sleeping `interval` between attempts. Every attempt is tried: there
//! is no early exit on "permanent-looking" errors, because a fresh
//! deployment can fail DNS or refuse connections right up until it
//! becomes healthy. The last observed failure is what the outcome
//! carries, not the first.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, warn};

use readygate_core::{AttemptOutcome, ConfigResult, ProbeFailure, ProbeOutcome, ProbeRequest};

use crate::probe::Probe;

/// Run one polling session to completion.
///
/// Returns `Err` only for an invalid request, before any network
/// activity. The session result itself, success or exhaustion, is
/// always data.
pub async fn poll<P: Probe>(probe: &P, request: &ProbeRequest) -> ConfigResult<ProbeOutcome> {
    run_session(probe, request, None).await
}

/// Like [`poll`], but returns a `Cancelled` outcome as soon as the
/// watch channel flips to `true`. The token is checked before each
/// probe dispatch and during each sleep.
pub async fn poll_with_cancel<P: Probe>(
    probe: &P,
    request: &ProbeRequest,
    cancel: watch::Receiver<bool>,
) -> ConfigResult<ProbeOutcome> {
    run_session(probe, request, Some(cancel)).await
}

async fn run_session<P: Probe>(
    probe: &P,
    request: &ProbeRequest,
    mut cancel: Option<watch::Receiver<bool>>,
) -> ConfigResult<ProbeOutcome> {
    let target = request.validate()?;
    let start = Instant::now();
    let mut last_failure = ProbeFailure::BudgetExhausted;

    for attempt in 1..=request.max_attempts {
        if is_cancelled(cancel.as_ref()) {
            debug!(target = %request.target, completed = attempt - 1, "session cancelled");
            return Ok(ProbeOutcome::not_ready(
                attempt - 1,
                start.elapsed(),
                ProbeFailure::Cancelled,
            ));
        }

        match probe.probe(&target, request.probe_timeout).await {
            AttemptOutcome::Responded(status) if request.policy.accepts(status) => {
                debug!(target = %request.target, attempt, status, "target ready");
                return Ok(ProbeOutcome::ready(attempt, start.elapsed()));
            }
            AttemptOutcome::Responded(status) => {
                debug!(
                    target = %request.target,
                    attempt,
                    max = request.max_attempts,
                    status,
                    "response rejected by policy"
                );
                last_failure = ProbeFailure::UnexpectedStatus(status);
            }
            AttemptOutcome::TimedOut => {
                debug!(
                    target = %request.target,
                    attempt,
                    max = request.max_attempts,
                    "attempt timed out"
                );
                last_failure = ProbeFailure::TimedOut;
            }
            AttemptOutcome::NetworkError(reason) => {
                debug!(
                    target = %request.target,
                    attempt,
                    max = request.max_attempts,
                    %reason,
                    "attempt failed"
                );
                last_failure = ProbeFailure::NetworkError(reason);
            }
        }

        // No sleep after the final attempt.
        if attempt < request.max_attempts {
            if let SleepResult::Cancelled =
                sleep_or_cancel(request.interval, cancel.as_mut()).await
            {
                debug!(target = %request.target, completed = attempt, "session cancelled");
                return Ok(ProbeOutcome::not_ready(
                    attempt,
                    start.elapsed(),
                    ProbeFailure::Cancelled,
                ));
            }
        }
    }

    warn!(
        target = %request.target,
        attempts = request.max_attempts,
        last_error = %last_failure,
        "attempt budget exhausted"
    );
    Ok(ProbeOutcome::not_ready(
        request.max_attempts,
        start.elapsed(),
        last_failure,
    ))
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.map(|rx| *rx.borrow()).unwrap_or(false)
}

enum SleepResult {
    Elapsed,
    Cancelled,
}

/// Sleep for `interval`, waking early only on a cancel signal.
async fn sleep_or_cancel(
    interval: Duration,
    cancel: Option<&mut watch::Receiver<bool>>,
) -> SleepResult {
    let Some(rx) = cancel else {
        tokio::time::sleep(interval).await;
        return SleepResult::Elapsed;
    };

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return SleepResult::Elapsed,
            res = rx.changed() => match res {
                Ok(()) if *rx.borrow() => return SleepResult::Cancelled,
                Ok(()) => {}
                Err(_) => {
                    // Controller gone; no cancel can arrive anymore.
                    (&mut sleep).await;
                    return SleepResult::Elapsed;
                }
            },
        }
    }
}
