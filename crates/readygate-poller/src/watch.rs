//! Multi-target readiness watching.
//!
//! `ReadinessWatcher` runs one polling session per target as a
//! background task. Sessions share nothing: each owns its request and
//! produces one outcome, collected into a shared map when it
//! completes. A watch channel per session carries the cancel signal.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use readygate_core::{ConfigResult, ProbeOutcome, ProbeRequest};

use crate::probe::Probe;
use crate::session::poll_with_cancel;

/// Per-target session state.
struct WatchSlot {
    /// Handle to the background session task.
    handle: JoinHandle<()>,
    /// Cancel signal for this session.
    cancel_tx: watch::Sender<bool>,
}

/// Runs readiness sessions for many targets concurrently.
pub struct ReadinessWatcher<P> {
    probe: Arc<P>,
    /// Active sessions: target → slot.
    slots: Arc<RwLock<HashMap<String, WatchSlot>>>,
    /// Completed outcomes: target → outcome.
    outcomes: Arc<RwLock<HashMap<String, ProbeOutcome>>>,
}

impl<P: Probe + 'static> ReadinessWatcher<P> {
    /// Create a watcher that probes every target with `probe`.
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            slots: Arc::new(RwLock::new(HashMap::new())),
            outcomes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a session for the request's target.
    ///
    /// Validation failures surface here, before anything is spawned.
    /// Starting a target that is already being watched replaces the
    /// old session.
    pub async fn start(&self, request: ProbeRequest) -> ConfigResult<()> {
        request.validate()?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let target = request.target.clone();
        let probe = self.probe.clone();
        let outcomes = self.outcomes.clone();

        let handle = tokio::spawn(async move {
            // Validation already passed, so the session cannot error.
            if let Ok(outcome) = poll_with_cancel(probe.as_ref(), &request, cancel_rx).await {
                outcomes.write().await.insert(request.target.clone(), outcome);
            }
        });

        let mut slots = self.slots.write().await;
        if let Some(old) = slots.insert(target.clone(), WatchSlot { handle, cancel_tx }) {
            // Stop the old session if one was running.
            let _ = old.cancel_tx.send(true);
            old.handle.abort();
        }

        info!(%target, "readiness watch started");
        Ok(())
    }

    /// Cancel the session for one target.
    pub async fn cancel(&self, target: &str) {
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.remove(target) {
            let _ = slot.cancel_tx.send(true);
            let _ = slot.handle.await;
            info!(%target, "readiness watch cancelled");
        }
    }

    /// Cancel every active session (for shutdown).
    pub async fn cancel_all(&self) {
        let mut slots = self.slots.write().await;
        for (target, slot) in slots.drain() {
            let _ = slot.cancel_tx.send(true);
            let _ = slot.handle.await;
            debug!(%target, "readiness watch cancelled");
        }
        info!("all readiness watches cancelled");
    }

    /// Wait for every active session to finish and return all
    /// collected outcomes.
    pub async fn wait_all(&self) -> HashMap<String, ProbeOutcome> {
        let drained: Vec<(String, WatchSlot)> = {
            let mut slots = self.slots.write().await;
            slots.drain().collect()
        };
        for (target, slot) in drained {
            if slot.handle.await.is_err() {
                debug!(%target, "readiness session task aborted");
            }
        }
        self.outcomes.read().await.clone()
    }

    /// Completed outcome for a target, if its session has finished.
    pub async fn outcome(&self, target: &str) -> Option<ProbeOutcome> {
        self.outcomes.read().await.get(target).cloned()
    }

    /// Targets with a session still registered.
    pub async fn active_targets(&self) -> Vec<String> {
        let slots = self.slots.read().await;
        slots.keys().cloned().collect()
    }

    /// Whether a target has a registered session.
    pub async fn is_watching(&self, target: &str) -> bool {
        let slots = self.slots.read().await;
        slots.contains_key(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::probe::HttpProbe;
    use readygate_core::ProbeFailure;

    fn unreachable_request(target: &str) -> ProbeRequest {
        ProbeRequest::new(target)
            .with_max_attempts(2)
            .with_interval(Duration::from_millis(10))
            .with_probe_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn watcher_starts_and_cancels() {
        let watcher = ReadinessWatcher::new(HttpProbe);
        assert!(watcher.active_targets().await.is_empty());

        watcher
            .start(unreachable_request("http://127.0.0.1:1/healthz").with_max_attempts(1000))
            .await
            .unwrap();
        assert!(watcher.is_watching("http://127.0.0.1:1/healthz").await);

        watcher.cancel("http://127.0.0.1:1/healthz").await;
        assert!(!watcher.is_watching("http://127.0.0.1:1/healthz").await);

        // The cancelled session still reports an outcome.
        let outcome = watcher.outcome("http://127.0.0.1:1/healthz").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.last_error, Some(ProbeFailure::Cancelled));
    }

    #[tokio::test]
    async fn watcher_rejects_invalid_request_without_spawning() {
        let watcher = ReadinessWatcher::new(HttpProbe);
        let result = watcher
            .start(ProbeRequest::new("https://app.internal/healthz"))
            .await;
        assert!(result.is_err());
        assert!(watcher.active_targets().await.is_empty());
    }

    #[tokio::test]
    async fn wait_all_collects_every_outcome() {
        let watcher = ReadinessWatcher::new(HttpProbe);
        watcher
            .start(unreachable_request("http://127.0.0.1:1/healthz"))
            .await
            .unwrap();
        watcher
            .start(unreachable_request("http://127.0.0.1:1/readyz"))
            .await
            .unwrap();

        let outcomes = watcher.wait_all().await;
        assert_eq!(outcomes.len(), 2);
        for outcome in outcomes.values() {
            assert!(!outcome.success);
            assert_eq!(outcome.attempts_used, 2);
            assert!(matches!(
                outcome.last_error,
                Some(ProbeFailure::NetworkError(_))
            ));
        }
        assert!(watcher.active_targets().await.is_empty());
    }

    #[tokio::test]
    async fn restarting_a_target_replaces_the_session() {
        let watcher = ReadinessWatcher::new(HttpProbe);
        let target = "http://127.0.0.1:1/healthz";

        watcher
            .start(unreachable_request(target).with_max_attempts(1000))
            .await
            .unwrap();
        watcher.start(unreachable_request(target)).await.unwrap();

        assert_eq!(watcher.active_targets().await.len(), 1);
        watcher.cancel_all().await;
        assert!(watcher.active_targets().await.is_empty());
    }
}
