//! Fixed-cadence polling that drives detect -> compose -> push.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::activity::compose;
use super::detector::{StateDetector, ViewProbe};
use super::manager::PresenceUpdate;

/// Cadence of the detect/compose/push cycle.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Arms and disarms the presence poll timer.
///
/// Each cycle is spawned as its own task, so a slow probe never delays the
/// timer and `stop()` never cancels a cycle already in flight -- a late push
/// is tolerated and swallowed once the update channel is closed.
pub struct PollScheduler {
    timer: Option<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self { timer: None }
    }

    /// Arm the timer, replacing any previous one. The first cycle runs
    /// immediately rather than waiting out a full interval.
    pub fn start<V: ViewProbe>(
        &mut self,
        detector: Arc<StateDetector<V>>,
        update_tx: mpsc::UnboundedSender<PresenceUpdate>,
        started_at: i64,
    ) {
        self.stop();

        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;

                let detector = Arc::clone(&detector);
                let update_tx = update_tx.clone();
                tokio::spawn(async move {
                    let snapshot = detector.detect().await;
                    let payload = compose(&snapshot, started_at);
                    if update_tx.send(PresenceUpdate::Set(payload)).is_err() {
                        tracing::debug!("Presence channel closed; dropping update");
                    }
                });
            }
        }));
    }

    /// Disarm the timer. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::detector::{PageSnapshot, ProbeError, ViewSlot};
    use std::sync::Arc;

    struct IdleProbe;

    impl ViewProbe for IdleProbe {
        fn is_live(&self) -> bool {
            false
        }

        async fn snapshot(&self) -> Result<PageSnapshot, ProbeError> {
            Err(ProbeError::ViewGone)
        }
    }

    fn detector() -> Arc<StateDetector<IdleProbe>> {
        Arc::new(StateDetector::new(ViewSlot::new()))
    }

    #[tokio::test]
    async fn test_first_cycle_fires_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = PollScheduler::new();
        scheduler.start(detector(), tx, 7);

        let update = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("no update within 200ms")
            .expect("channel closed");
        let PresenceUpdate::Set(payload) = update else {
            panic!("expected a Set update");
        };
        assert_eq!(payload.state, "Browsing Chess.com");
        assert_eq!(payload.started_at, 7);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_restart_replaces_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = PollScheduler::new();

        scheduler.stop();
        scheduler.start(detector(), tx.clone(), 1);
        scheduler.start(detector(), tx, 2);
        scheduler.stop();
        scheduler.stop();

        // Drain whatever landed before the stop; the last armed timer used
        // started_at = 2, and after stop no new updates arrive.
        tokio::time::sleep(Duration::from_millis(50)).await;
        while let Ok(update) = rx.try_recv() {
            let PresenceUpdate::Set(payload) = update else {
                continue;
            };
            assert!(payload.started_at == 1 || payload.started_at == 2);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }
}
