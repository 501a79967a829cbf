//! Connection lifecycle for the presence broadcast.
//!
//! Exactly one connection and one poll timer exist per process; both are
//! created together and torn down together. Every failure here is local:
//! logged, recovered, never surfaced to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, Mutex};

use super::activity::{compose, PresencePayload};
use super::detector::{StateDetector, ViewProbe, ViewSlot};
use super::scheduler::PollScheduler;

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("activity update rejected: {0}")]
    Update(String),
}

/// One command for the connection's background push task.
#[derive(Debug)]
pub enum PresenceUpdate {
    Set(PresencePayload),
    Clear,
}

/// A live, logged-in presence connection.
pub trait PresenceClient: Send + Sync + 'static {
    /// Connection gate driven by the service's ready/disconnected
    /// notifications. No update is pushed while this reads false.
    fn is_connected(&self) -> bool;

    fn set_activity(
        &self,
        payload: &PresencePayload,
    ) -> impl Future<Output = Result<(), PresenceError>> + Send;

    fn clear_activity(&self) -> impl Future<Output = Result<(), PresenceError>> + Send;

    /// Best-effort close of the underlying connection.
    fn shutdown(self) -> impl Future<Output = ()> + Send;
}

/// Opens presence connections. The login handshake may take unbounded time
/// and may fail; failure leaves no connection behind.
pub trait PresenceConnector: Send + Sync + 'static {
    type Client: PresenceClient;

    fn login(&self) -> impl Future<Output = Result<Self::Client, PresenceError>> + Send;
}

struct Session {
    update_tx: mpsc::UnboundedSender<PresenceUpdate>,
    scheduler: PollScheduler,
    /// Unix milliseconds captured once at connection time; the "elapsed
    /// since" anchor shown on Discord. Resets only on reconnection.
    started_at: i64,
}

/// Owns the presence connection, the session clock and the poll timer.
pub struct PresenceManager<V, C> {
    connector: C,
    view: ViewSlot<V>,
    detector: Arc<StateDetector<V>>,
    session: Mutex<Option<Session>>,
}

impl<V: ViewProbe, C: PresenceConnector> PresenceManager<V, C> {
    pub fn new(connector: C) -> Self {
        let view = ViewSlot::new();
        let detector = Arc::new(StateDetector::new(view.clone()));
        Self {
            connector,
            view,
            detector,
            session: Mutex::new(None),
        }
    }

    /// Replace (or clear) the embedded-view handle read by the detector.
    pub fn set_view(&self, view: Option<Arc<V>>) {
        self.view.set(view);
    }

    /// Open the connection and start polling. Idempotent: a no-op while a
    /// connection is open, and serialized against a handshake already in
    /// progress. Login failure is logged and leaves the manager ready for a
    /// later retry.
    pub async fn initialize(&self) {
        let mut session = self.session.lock().await;
        if session.is_some() {
            tracing::info!("Discord RPC already initialized");
            return;
        }

        let started_at = unix_now_millis();

        let client = match self.connector.login().await {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Failed to initialize Discord RPC: {e}");
                return;
            }
        };

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_push_task(client, update_rx));

        let mut scheduler = PollScheduler::new();
        scheduler.start(Arc::clone(&self.detector), update_tx.clone(), started_at);

        *session = Some(Session {
            update_tx,
            scheduler,
            started_at,
        });
    }

    /// Stop polling and close the connection. Idempotent; never fails. An
    /// in-flight poll cycle may still push after this returns -- the closed
    /// update channel swallows it.
    pub async fn destroy(&self) {
        let mut session = self.session.lock().await;
        let Some(mut session) = session.take() else {
            return;
        };

        session.scheduler.stop();
        drop(session.update_tx);
        tracing::info!("Discord RPC destroyed");
    }

    /// Run one immediate detect/compose/push cycle outside the timer.
    pub async fn set_activity(&self) {
        let (started_at, update_tx) = {
            let session = self.session.lock().await;
            let Some(session) = session.as_ref() else {
                tracing::warn!("Cannot set activity: RPC not connected");
                return;
            };
            (session.started_at, session.update_tx.clone())
        };

        let snapshot = self.detector.detect().await;
        let payload = compose(&snapshot, started_at);
        tracing::debug!("Pushing immediate activity update: {}", payload.state);
        if update_tx.send(PresenceUpdate::Set(payload)).is_err() {
            tracing::debug!("Presence channel closed; dropping update");
        }
    }

    /// Ask the service to clear the displayed presence.
    pub async fn clear_activity(&self) {
        let session = self.session.lock().await;
        let Some(session) = session.as_ref() else {
            return;
        };
        let _ = session.update_tx.send(PresenceUpdate::Clear);
    }

    pub async fn is_initialized(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Session clock of the active connection, if any.
    pub async fn session_started_at(&self) -> Option<i64> {
        self.session.lock().await.as_ref().map(|s| s.started_at)
    }
}

fn unix_now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Drains updates onto the connection until the channel closes, then shuts
/// the connection down. Push failures are logged and ignored; the next poll
/// tick is the implicit retry.
async fn run_push_task<C: PresenceClient>(
    client: C,
    mut update_rx: mpsc::UnboundedReceiver<PresenceUpdate>,
) {
    while let Some(update) = update_rx.recv().await {
        if !client.is_connected() {
            tracing::warn!("Cannot update activity: RPC not connected");
            continue;
        }

        let result = match &update {
            PresenceUpdate::Set(payload) => client.set_activity(payload).await,
            PresenceUpdate::Clear => client.clear_activity().await,
        };

        if let Err(e) = result {
            tracing::debug!("Failed to push presence update: {e}");
        }
    }

    client.shutdown().await;
}
