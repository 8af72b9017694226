//! Per-connection session management.
//!
//! Each upgraded socket gets a Session that resolves its identity, registers
//! it, routes its frames and cleans up after it.

use crate::connection::{Connection, FrameSource};
use crate::error::{Result, TransportError};
use crate::identity;
use crate::liveness::spawn_liveness_task;
use crate::router::route_frame;
use crate::server::SignalRelay;
use signal_types::PeerId;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;

/// Session state machine states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Socket handed over by the upgrade; `run` not started yet.
    Upgrading,
    /// Settling the peer id.
    Identifying,
    /// Registered and routing frames.
    Active {
        /// The id the session is registered under.
        peer_id: PeerId,
    },
    /// Receive loop ended; cleanup in progress.
    Terminating,
    /// Cleanup finished.
    Removed,
}

/// A per-connection session.
pub struct Session<S> {
    relay: Arc<SignalRelay>,
    connection: Arc<Connection>,
    source: S,
    state: watch::Sender<SessionState>,
}

impl<S: FrameSource> Session<S> {
    /// Create a session for an upgraded connection.
    pub fn new(relay: Arc<SignalRelay>, connection: Arc<Connection>, source: S) -> Self {
        let (state, _) = watch::channel(SessionState::Upgrading);
        Self {
            relay,
            connection,
            source,
            state,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Follow state changes, including after `run` has taken the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Run the session until its connection ends.
    ///
    /// `requested` is the already-validated `peerId` from the upgrade
    /// request. Identity failures return before anything is registered.
    /// Once registered, the session always ends in cleanup and returns `Ok`.
    pub async fn run(mut self, requested: Option<PeerId>) -> Result<()> {
        self.relay
            .metrics()
            .connections_total
            .fetch_add(1, Ordering::Relaxed);
        self.set_state(SessionState::Identifying);

        let peer_id = match identity::establish(requested, &self.connection).await {
            Ok(peer_id) => peer_id,
            Err(e) => {
                self.set_state(SessionState::Removed);
                return Err(e.into());
            }
        };

        if self
            .relay
            .registry()
            .register(peer_id.clone(), Arc::clone(&self.connection))
            .await
        {
            self.relay
                .metrics()
                .peers_replaced
                .fetch_add(1, Ordering::Relaxed);
        }
        self.set_state(SessionState::Active {
            peer_id: peer_id.clone(),
        });
        tracing::info!(peer_id = %peer_id, conn = %self.connection.id(), "Session established");

        let liveness = spawn_liveness_task(
            self.relay.registry_arc(),
            peer_id.clone(),
            self.connection.id(),
            self.relay.config().session.liveness_interval(),
        );

        let reason = self.receive_loop(&peer_id).await;
        tracing::info!(peer_id = %peer_id, "Session ending: {}", reason);

        self.set_state(SessionState::Terminating);
        liveness.abort();
        self.cleanup(&peer_id).await;
        self.set_state(SessionState::Removed);

        Ok(())
    }

    /// Receive and route frames until the connection fails or is closed by a
    /// replacing session.
    async fn receive_loop(&mut self, peer_id: &PeerId) -> TransportError {
        let connection = Arc::clone(&self.connection);

        loop {
            let frame = tokio::select! {
                result = self.source.recv() => result,
                _ = connection.closed() => Err(TransportError::Closed),
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return e,
            };

            self.relay.registry().touch(peer_id.as_str(), connection.id());

            if let Err(e) = route_frame(&self.relay, peer_id, &connection, frame).await {
                return e;
            }
        }
    }

    /// Drop the registry entry if this session still owns it and close the
    /// socket.
    async fn cleanup(&self, peer_id: &PeerId) {
        let conn_id = self.connection.id();
        if self
            .relay
            .registry()
            .remove_if_owner(peer_id.as_str(), conn_id)
            .is_some()
        {
            tracing::info!(peer_id = %peer_id, conn = %conn_id, "Removed connection for peer");
        } else {
            tracing::debug!(
                peer_id = %peer_id,
                conn = %conn_id,
                "Entry already replaced or removed, leaving registry untouched"
            );
        }

        if let Err(e) = self.connection.close().await {
            tracing::debug!(peer_id = %peer_id, "Close on cleanup failed: {}", e);
        }
    }
}
