//! Peer registry: the process-wide map from peer id to live connection.
//!
//! Every operation is atomic for a single key and never holds a shard lock
//! across an `.await`. The only I/O is the best-effort close of a displaced
//! connection in [`PeerRegistry::register`], done after the map update.

use crate::connection::{Connection, ConnectionId};
use dashmap::DashMap;
use signal_types::PeerId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// Upper bound on waiting for a displaced connection's sink to close.
pub const REPLACED_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// One registered peer.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    /// Outbound handle of the session that owns this id.
    pub connection: Arc<Connection>,
    /// Last liveness refresh or inbound frame.
    pub last_active: Instant,
}

impl PeerEntry {
    fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            last_active: Instant::now(),
        }
    }

    /// Id of the owning connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }
}

/// Concurrent peer registry.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: DashMap<PeerId, PeerEntry>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` under `id`, replacing any previous owner.
    ///
    /// A displaced connection is marked closed before this returns, which
    /// wakes its session. Flushing the close frame is bounded by
    /// [`REPLACED_CLOSE_TIMEOUT`] so a stuck send on the old socket cannot
    /// hold up the new session. Returns `true` if an earlier session was
    /// replaced.
    pub async fn register(&self, id: PeerId, connection: Arc<Connection>) -> bool {
        let new_conn = connection.id();
        let previous = self.peers.insert(id.clone(), PeerEntry::new(connection));

        let Some(previous) = previous else {
            tracing::debug!(peer_id = %id, conn = %new_conn, "Registered peer");
            return false;
        };
        if previous.connection_id() == new_conn {
            return false;
        }

        match timeout(REPLACED_CLOSE_TIMEOUT, previous.connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                peer_id = %id,
                conn = %previous.connection_id(),
                "Failed to close replaced connection: {}",
                e
            ),
            Err(_) => tracing::warn!(
                peer_id = %id,
                conn = %previous.connection_id(),
                "Timed out closing replaced connection"
            ),
        }
        tracing::info!(
            peer_id = %id,
            old = %previous.connection_id(),
            new = %new_conn,
            "Replaced connection for peer"
        );
        true
    }

    /// Current connection for `id`, if registered.
    pub fn lookup(&self, id: &str) -> Option<Arc<Connection>> {
        self.peers.get(id).map(|entry| Arc::clone(&entry.connection))
    }

    /// Snapshot of the full entry for `id`.
    pub fn entry(&self, id: &str) -> Option<PeerEntry> {
        self.peers.get(id).map(|entry| entry.clone())
    }

    /// Remove `id` unconditionally.
    pub fn remove(&self, id: &str) -> Option<PeerEntry> {
        self.peers.remove(id).map(|(_, entry)| entry)
    }

    /// Remove `id` only if it is still owned by `owner`.
    ///
    /// Session cleanup uses this so a departing session never deletes the
    /// entry of a newer session that reclaimed the same id.
    pub fn remove_if_owner(&self, id: &str, owner: ConnectionId) -> Option<PeerEntry> {
        self.peers
            .remove_if(id, |_, entry| entry.connection_id() == owner)
            .map(|(_, entry)| entry)
    }

    /// Refresh the last-active timestamp of `id` if `owner` still holds it.
    ///
    /// Returns `false` when the id is gone or belongs to another connection.
    pub fn touch(&self, id: &str, owner: ConnectionId) -> bool {
        match self.peers.get_mut(id) {
            Some(mut entry) if entry.connection_id() == owner => {
                entry.last_active = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Entries idle for longer than `max_idle`.
    pub fn stale(&self, max_idle: Duration) -> Vec<(PeerId, ConnectionId)> {
        let now = Instant::now();
        self.peers
            .iter()
            .filter(|entry| now.duration_since(entry.last_active) > max_idle)
            .map(|entry| (entry.key().clone(), entry.connection_id()))
            .collect()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peer is registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock;

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (conn, _source, _peer) = mock::connection();

        assert!(!registry.register(id.clone(), Arc::clone(&conn)).await);

        let found = registry.lookup(id.as_str()).unwrap();
        assert_eq!(found.id(), conn.id());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(id.as_str()));
    }

    #[tokio::test]
    async fn lookup_unknown_is_none() {
        let registry = PeerRegistry::new();
        assert!(registry.lookup("nobody").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn peers_isolated_under_concurrent_registration() {
        let registry = Arc::new(PeerRegistry::new());
        let mut tasks = Vec::new();

        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let id = PeerId::generate();
                let (conn, _source, _peer) = mock::connection();
                registry.register(id.clone(), Arc::clone(&conn)).await;
                (id, conn.id())
            }));
        }

        let mut registered = Vec::new();
        for task in tasks {
            registered.push(task.await.unwrap());
        }

        assert_eq!(registry.len(), 32);
        for (id, conn_id) in registered {
            assert_eq!(registry.lookup(id.as_str()).unwrap().id(), conn_id);
        }
    }

    #[tokio::test]
    async fn re_register_replaces_and_closes_previous() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (first, _s1, first_peer) = mock::connection();
        let (second, _s2, second_peer) = mock::connection();

        registry.register(id.clone(), Arc::clone(&first)).await;
        let replaced = registry.register(id.clone(), Arc::clone(&second)).await;

        assert!(replaced);
        assert!(first_peer.is_closed());
        assert!(first.is_closed());
        assert!(!second_peer.is_closed());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(id.as_str()).unwrap().id(), second.id());
    }

    #[tokio::test(start_paused = true)]
    async fn re_register_is_not_blocked_by_stuck_send() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (old, _s1, old_peer) = mock::connection();
        let (new, _s2, _p2) = mock::connection();
        registry.register(id.clone(), Arc::clone(&old)).await;

        // A forward to the old peer holds its sink lock indefinitely
        old_peer.stall_sends();
        let stuck = {
            let old = Arc::clone(&old);
            tokio::spawn(async move { old.send("offer").await })
        };
        tokio::task::yield_now().await;

        let start = Instant::now();
        assert!(registry.register(id.clone(), Arc::clone(&new)).await);

        assert!(start.elapsed() <= REPLACED_CLOSE_TIMEOUT + Duration::from_millis(1));
        assert!(old.is_closed());
        assert_eq!(registry.lookup(id.as_str()).unwrap().id(), new.id());
        assert!(!stuck.is_finished());
        stuck.abort();
    }

    #[tokio::test]
    async fn re_register_same_connection_does_not_close_it() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (conn, _source, peer) = mock::connection();

        registry.register(id.clone(), Arc::clone(&conn)).await;
        assert!(!registry.register(id.clone(), Arc::clone(&conn)).await);
        assert!(!peer.is_closed());
    }

    #[tokio::test]
    async fn remove_deletes_entry() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (conn, _source, _peer) = mock::connection();

        registry.register(id.clone(), conn).await;
        assert!(registry.remove(id.as_str()).is_some());
        assert!(registry.remove(id.as_str()).is_none());
        assert!(registry.lookup(id.as_str()).is_none());
    }

    #[tokio::test]
    async fn remove_if_owner_spares_newer_session() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (old, _s1, _p1) = mock::connection();
        let (new, _s2, _p2) = mock::connection();

        registry.register(id.clone(), Arc::clone(&old)).await;
        registry.register(id.clone(), Arc::clone(&new)).await;

        // Departing old session cleans up after the fast reconnect
        assert!(registry.remove_if_owner(id.as_str(), old.id()).is_none());
        assert_eq!(registry.lookup(id.as_str()).unwrap().id(), new.id());

        assert!(registry.remove_if_owner(id.as_str(), new.id()).is_some());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn touch_is_owner_checked() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (old, _s1, _p1) = mock::connection();
        let (new, _s2, _p2) = mock::connection();

        assert!(!registry.touch(id.as_str(), old.id()));

        registry.register(id.clone(), Arc::clone(&old)).await;
        assert!(registry.touch(id.as_str(), old.id()));

        registry.register(id.clone(), Arc::clone(&new)).await;
        assert!(!registry.touch(id.as_str(), old.id()));
        assert!(registry.touch(id.as_str(), new.id()));
        assert_eq!(registry.lookup(id.as_str()).unwrap().id(), new.id());
    }

    #[tokio::test(start_paused = true)]
    async fn touch_refreshes_timestamp() {
        let registry = PeerRegistry::new();
        let id = PeerId::generate();
        let (conn, _source, _peer) = mock::connection();
        registry.register(id.clone(), Arc::clone(&conn)).await;

        let before = registry.entry(id.as_str()).unwrap().last_active;
        tokio::time::advance(Duration::from_secs(30)).await;
        registry.touch(id.as_str(), conn.id());
        let after = registry.entry(id.as_str()).unwrap().last_active;

        assert_eq!(after.duration_since(before), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_lists_only_idle_entries() {
        let registry = PeerRegistry::new();
        let idle = PeerId::generate();
        let fresh = PeerId::generate();
        let (idle_conn, _s1, _p1) = mock::connection();
        let (fresh_conn, _s2, _p2) = mock::connection();

        registry.register(idle.clone(), Arc::clone(&idle_conn)).await;
        registry.register(fresh.clone(), Arc::clone(&fresh_conn)).await;

        tokio::time::advance(Duration::from_secs(120)).await;
        registry.touch(fresh.as_str(), fresh_conn.id());

        let stale = registry.stale(Duration::from_secs(60));
        assert_eq!(stale, vec![(idle, idle_conn.id())]);
    }
}
