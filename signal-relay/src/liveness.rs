//! Per-session liveness timestamp updater.
//!
//! Refreshes the session's `last_active` on a fixed period. It does not ping
//! the remote end and cannot detect a dead peer; it only stamps the entry
//! while the session still owns it.

use crate::connection::ConnectionId;
use crate::registry::PeerRegistry;
use signal_types::PeerId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Spawn the liveness task for one session.
///
/// The first refresh happens one full `period` after the call. The task exits
/// on the first tick where `peer_id` is gone from the registry or owned by a
/// different connection.
pub fn spawn_liveness_task(
    registry: Arc<PeerRegistry>,
    peer_id: PeerId,
    connection_id: ConnectionId,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            if !registry.touch(peer_id.as_str(), connection_id) {
                tracing::debug!(
                    peer_id = %peer_id,
                    conn = %connection_id,
                    "Peer no longer registered, stopping liveness updates"
                );
                return;
            }
            tracing::trace!(peer_id = %peer_id, "Refreshed liveness");
        }
    })
}
