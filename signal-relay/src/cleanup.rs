//! Background reaper for stale registry entries.
//!
//! Runs periodically and evicts peers whose `last_active` stopped advancing,
//! which only happens when a session lost its liveness task without running
//! its own cleanup. Disabled by default.

use crate::config::ReaperConfig;
use crate::server::SignalRelay;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::interval;

/// Spawn the reaper task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_reaper_task(
    relay: Arc<SignalRelay>,
    config: ReaperConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Stale-session reaper disabled");
            return;
        }

        tracing::info!(
            "Stale-session reaper started (interval: {}s, stale after: {}s)",
            config.interval_secs,
            config.stale_after_secs
        );

        let mut timer = interval(config.interval());

        loop {
            timer.tick().await;

            let reaped = reap_stale(&relay, &config).await;
            if reaped > 0 {
                tracing::info!("Reaper: evicted {} stale peers", reaped);
            } else {
                tracing::debug!("Reaper: no stale peers");
            }
        }
    })
}

/// Evict every entry idle for longer than `stale_after`. Returns the count.
pub async fn reap_stale(relay: &SignalRelay, config: &ReaperConfig) -> usize {
    let registry = relay.registry();
    let mut reaped = 0;

    for (peer_id, conn_id) in registry.stale(config.stale_after()) {
        // The entry may have been refreshed or replaced since the scan
        let Some(entry) = registry.remove_if_owner(peer_id.as_str(), conn_id) else {
            continue;
        };
        if let Err(e) = entry.connection.close().await {
            tracing::warn!(peer_id = %peer_id, "Failed to close stale connection: {}", e);
        }
        tracing::info!(peer_id = %peer_id, conn = %conn_id, "Evicted stale peer");
        reaped += 1;
    }

    relay
        .metrics()
        .peers_reaped
        .fetch_add(reaped as u64, Ordering::Relaxed);
    reaped
}
