//! Prometheus metrics endpoint.

use crate::server::SignalRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<SignalRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &SignalRelay) -> String {
    let m = relay.metrics();

    // Gauges: current state
    let peers = relay.active_peers();
    let uptime = relay.uptime_secs();

    // Counters: monotonic since startup
    let connections = m.connections_total.load(Ordering::Relaxed);
    let forwarded = m.frames_forwarded.load(Ordering::Relaxed);
    let rejected = m.frames_rejected.load(Ordering::Relaxed);
    let not_found = m.targets_not_found.load(Ordering::Relaxed);
    let forward_failures = m.forward_failures.load(Ordering::Relaxed);
    let replaced = m.peers_replaced.load(Ordering::Relaxed);
    let reaped = m.peers_reaped.load(Ordering::Relaxed);
    let identity_rejections = m.identity_rejections.load(Ordering::Relaxed);

    format!(
        r#"# HELP signal_relay_peers_active Number of registered peers
# TYPE signal_relay_peers_active gauge
signal_relay_peers_active {peers}

# HELP signal_relay_uptime_seconds Seconds since relay start
# TYPE signal_relay_uptime_seconds gauge
signal_relay_uptime_seconds {uptime}

# HELP signal_relay_info Server information
# TYPE signal_relay_info gauge
signal_relay_info{{version="{version}"}} 1

# HELP signal_relay_connections_total Total sessions accepted
# TYPE signal_relay_connections_total counter
signal_relay_connections_total {connections}

# HELP signal_relay_frames_forwarded_total Total frames forwarded to a target peer
# TYPE signal_relay_frames_forwarded_total counter
signal_relay_frames_forwarded_total {forwarded}

# HELP signal_relay_frames_rejected_total Total frames with an unusable envelope
# TYPE signal_relay_frames_rejected_total counter
signal_relay_frames_rejected_total {rejected}

# HELP signal_relay_targets_not_found_total Total frames addressed to an unknown peer
# TYPE signal_relay_targets_not_found_total counter
signal_relay_targets_not_found_total {not_found}

# HELP signal_relay_forward_failures_total Total forwards that failed on the target connection
# TYPE signal_relay_forward_failures_total counter
signal_relay_forward_failures_total {forward_failures}

# HELP signal_relay_peers_replaced_total Total sessions displaced by a reconnect
# TYPE signal_relay_peers_replaced_total counter
signal_relay_peers_replaced_total {replaced}

# HELP signal_relay_peers_reaped_total Total stale entries evicted
# TYPE signal_relay_peers_reaped_total counter
signal_relay_peers_reaped_total {reaped}

# HELP signal_relay_identity_rejections_total Total upgrades refused for an invalid peerId
# TYPE signal_relay_identity_rejections_total counter
signal_relay_identity_rejections_total {identity_rejections}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
