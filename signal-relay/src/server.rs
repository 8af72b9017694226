//! Main SignalRelay server coordination.
//!
//! SignalRelay owns the configuration, the peer registry and the operational
//! counters shared by every session.

use crate::config::Config;
use crate::error::Result;
use crate::http;
use crate::registry::PeerRegistry;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total sessions accepted (after upgrade, before identity).
    pub connections_total: AtomicU64,
    /// Total frames forwarded to a target peer.
    pub frames_forwarded: AtomicU64,
    /// Total frames rejected for a malformed envelope.
    pub frames_rejected: AtomicU64,
    /// Total frames addressed to an unregistered peer.
    pub targets_not_found: AtomicU64,
    /// Total forwards that failed on the target's connection.
    pub forward_failures: AtomicU64,
    /// Total registrations that displaced an earlier session.
    pub peers_replaced: AtomicU64,
    /// Total stale entries evicted by the reaper.
    pub peers_reaped: AtomicU64,
    /// Total upgrade requests refused for a bad identity.
    pub identity_rejections: AtomicU64,
}

/// Main relay server.
#[derive(Debug)]
pub struct SignalRelay {
    config: Config,
    registry: Arc<PeerRegistry>,
    metrics: RelayMetrics,
    started_at: Instant,
}

impl SignalRelay {
    /// Create a relay with an empty registry.
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, Arc::new(PeerRegistry::new()))
    }

    /// Create a relay around an existing registry.
    pub fn with_registry(config: Config, registry: Arc<PeerRegistry>) -> Self {
        Self {
            config,
            registry,
            metrics: RelayMetrics::default(),
            started_at: Instant::now(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the peer registry.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Get a clone of the registry Arc for background tasks.
    pub fn registry_arc(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Number of currently registered peers.
    pub fn active_peers(&self) -> usize {
        self.registry.len()
    }

    /// Seconds since the relay was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Bind `addr` and serve the HTTP router in a background task.
    ///
    /// Returns the bound address (useful with port 0) and the server task.
    pub async fn listen(
        self: &Arc<Self>,
        addr: &str,
    ) -> Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let router = http::build_router(Arc::clone(self));

        tracing::info!("Signal relay listening on {}", local_addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Server error: {}", e);
            }
        });
        Ok((local_addr, handle))
    }
}
