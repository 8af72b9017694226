//! Frame routing.
//!
//! Reads only the `targetId` of each frame and forwards the original frame,
//! untouched, to the addressed peer's connection.

use crate::connection::{Connection, Frame};
use crate::error::{RoutingError, TransportResult};
use crate::server::SignalRelay;
use signal_types::{Envelope, EnvelopeError, PeerId};
use std::sync::atomic::Ordering;

/// What happened to one inbound frame.
#[derive(Debug)]
pub enum RouteOutcome {
    /// Forwarded to the target.
    Forwarded,
    /// Envelope was unusable; the sender got an error frame.
    Rejected(EnvelopeError),
    /// Target missing or the forward failed.
    Failed(RoutingError),
}

/// Route one frame received from `sender`.
///
/// Envelope and routing problems are reported and swallowed. The only error
/// returned is a failure to write an error frame back to the sender, which
/// means the sender's own connection is broken.
pub async fn route_frame(
    relay: &SignalRelay,
    sender_id: &PeerId,
    sender: &Connection,
    frame: Frame,
) -> TransportResult<RouteOutcome> {
    let metrics = relay.metrics();

    let envelope = match Envelope::parse(frame.as_bytes()) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(peer_id = %sender_id, "Rejected frame: {}", e);
            metrics.frames_rejected.fetch_add(1, Ordering::Relaxed);
            sender.send_error(&e).await?;
            return Ok(RouteOutcome::Rejected(e));
        }
    };

    let Some(target) = relay.registry().lookup(&envelope.target_id) else {
        tracing::debug!(
            peer_id = %sender_id,
            "Target peer not found: {}",
            envelope.target_id
        );
        metrics.targets_not_found.fetch_add(1, Ordering::Relaxed);
        let err = RoutingError::TargetNotFound {
            target: envelope.target_id,
        };
        sender.send_error(&err).await?;
        return Ok(RouteOutcome::Failed(err));
    };

    if let Err(source) = target.send(frame).await {
        // The target's own session will notice on its next receive.
        tracing::debug!(
            peer_id = %sender_id,
            "Error forwarding message to {}: {}",
            envelope.target_id,
            source
        );
        metrics.forward_failures.fetch_add(1, Ordering::Relaxed);
        return Ok(RouteOutcome::Failed(RoutingError::ForwardFailed {
            target: envelope.target_id,
            source,
        }));
    }

    metrics.frames_forwarded.fetch_add(1, Ordering::Relaxed);
    Ok(RouteOutcome::Forwarded)
}
