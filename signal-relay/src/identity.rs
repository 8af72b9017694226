//! Identity resolution for a new session.
//!
//! A client either supplies `peerId` on the upgrade request or receives a
//! relay-assigned UUIDv7 as the very first frame (plain text, not JSON).

use crate::connection::Connection;
use crate::error::IdentityError;
use signal_types::PeerId;

/// Validate the raw `peerId` query parameter.
///
/// An empty value counts as absent. Runs before the upgrade so an invalid
/// id can be answered with a real `400`.
pub fn parse_requested(raw: Option<&str>) -> Result<Option<PeerId>, IdentityError> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) => Ok(Some(PeerId::parse(value)?)),
    }
}

/// Settle the session's identifier on a freshly upgraded connection.
///
/// A supplied id is adopted as-is; collisions with a live session are left
/// to the registry's replacement rule. Otherwise a new id is minted and
/// sent to the client. If that send fails the connection is closed and
/// nothing is registered.
pub async fn establish(
    requested: Option<PeerId>,
    connection: &Connection,
) -> Result<PeerId, IdentityError> {
    if let Some(id) = requested {
        return Ok(id);
    }

    let id = PeerId::generate();
    if let Err(e) = connection.send(id.as_str()).await {
        tracing::warn!("Failed to send assigned peer id: {}", e);
        if let Err(close_err) = connection.close().await {
            tracing::debug!("Close after failed announce failed: {}", close_err);
        }
        return Err(IdentityError::Announce(e));
    }

    tracing::debug!(peer_id = %id, "Assigned peer id");
    Ok(id)
}
