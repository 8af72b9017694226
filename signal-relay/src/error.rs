//! Error types for signal-relay.

use axum::http::StatusCode;
use signal_types::PeerIdError;

/// Main error type for signal-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Identity resolution failed before registration.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// I/O error binding or serving the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame I/O errors. Always fatal to the session that hit them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection closed, locally or by the remote end.
    #[error("connection closed")]
    Closed,

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Identity resolution errors. Raised before the session is registered.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Client supplied a `peerId` that is not a UUID.
    #[error(transparent)]
    InvalidPeerId(#[from] PeerIdError),

    /// The assigned id could not be delivered to the client.
    #[error("failed to send assigned peer id: {0}")]
    Announce(#[source] TransportError),
}

impl IdentityError {
    /// HTTP status reported for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::InvalidPeerId(_) => StatusCode::BAD_REQUEST,
            IdentityError::Announce(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Routing failures for a single frame. Recoverable; the sender's session
/// continues.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// No peer is registered under the addressed id.
    #[error("Target peer not found")]
    TargetNotFound {
        /// The `targetId` that was looked up.
        target: String,
    },

    /// The target is registered but writing to it failed.
    #[error("forward to {target} failed: {source}")]
    ForwardFailed {
        /// The `targetId` the frame was addressed to.
        target: String,
        /// The target connection's error.
        source: TransportError,
    },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for frame I/O.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
