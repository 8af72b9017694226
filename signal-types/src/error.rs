//! Error types for signal-types.

use thiserror::Error;

/// Errors raised while reading the routing envelope of a frame.
///
/// The `Display` text of each variant is what the relay sends back to the
/// sender (after the `Error: ` prefix), so keep it short and client-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Frame is not a JSON object
    #[error("Invalid message format")]
    InvalidFormat,

    /// `targetId` is missing, not a string, or empty
    #[error("Missing or invalid targetId")]
    MissingTarget,
}

/// Errors raised while validating a peer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerIdError {
    /// The value is not a UUID in any accepted textual form
    #[error("invalid peer id: {value:?}")]
    Invalid {
        /// The rejected value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_error_display_is_client_facing() {
        assert_eq!(
            EnvelopeError::InvalidFormat.to_string(),
            "Invalid message format"
        );
        assert_eq!(
            EnvelopeError::MissingTarget.to_string(),
            "Missing or invalid targetId"
        );
    }

    #[test]
    fn peer_id_error_quotes_value() {
        let err = PeerIdError::Invalid {
            value: "nope".into(),
        };
        assert_eq!(err.to_string(), "invalid peer id: \"nope\"");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EnvelopeError>();
        assert_send_sync::<PeerIdError>();
    }
}
