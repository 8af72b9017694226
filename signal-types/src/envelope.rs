//! Envelope - the routing header the relay reads from each frame.

use crate::EnvelopeError;
use serde_json::{Map, Value};

/// Name of the routing field every relayed frame must carry.
pub const TARGET_FIELD: &str = "targetId";

/// The parsed routing header of a frame.
///
/// The relay only ever reads `targetId`. Everything else in the JSON object
/// is opaque payload and is forwarded as the original bytes, never
/// re-serialized from this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Identifier of the peer the frame is addressed to.
    pub target_id: String,
}

impl Envelope {
    /// Read the routing header from raw frame bytes.
    ///
    /// The frame must be a JSON object whose `targetId` is a non-empty string.
    pub fn parse(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let object: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|_| EnvelopeError::InvalidFormat)?;

        match object.get(TARGET_FIELD) {
            Some(Value::String(target)) if !target.is_empty() => Ok(Self {
                target_id: target.clone(),
            }),
            _ => Err(EnvelopeError::MissingTarget),
        }
    }

    /// Build a client frame addressed to `target` carrying `fields`.
    ///
    /// Used by clients and tests; the relay itself never constructs frames.
    pub fn compose(target: &str, fields: Map<String, Value>) -> String {
        let mut object = fields;
        object.insert(TARGET_FIELD.to_string(), Value::String(target.to_string()));
        Value::Object(object).to_string()
    }
}
