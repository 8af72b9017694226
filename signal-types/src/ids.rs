//! Peer identity.

use crate::PeerIdError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The identifier a peer is registered and addressed under.
///
/// Relay-assigned ids are UUIDv7 (time-ordered). Client-supplied ids must
/// parse as a UUID but are kept verbatim, so the same string a client
/// registered with is the one other peers put in `targetId`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Mint a fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Validate a client-supplied identifier.
    ///
    /// Accepts every textual UUID form (hyphenated, simple, braced, URN).
    pub fn parse(value: &str) -> Result<Self, PeerIdError> {
        match uuid::Uuid::try_parse(value) {
            Ok(_) => Ok(Self(value.to_string())),
            Err(_) => Err(PeerIdError::Invalid {
                value: value.to_string(),
            }),
        }
    }

    /// The identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::str::FromStr for PeerId {
    type Err = PeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Lets registries keyed by PeerId be queried with a raw `targetId` str.
impl Borrow<str> for PeerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PeerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn generated_id_is_uuid_v7() {
        let id = PeerId::generate();
        let uuid = uuid::Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(uuid.get_version_num(), 7);
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = PeerId::generate();
        let b = PeerId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_accepts_uuid_forms() {
        assert!(PeerId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(PeerId::parse("67e5504410b1426f9247bb680e5fe0c8").is_ok());
        assert!(PeerId::parse("{67e55044-10b1-426f-9247-bb680e5fe0c8}").is_ok());
        assert!(PeerId::parse("urn:uuid:67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    }

    #[test]
    fn parse_rejects_non_uuid() {
        assert!(PeerId::parse("not-a-uuid").is_err());
        assert!(PeerId::parse("").is_err());
        assert!(PeerId::parse("67e55044-10b1-426f-9247").is_err());
    }

    #[test]
    fn parse_keeps_value_verbatim() {
        let raw = "67E55044-10B1-426F-9247-BB680E5FE0C8";
        let id = PeerId::parse(raw).unwrap();
        assert_eq!(id.as_str(), raw);
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn map_lookup_by_str() {
        let id = PeerId::generate();
        let mut map = HashMap::new();
        map.insert(id.clone(), 1);
        assert_eq!(map.get(id.as_str()), Some(&1));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PeerId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"67e55044-10b1-426f-9247-bb680e5fe0c8\"");
    }
}
