//! # signal-relay
//!
//! Rendezvous relay for peer-to-peer signaling.
//!
//! This crate implements a relay server that:
//! - Accepts WebSocket connections from peers that cannot reach each other yet
//! - Assigns each peer an id, or adopts the UUID the peer asks for
//! - Forwards each frame, byte for byte, to the peer named in its `targetId`
//! - Never looks at anything else in the frame (relay is a "dumb pipe")
//!
//! ## Architecture
//!
//! ```text
//! Peer A ──┐                          ┌── Peer B
//!          │  {"targetId":"B",...}    │
//!          ├─────────────────────────►│
//!          │                          │
//!      ┌───┴──────────────────────────┴───┐
//!      │          signal-relay            │
//!      │  ┌────────────────────────────┐  │
//!      │  │  PeerRegistry (id → conn)  │  │
//!      │  └────────────────────────────┘  │
//!      └──────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! - `GET /ws` → the first frame the relay sends is the assigned peer id
//! - `GET /ws?peerId=<uuid>` → the peer is registered under that id
//! - Every frame afterwards is a JSON object with a `targetId`
//! - Problems come back as plain-text `Error: ...` frames

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod identity;
pub mod liveness;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;

pub use config::Config;
pub use registry::PeerRegistry;
pub use server::SignalRelay;
