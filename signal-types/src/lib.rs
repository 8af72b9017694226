//! # signal-types
//!
//! Shared types for the rendezvous signaling relay.
//!
//! This crate provides the pieces both the relay and its clients agree on:
//! - [`PeerId`] - The identifier a peer is addressed by
//! - [`Envelope`] - The minimal routing header (`targetId`) read from each frame
//! - [`EnvelopeError`], [`PeerIdError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;

pub use envelope::{Envelope, TARGET_FIELD};
pub use error::{EnvelopeError, PeerIdError};
pub use ids::PeerId;
