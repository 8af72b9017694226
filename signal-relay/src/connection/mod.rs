//! Duplex message channel abstraction.
//!
//! A peer's socket is split in two:
//! - [`FrameSource`] is the inbound half, owned by the session's receive loop
//! - [`FrameSink`] is the outbound half, wrapped in a [`Connection`] that the
//!   registry, the router of every other session and the liveness task share
//!
//! `Connection::send` is safe to call from any number of tasks at once:
//! writes are serialized behind an async mutex so frames never interleave.
//! `Connection::close` flips a watch flag before touching the socket, which
//! wakes the owning session's receive loop even if the remote end never
//! answers the close handshake.

pub mod mock;
mod ws;

pub use ws::{split_websocket, WsSink, WsSource};

use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};

/// One data frame as it travelled on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Raw payload bytes, regardless of frame kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.to_string())
    }
}

/// Outbound half of a peer's socket.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one frame.
    async fn send(&mut self, frame: Frame) -> TransportResult<()>;

    /// Start the close handshake and release the socket.
    async fn close(&mut self) -> TransportResult<()>;
}

/// Inbound half of a peer's socket.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next data frame.
    ///
    /// Returns [`TransportError::Closed`] once the remote end closed the
    /// connection; any other error means the socket is unusable.
    async fn recv(&mut self) -> TransportResult<Frame>;
}

/// Process-unique id of a [`Connection`].
///
/// Registry operations that must only affect the session that owns an entry
/// compare this id rather than the peer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value, for logging.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Shared handle to the outbound half of one peer's socket.
pub struct Connection {
    id: ConnectionId,
    sink: Mutex<Box<dyn FrameSink>>,
    closed: watch::Sender<bool>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wrap an outbound sink.
    pub fn new(sink: impl FrameSink + 'static) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: ConnectionId::next(),
            sink: Mutex::new(Box::new(sink)),
            closed,
        }
    }

    /// This connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Send one frame. Fails with [`TransportError::Closed`] after `close`.
    pub async fn send(&self, frame: impl Into<Frame>) -> TransportResult<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(frame.into()).await
    }

    /// Send a server error frame (`Error: <message>`).
    pub async fn send_error(&self, message: impl fmt::Display) -> TransportResult<()> {
        self.send(format!("Error: {message}")).await
    }

    /// Close the connection. Only the first call touches the socket.
    pub async fn close(&self) -> TransportResult<()> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        let mut sink = self.sink.lock().await;
        sink.close().await
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called, from any task.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // Sender is owned by `self`; this cannot fail while borrowed
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
