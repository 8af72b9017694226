//! Mock transport for testing.
//!
//! Captures frames the relay sends and lets tests feed inbound frames or
//! hang up, without a real socket.

use super::{Connection, Frame, FrameSink, FrameSource};
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Create a mock connection.
///
/// Returns the shared outbound handle, the inbound half for the session's
/// receive loop, and a [`MockPeer`] playing the remote end.
pub fn connection() -> (Arc<Connection>, MockSource, MockPeer) {
    let state = Arc::new(Mutex::new(MockState::default()));
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    let conn = Arc::new(Connection::new(MockSink {
        state: Arc::clone(&state),
    }));
    let source = MockSource { inbound: inbound_rx };
    let peer = MockPeer {
        state,
        inbound: inbound_tx,
    };
    (conn, source, peer)
}

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<Frame>,
    closed: bool,
    close_calls: usize,
    fail_sends: Option<String>,
    stall_sends: bool,
}

/// Outbound half recording everything written to it.
#[derive(Debug)]
pub struct MockSink {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send(&mut self, frame: Frame) -> TransportResult<()> {
        if self.state.lock().unwrap().stall_sends {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(TransportError::Closed);
        }
        if let Some(error) = &state.fail_sends {
            return Err(TransportError::Send(error.clone()));
        }
        state.sent.push(frame);
        Ok(())
    }

    async fn close(&mut self) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.close_calls += 1;
        Ok(())
    }
}

/// Inbound half fed by [`MockPeer`].
#[derive(Debug)]
pub struct MockSource {
    inbound: mpsc::UnboundedReceiver<TransportResult<Frame>>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn recv(&mut self) -> TransportResult<Frame> {
        match self.inbound.recv().await {
            Some(result) => result,
            None => Err(TransportError::Closed),
        }
    }
}

/// The remote end of a mock connection.
#[derive(Debug, Clone)]
pub struct MockPeer {
    state: Arc<Mutex<MockState>>,
    inbound: mpsc::UnboundedSender<TransportResult<Frame>>,
}

impl MockPeer {
    /// Deliver a text frame to the relay.
    pub fn send_text(&self, text: &str) {
        let _ = self.inbound.send(Ok(Frame::Text(text.to_string())));
    }

    /// Deliver an arbitrary frame to the relay.
    pub fn send_frame(&self, frame: Frame) {
        let _ = self.inbound.send(Ok(frame));
    }

    /// Make the relay's next `recv` fail as if the network dropped.
    pub fn fail_receive(&self, error: &str) {
        let _ = self.inbound.send(Err(TransportError::Receive(error.to_string())));
    }

    /// Close from the remote side; the relay's next `recv` sees `Closed`.
    pub fn hang_up(&self) {
        let _ = self.inbound.send(Err(TransportError::Closed));
    }

    /// Make every subsequent send to this peer fail.
    pub fn fail_sends(&self, error: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_sends = Some(error.to_string());
    }

    /// Make every subsequent send block forever, like a peer that stopped
    /// reading with a full socket buffer.
    pub fn stall_sends(&self) {
        self.state.lock().unwrap().stall_sends = true;
    }

    /// All frames the relay sent to this peer.
    pub fn sent(&self) -> Vec<Frame> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Text payloads the relay sent to this peer, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(text),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    /// Whether the relay closed this peer's socket.
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// How many times the underlying sink was closed.
    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }
}
