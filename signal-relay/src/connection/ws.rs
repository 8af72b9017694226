//! WebSocket halves for an upgraded axum socket.

use super::{Frame, FrameSink, FrameSource};
use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

/// Split an upgraded socket into its outbound and inbound halves.
pub fn split_websocket(socket: WebSocket) -> (WsSink, WsSource) {
    let (sink, stream) = socket.split();
    (WsSink { inner: sink }, WsSource { inner: stream })
}

/// Outbound half of a WebSocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> TransportResult<()> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
        };
        self.inner
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> TransportResult<()> {
        // Closing the sink writes the close frame and flushes.
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Inbound half of a WebSocket.
pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn recv(&mut self) -> TransportResult<Frame> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Frame::Text(text.as_str().to_owned()))
                }
                Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Binary(bytes.to_vec())),
                // axum answers pings itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
            }
        }
    }
}
