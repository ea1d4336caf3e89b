//! [`Transport`] over an axum `WebSocket`.
//!
//! The socket is split once so sends and receives never contend for the
//! same handle. Control frames are skipped by the reader; axum answers
//! pings on its own.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::debug;
use werewolf_core::transport::{Transport, TransportError};

/// One agent's `WebSocket` connection.
pub struct WsTransport {
    sink: SplitSink<WebSocket, Message>,
    stream: SplitStream<WebSocket>,
}

impl WsTransport {
    /// Wrap an upgraded socket.
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self { sink, stream }
    }
}

impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Write {
                message: e.to_string(),
            })
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes.to_vec()).map_err(|e| TransportError::Read {
                        message: format!("binary frame is not UTF-8: {e}"),
                    });
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "peer sent close frame");
                    return Err(TransportError::Closed);
                }
                None => return Err(TransportError::Closed),
                Some(Err(e)) => {
                    return Err(TransportError::Read {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.send(Message::Close(None)).await {
            debug!(error = %e, "close frame not delivered");
        }
    }
}
