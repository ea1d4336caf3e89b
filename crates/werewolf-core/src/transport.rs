//! The text-message transport an agent link talks through.
//!
//! The game never touches sockets directly. Each seat owns one value
//! implementing [`Transport`]: the server crate wraps an axum WebSocket,
//! tests and in-process bots use [`ChannelTransport`].
//!
//! Receiving must be cancel-safe: the link races `recv_text` against a
//! timer and drops the future when the timer wins.

use std::future::Future;

use tokio::sync::mpsc;

/// Errors surfaced by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection, or it is otherwise gone for good.
    #[error("connection closed")]
    Closed,

    /// A read failed but the connection may still be usable.
    #[error("read failed: {message}")]
    Read {
        /// Description of the failure.
        message: String,
    },

    /// A write failed.
    #[error("write failed: {message}")]
    Write {
        /// Description of the failure.
        message: String,
    },
}

/// A bidirectional, text-framed connection to one agent.
pub trait Transport: Send {
    /// Send one text frame.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait for the next text frame. Must be cancel-safe.
    fn recv_text(&mut self) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Close the connection. Errors are ignored.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

// ---------------------------------------------------------------------------
// In-process transport
// ---------------------------------------------------------------------------

/// Server side of an in-process connection backed by tokio channels.
#[derive(Debug)]
pub struct ChannelTransport {
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<String>,
}

/// Agent side of an in-process connection.
///
/// Dropping the peer closes the connection as seen by the server.
#[derive(Debug)]
pub struct ChannelPeer {
    /// Frames sent by the server.
    pub inbox: mpsc::UnboundedReceiver<String>,
    /// Frames for the server.
    pub outbox: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a connected transport/peer pair.
    pub fn pair() -> (Self, ChannelPeer) {
        let (to_peer, inbox) = mpsc::unbounded_channel();
        let (outbox, from_peer) = mpsc::unbounded_channel();
        (
            Self {
                outbound: Some(to_peer),
                inbound: from_peer,
            },
            ChannelPeer { inbox, outbox },
        )
    }
}

impl Transport for ChannelTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let sender = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        sender.send(text).map_err(|err| TransportError::Write {
            message: err.to_string(),
        })
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        self.inbound.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) {
        self.outbound = None;
        self.inbound.close();
    }
}

impl ChannelPeer {
    /// Wait for the next frame from the server. `None` once the server
    /// has closed the connection.
    pub async fn next_request(&mut self) -> Option<String> {
        self.inbox.recv().await
    }

    /// Answer the server. Returns false if the server side is gone.
    pub fn reply(&self, text: impl Into<String>) -> bool {
        self.outbox.send(text.into()).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Scripted transport (unit tests)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod scripted {
    //! A transport whose replies are fixed up front.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::{Transport, TransportError};

    /// One scripted reaction to a `recv_text` call.
    #[derive(Debug, Clone)]
    pub(crate) enum Reply {
        /// Answer with this text.
        Text(String),
        /// Never answer.
        Hang,
        /// Report the connection closed.
        Closed,
        /// Report a recoverable read failure.
        ReadError,
    }

    /// Transport replaying a fixed list of replies.
    ///
    /// Once the script runs out every read reports [`TransportError::Closed`].
    #[derive(Debug, Clone, Default)]
    pub(crate) struct Scripted {
        replies: Arc<Mutex<VecDeque<Reply>>>,
        sent: Arc<Mutex<Vec<String>>>,
        fail_writes: bool,
    }

    impl Scripted {
        pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into_iter().collect())),
                ..Self::default()
            }
        }

        pub(crate) fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub(crate) fn text(text: &str) -> Reply {
            Reply::Text(text.to_owned())
        }

        /// Every frame written so far.
        #[allow(clippy::unwrap_used)]
        pub(crate) fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for Scripted {
        #[allow(clippy::unwrap_used)]
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Write {
                    message: "broken pipe".to_owned(),
                });
            }
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        #[allow(clippy::unwrap_used)]
        async fn recv_text(&mut self) -> Result<String, TransportError> {
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Hang) => std::future::pending().await,
                Some(Reply::ReadError) => Err(TransportError::Read {
                    message: "frame decode failed".to_owned(),
                }),
                Some(Reply::Closed) | None => Err(TransportError::Closed),
            }
        }

        async fn close(&mut self) {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_pair_round_trips() {
        let (mut transport, mut peer) = ChannelTransport::pair();
        transport.send_text("ping".to_owned()).await.unwrap();
        assert_eq!(peer.next_request().await.as_deref(), Some("ping"));
        assert!(peer.reply("pong"));
        assert_eq!(transport.recv_text().await.unwrap(), "pong");
    }

    #[tokio::test]
    async fn dropped_peer_reads_as_closed() {
        let (mut transport, peer) = ChannelTransport::pair();
        drop(peer);
        assert!(matches!(
            transport.recv_text().await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn closed_transport_ends_peer_inbox() {
        let (mut transport, mut peer) = ChannelTransport::pair();
        transport.close().await;
        assert!(peer.next_request().await.is_none());
        assert!(transport.send_text("late".to_owned()).await.is_err());
    }
}
