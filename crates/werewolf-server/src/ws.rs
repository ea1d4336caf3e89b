//! `WebSocket` endpoint agents connect to.
//!
//! Clients connect to `GET /ws`. The server sends a `NAME` request, reads
//! the agent's name, parks the connection in the waiting room under the
//! name's team, and starts a session whenever a full roster is waiting.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use werewolf_core::roster::RosterEntry;
use werewolf_core::transport::{Transport, TransportError};
use werewolf_types::{Packet, Request};

use crate::session;
use crate::state::AppState;
use crate::transport::WsTransport;

/// Errors raised while greeting a new connection.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The `NAME` request could not be encoded.
    #[error("cannot encode NAME request: {source}")]
    Encode {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// The connection failed before a name arrived.
    #[error("connection failed during handshake: {source}")]
    Transport {
        /// The underlying transport error.
        #[from]
        source: TransportError,
    },

    /// No name arrived in time.
    #[error("no name received within {waited:?}")]
    Timeout {
        /// How long the server waited.
        waited: Duration,
    },

    /// The agent answered with an empty name.
    #[error("agent sent an empty name")]
    EmptyName,
}

/// Upgrade an HTTP request to an agent connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_agent(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_agent(socket, state))
}

async fn handle_agent(socket: WebSocket, state: Arc<AppState>) {
    let mut transport = WsTransport::new(socket);
    let deadline = Duration::from_millis(state.config.game.timeout.action_ms);
    let name = match handshake(&mut transport, deadline).await {
        Ok(name) => name,
        Err(e) => {
            warn!(error = %e, "handshake failed, dropping connection");
            transport.close().await;
            return;
        }
    };
    info!(%name, "agent connected");

    state.room.join(RosterEntry::new(name, transport)).await;

    let Some(roster) = state.room.take_roster().await else {
        debug!("roster not complete yet");
        return;
    };
    match session::launch(&state.config, &state.sessions, &state.analysis, roster).await {
        Ok(game_id) => info!(%game_id, "session started"),
        Err(e) => error!(error = %e, "session not started"),
    }
}

/// Ask for the agent's name and return it without trailing newlines.
///
/// The reply must arrive within `deadline`.
pub async fn handshake<T: Transport>(
    transport: &mut T,
    deadline: Duration,
) -> Result<String, HandshakeError> {
    let request = serde_json::to_string(&Packet::bare(Request::Name))?;
    transport.send_text(request).await?;
    let reply = timeout(deadline, transport.recv_text())
        .await
        .map_err(|_elapsed| HandshakeError::Timeout { waited: deadline })??;
    let name = reply.trim_end_matches(['\n', '\r']);
    if name.is_empty() {
        return Err(HandshakeError::EmptyName);
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use werewolf_core::transport::ChannelTransport;

    use super::*;

    const DEADLINE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn handshake_reads_the_name() {
        let (mut transport, mut peer) = ChannelTransport::pair();
        peer.reply("kanolab3\n".to_owned());
        let name = handshake(&mut transport, DEADLINE).await.unwrap();
        assert_eq!(name, "kanolab3");
        assert_eq!(peer.next_request().await.unwrap(), r#"{"request":"NAME"}"#);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let (mut transport, peer) = ChannelTransport::pair();
        peer.reply("\n".to_owned());
        assert!(matches!(
            handshake(&mut transport, DEADLINE).await,
            Err(HandshakeError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn vanished_peer_fails_the_handshake() {
        let (mut transport, peer) = ChannelTransport::pair();
        drop(peer);
        assert!(matches!(
            handshake(&mut transport, DEADLINE).await,
            Err(HandshakeError::Transport { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let (mut transport, mut peer) = ChannelTransport::pair();
        let result = handshake(&mut transport, DEADLINE).await;
        assert!(matches!(
            result,
            Err(HandshakeError::Timeout { waited }) if waited == DEADLINE
        ));
        assert!(peer.next_request().await.is_some());
    }
}
