//! Shared application state for the game server.
//!
//! [`AppState`] ties together the configuration, the waiting room that
//! newly connected agents are parked in, the running sessions and the
//! analysis records the API serves.

use std::sync::Arc;

use tokio::sync::broadcast;
use werewolf_core::config::ServerConfig;

use crate::analysis::AnalysisStore;
use crate::session::{GameFinished, Sessions};
use crate::transport::WsTransport;
use crate::waiting_room::WaitingRoom;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState {
    /// Loaded server configuration.
    pub config: ServerConfig,
    /// Connections waiting for a roster.
    pub room: WaitingRoom<WsTransport>,
    /// Running sessions and the finished-session channel.
    pub sessions: Arc<Sessions>,
    /// Recorded sessions.
    pub analysis: Arc<AnalysisStore>,
}

impl AppState {
    /// Fresh state for `config`.
    pub fn new(config: ServerConfig) -> Self {
        let seats = usize::try_from(config.game.agent_count).unwrap_or(usize::MAX);
        let room = WaitingRoom::new(seats, config.server.self_match);
        Self {
            config,
            room,
            sessions: Arc::new(Sessions::new()),
            analysis: Arc::new(AnalysisStore::new()),
        }
    }

    /// Receive every session that finishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GameFinished> {
        self.sessions.subscribe()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
