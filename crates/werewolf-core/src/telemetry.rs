//! Observation hooks for a running session.
//!
//! A [`TelemetrySink`] is told when a session starts, before and after
//! every request/response exchange, and when the session ends. The game
//! behaves identically whichever sink is installed; [`NoOpSink`] is the
//! default.

use chrono::{DateTime, Utc};
use werewolf_types::{AgentIdx, GameId, Packet, Request};

use crate::game::{AgentSummary, GameOutcome};
use crate::link::LinkError;

/// One finished request/response exchange.
#[derive(Debug)]
pub struct Exchange<'a> {
    /// The addressed agent.
    pub agent: AgentIdx,
    /// The request kind.
    pub request: Request,
    /// The trimmed reply, if the exchange succeeded.
    pub response: Option<&'a str>,
    /// The failure, if it did not.
    pub error: Option<&'a LinkError>,
    /// When the request was handed to the link.
    pub requested_at: DateTime<Utc>,
    /// When the link returned.
    pub responded_at: DateTime<Utc>,
}

/// Receives session events. Called from the session task, in order.
pub trait TelemetrySink: Send {
    /// The session is about to send `INITIALIZE`.
    fn on_session_start(&mut self, game_id: GameId, agents: &[AgentSummary]);

    /// A packet is about to be sent.
    fn on_request(&mut self, game_id: GameId, agent: AgentIdx, packet: &Packet);

    /// The exchange for the last packet sent to `exchange.agent` finished.
    fn on_response(&mut self, game_id: GameId, exchange: &Exchange<'_>);

    /// All connections have been released.
    fn on_session_end(&mut self, outcome: &GameOutcome);
}

/// A sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl TelemetrySink for NoOpSink {
    fn on_session_start(&mut self, _game_id: GameId, _agents: &[AgentSummary]) {}

    fn on_request(&mut self, _game_id: GameId, _agent: AgentIdx, _packet: &Packet) {}

    fn on_response(&mut self, _game_id: GameId, _exchange: &Exchange<'_>) {}

    fn on_session_end(&mut self, _outcome: &GameOutcome) {}
}
