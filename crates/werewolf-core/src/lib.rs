//! Game orchestration for the werewolf server.
//!
//! This crate owns everything between a roster of connected agents and a
//! finished session: the request/response protocol with each agent, what
//! each agent may see, the day/night state machine, and the voting and
//! speech algorithms it runs.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `werewolf-config.yaml` and
//!   derivation of per-session [`Settings`].
//! - [`transport`] -- [`Transport`] trait and the in-process
//!   [`ChannelTransport`].
//! - [`link`] -- [`AgentLink`]: timeouts, liveness probe, sticky errors.
//! - [`visibility`] -- Per-viewer `Info` and packet composition.
//! - [`snapshot`] -- [`DaySnapshot`], one per day.
//! - [`resolution`] -- Votes, divination, guard, attack, win condition.
//! - [`communication`] -- Talk and whisper turn scheduler.
//! - [`roster`] -- Role dealing and team names.
//! - [`game`] -- The [`Game`] phase state machine.
//! - [`status`] -- [`SessionStatus`], shared progress of a running game.
//! - [`telemetry`] -- [`TelemetrySink`] hooks and [`NoOpSink`].
//!
//! [`Settings`]: werewolf_types::Settings
//! [`Transport`]: transport::Transport
//! [`ChannelTransport`]: transport::ChannelTransport
//! [`AgentLink`]: link::AgentLink
//! [`DaySnapshot`]: snapshot::DaySnapshot
//! [`Game`]: game::Game
//! [`SessionStatus`]: status::SessionStatus
//! [`TelemetrySink`]: telemetry::TelemetrySink
//! [`NoOpSink`]: telemetry::NoOpSink

pub mod communication;
pub mod config;
pub mod game;
pub mod link;
pub mod resolution;
pub mod roster;
pub mod snapshot;
pub mod status;
pub mod telemetry;
pub mod transport;
pub mod visibility;
