//! Shared type definitions for the werewolf game server.
//!
//! This crate is the single source of truth for the ruleset's vocabulary
//! and for the JSON shapes exchanged with agents. Every other crate in the
//! workspace builds on these types.
//!
//! # Modules
//!
//! - [`ids`] -- Seat indices with their `Agent[NN]` wire label, session ids
//! - [`enums`] -- Roles, teams, species, status and request kinds
//! - [`structs`] -- Votes, talk lines, judges, guards and session settings
//! - [`packet`] -- The per-viewer `Info` view and the outbound `Packet`

pub mod enums;
pub mod ids;
pub mod packet;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Request, Role, Species, Status, Team};
pub use ids::{AgentIdx, GameId, ParseAgentIdxError};
pub use packet::{Info, Packet};
pub use structs::{Guard, Judge, Settings, Talk, Vote, sentinel};
