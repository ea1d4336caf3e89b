//! HTTP and `WebSocket` front end for the werewolf game server.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Agent endpoint** (`/ws`): each connection is greeted with a `NAME`
//!   request and parked in the [`WaitingRoom`] until a full roster is
//!   available, then seated in a new session on its own task.
//! - **Health check** (`/health`): progress of running sessions.
//! - **Analysis API** (`/api/games`, `/api/game`): per-session records
//!   kept by the [`AnalysisSink`].
//!
//! Finished sessions are announced as [`GameFinished`] on a broadcast
//! channel; see [`AppState::subscribe`].
//!
//! [`WaitingRoom`]: waiting_room::WaitingRoom
//! [`AnalysisSink`]: analysis::AnalysisSink
//! [`GameFinished`]: session::GameFinished

pub mod analysis;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod transport;
pub mod waiting_room;
pub mod ws;

pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
