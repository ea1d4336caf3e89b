//! Shared, lock-free view of a session's progress.
//!
//! The session task updates its [`SessionStatus`]; the HTTP layer reads it
//! to report running games without touching the game itself.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use werewolf_types::{GameId, Team};

/// Progress of one session.
#[derive(Debug)]
pub struct SessionStatus {
    id: GameId,
    day: AtomicU32,
    outcome: OnceLock<Option<Team>>,
}

impl SessionStatus {
    /// Status of a session that has not started its first day.
    pub const fn new(id: GameId) -> Self {
        Self {
            id,
            day: AtomicU32::new(0),
            outcome: OnceLock::new(),
        }
    }

    /// The session id.
    pub const fn id(&self) -> GameId {
        self.id
    }

    /// The current day.
    pub fn day(&self) -> u32 {
        self.day.load(Ordering::Relaxed)
    }

    /// Record a new current day.
    pub fn set_day(&self, day: u32) {
        self.day.store(day, Ordering::Relaxed);
    }

    /// Record the result. Only the first call has an effect.
    pub fn finish(&self, winner: Option<Team>) {
        let _ = self.outcome.set(winner);
    }

    /// Whether the session has ended.
    pub fn is_finished(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// The winning team, once the session has ended with one.
    pub fn winner(&self) -> Option<Team> {
        self.outcome.get().copied().flatten()
    }
}
