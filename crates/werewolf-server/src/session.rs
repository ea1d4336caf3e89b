//! Launching sessions and tracking the ones in progress.
//!
//! [`Sessions`] holds the progress handle of every running game and the
//! broadcast channel on which finished games are announced. [`launch`]
//! turns a waiting roster into a running game on its own task.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::info;
use werewolf_core::config::{ConfigError, ServerConfig};
use werewolf_core::game::{Game, GameError, GameOutcome};
use werewolf_core::roster::{RosterEntry, RosterError, assign_roles};
use werewolf_core::status::SessionStatus;
use werewolf_core::transport::Transport;
use werewolf_types::{AgentIdx, GameId, Role, Team};

use crate::analysis::{AnalysisStore, Archive};

/// Capacity of the finished-session channel.
///
/// A subscriber that falls further behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips ahead.
const BROADCAST_CAPACITY: usize = 64;

/// Errors raised while turning a roster into a game.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The configured rules are invalid.
    #[error("invalid game settings: {source}")]
    Settings {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Roles could not be dealt to the roster.
    #[error("cannot deal roles: {source}")]
    Roster {
        /// The underlying roster error.
        #[from]
        source: RosterError,
    },

    /// The game rejected the roster.
    #[error("cannot create game: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: GameError,
    },
}

/// Announcement of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameFinished {
    /// The session.
    pub game_id: GameId,
    /// The winning team, or `None` if the session was aborted.
    pub winner: Option<Team>,
    /// The day the session ended on.
    pub day: u32,
    /// Every seat's role.
    pub roles: BTreeMap<AgentIdx, Role>,
}

impl From<&GameOutcome> for GameFinished {
    fn from(outcome: &GameOutcome) -> Self {
        Self {
            game_id: outcome.game_id,
            winner: outcome.winner,
            day: outcome.day,
            roles: outcome.agents.iter().map(|a| (a.idx, a.role)).collect(),
        }
    }
}

/// Running sessions and the finished-session channel.
#[derive(Debug)]
pub struct Sessions {
    running: RwLock<BTreeMap<GameId, Arc<SessionStatus>>>,
    finished_tx: broadcast::Sender<GameFinished>,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new()
    }
}

impl Sessions {
    /// No sessions yet.
    pub fn new() -> Self {
        let (finished_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            running: RwLock::new(BTreeMap::new()),
            finished_tx,
        }
    }

    /// Receive every session that finishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GameFinished> {
        self.finished_tx.subscribe()
    }

    /// Progress handles of the running sessions, in id order.
    pub async fn running(&self) -> Vec<Arc<SessionStatus>> {
        self.running.read().await.values().cloned().collect()
    }

    /// Whether `id` is still running.
    pub async fn is_running(&self, id: GameId) -> bool {
        self.running.read().await.contains_key(&id)
    }

    /// Register `game` and play it on its own task.
    ///
    /// When the game ends its record is written to `archive`, then it is
    /// removed from the running set and announced to subscribers.
    pub async fn spawn<T: Transport + 'static>(
        this: &Arc<Self>,
        game: Game<T>,
        archive: Option<Archive>,
    ) -> GameId {
        let id = game.id();
        this.running.write().await.insert(id, game.status());

        let sessions = Arc::clone(this);
        tokio::spawn(async move {
            let outcome = game.run().await;
            if let Some(archive) = archive {
                archive.persist(outcome.game_id).await;
            }
            sessions.running.write().await.remove(&outcome.game_id);
            // Err only means nobody is subscribed.
            let receivers = sessions
                .finished_tx
                .send(GameFinished::from(&outcome))
                .unwrap_or(0);
            info!(game_id = %outcome.game_id, receivers, "session closed");
        });
        id
    }
}

/// Deal roles to `roster`, build the game and start it.
///
/// Installs an analysis sink when analysis is enabled.
pub async fn launch<T: Transport + 'static>(
    config: &ServerConfig,
    sessions: &Arc<Sessions>,
    analysis: &Arc<AnalysisStore>,
    roster: Vec<RosterEntry<T>>,
) -> Result<GameId, LaunchError> {
    let settings = config.game.to_settings()?;
    let assignments = assign_roles(roster, &settings, &mut rand::rng())?;
    let mut game = Game::new(settings, assignments)?;
    let archive = config
        .analysis
        .enable
        .then(|| Archive::new(Arc::clone(analysis), &config.analysis.output_dir));
    if let Some(archive) = &archive {
        game = game.with_sink(Box::new(archive.sink()));
    }
    for agent in game.agents() {
        info!(game_id = %game.id(), agent = %agent.idx, name = %agent.name, role = %agent.role, "seat dealt");
    }
    Ok(Sessions::spawn(sessions, game, archive).await)
}
