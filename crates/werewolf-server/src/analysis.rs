//! Per-session analysis records.
//!
//! [`AnalysisSink`] is installed on a game when `analysis.enable` is set.
//! It records the seated agents, one [`RequestEntry`] per exchange and the
//! winning side into the shared [`AnalysisStore`]. Once the session task
//! has played the game, [`Archive::persist`] writes the finished record to
//! `{output_dir}/{game_id}.json`. The HTTP API serves the same records from
//! the store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{info, warn};
use werewolf_core::game::{AgentSummary, GameOutcome};
use werewolf_core::telemetry::{Exchange, TelemetrySink};
use werewolf_types::{AgentIdx, GameId, Packet, Team};

/// Errors raised while writing a record to disk.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The file or its directory could not be written.
    #[error("analysis I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The record could not be encoded.
    #[error("analysis encode error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

/// One request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEntry {
    /// Label of the addressed agent.
    pub agent: String,
    /// The packet as sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// The reply, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// The failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds since the epoch when the request was sent.
    pub request_timestamp: i64,
    /// Milliseconds since the epoch when the exchange ended.
    pub response_timestamp: i64,
}

/// Everything recorded about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    /// The session.
    pub game_id: GameId,
    /// The winning team; `null` while running or after an abort.
    pub win_side: Option<Team>,
    /// Whether the session has ended.
    #[serde(skip)]
    pub finished: bool,
    /// Seated agents.
    pub agents: Vec<AgentSummary>,
    /// Exchanges in the order they finished.
    pub entries: Vec<RequestEntry>,
}

/// Records of every session seen by this server.
#[derive(Debug, Default)]
pub struct AnalysisStore {
    games: RwLock<BTreeMap<GameId, GameRecord>>,
}

impl AnalysisStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of all recorded sessions.
    pub fn ids(&self) -> Vec<GameId> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// A copy of one record.
    pub fn get(&self, id: GameId) -> Option<GameRecord> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn insert(&self, record: GameRecord) {
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.game_id, record);
    }

    fn update<R>(&self, id: GameId, f: impl FnOnce(&mut GameRecord) -> R) -> Option<R> {
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
            .map(f)
    }
}

/// Telemetry sink feeding an [`AnalysisStore`].
#[derive(Debug)]
pub struct AnalysisSink {
    store: Arc<AnalysisStore>,
    pending: BTreeMap<AgentIdx, String>,
}

impl AnalysisSink {
    /// A sink recording into `store`.
    pub const fn new(store: Arc<AnalysisStore>) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
        }
    }
}

/// A store together with the directory its finished records go to.
#[derive(Debug, Clone)]
pub struct Archive {
    store: Arc<AnalysisStore>,
    output_dir: PathBuf,
}

impl Archive {
    /// Archive records of `store` under `output_dir`.
    pub fn new(store: Arc<AnalysisStore>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
        }
    }

    /// A sink recording a new session into this archive's store.
    pub fn sink(&self) -> AnalysisSink {
        AnalysisSink::new(Arc::clone(&self.store))
    }

    /// Write the record of `game_id` to disk. Failures are logged.
    pub async fn persist(&self, game_id: GameId) {
        let Some(record) = self.store.get(game_id) else {
            warn!(%game_id, "no analysis record to write");
            return;
        };
        match write_record(&self.output_dir, &record).await {
            Ok(path) => info!(%game_id, path = %path.display(), "analysis written"),
            Err(e) => warn!(%game_id, error = %e, "analysis not written"),
        }
    }
}

impl TelemetrySink for AnalysisSink {
    fn on_session_start(&mut self, game_id: GameId, agents: &[AgentSummary]) {
        self.store.insert(GameRecord {
            game_id,
            win_side: None,
            finished: false,
            agents: agents.to_vec(),
            entries: Vec::new(),
        });
    }

    fn on_request(&mut self, game_id: GameId, agent: AgentIdx, packet: &Packet) {
        match serde_json::to_string(packet) {
            Ok(json) => {
                self.pending.insert(agent, json);
            }
            Err(e) => warn!(%game_id, %agent, error = %e, "request not recorded"),
        }
    }

    fn on_response(&mut self, game_id: GameId, exchange: &Exchange<'_>) {
        let entry = RequestEntry {
            agent: exchange.agent.label(),
            request: self.pending.remove(&exchange.agent),
            response: exchange.response.map(str::to_owned),
            error: exchange.error.map(ToString::to_string),
            request_timestamp: exchange.requested_at.timestamp_millis(),
            response_timestamp: exchange.responded_at.timestamp_millis(),
        };
        self.store.update(game_id, |record| record.entries.push(entry));
    }

    fn on_session_end(&mut self, outcome: &GameOutcome) {
        self.store.update(outcome.game_id, |record| {
            record.win_side = outcome.winner;
            record.finished = true;
        });
    }
}

/// Write `record` to `{dir}/{game_id}.json`, creating `dir` if needed.
pub async fn write_record(dir: &Path, record: &GameRecord) -> Result<PathBuf, AnalysisError> {
    let json = serde_json::to_vec(record)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", record.game_id));
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use werewolf_core::link::LinkError;
    use werewolf_types::{Request, Role};

    use super::*;

    fn agents() -> Vec<AgentSummary> {
        vec![
            AgentSummary {
                idx: AgentIdx::new(1),
                name: "alpha1".into(),
                team: "alpha".into(),
                role: Role::Werewolf,
            },
            AgentSummary {
                idx: AgentIdx::new(2),
                name: "beta1".into(),
                team: "beta".into(),
                role: Role::Seer,
            },
        ]
    }

    #[tokio::test]
    async fn records_exchanges_and_writes_the_file() {
        let dir = std::env::temp_dir().join(format!("werewolf-analysis-{}", GameId::new()));
        let store = Arc::new(AnalysisStore::new());
        let archive = Archive::new(Arc::clone(&store), &dir);
        let mut sink = archive.sink();
        let game_id = GameId::new();

        sink.on_session_start(game_id, &agents());
        assert!(!store.get(game_id).unwrap().finished);

        let now = Utc::now();
        sink.on_request(game_id, AgentIdx::new(1), &Packet::bare(Request::Name));
        sink.on_response(
            game_id,
            &Exchange {
                agent: AgentIdx::new(1),
                request: Request::Name,
                response: Some("Agent[01]"),
                error: None,
                requested_at: now,
                responded_at: now,
            },
        );
        let timeout = LinkError::Timeout {
            agent: AgentIdx::new(2),
        };
        sink.on_response(
            game_id,
            &Exchange {
                agent: AgentIdx::new(2),
                request: Request::Talk,
                response: None,
                error: Some(&timeout),
                requested_at: now,
                responded_at: now,
            },
        );

        sink.on_session_end(&GameOutcome {
            game_id,
            winner: Some(Team::Villager),
            day: 2,
            agents: agents(),
        });

        let record = store.get(game_id).unwrap();
        assert!(record.finished);
        assert!(!dir.exists());
        archive.persist(game_id).await;

        assert_eq!(record.entries.len(), 2);
        assert_eq!(record.entries[0].request.as_deref(), Some(r#"{"request":"NAME"}"#));
        assert!(record.entries[1].request.is_none());
        assert!(record.entries[1].error.is_some());

        let written = tokio::fs::read_to_string(dir.join(format!("{game_id}.json")))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(json["win_side"], "VILLAGER");
        assert_eq!(json["agents"][1]["role"], "SEER");
        assert_eq!(json["entries"][0]["response"], "Agent[01]");
        assert!(json.get("finished").is_none());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_session_is_ignored() {
        let dir = std::env::temp_dir().join(format!("werewolf-analysis-{}", GameId::new()));
        let store = Arc::new(AnalysisStore::new());
        let archive = Archive::new(Arc::clone(&store), &dir);
        let game_id = GameId::new();
        archive.sink().on_session_end(&GameOutcome {
            game_id,
            winner: None,
            day: 0,
            agents: Vec::new(),
        });
        assert!(store.ids().is_empty());

        archive.persist(game_id).await;
        assert!(!dir.exists());
    }
}
