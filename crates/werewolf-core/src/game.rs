//! The phase state machine driving one session.
//!
//! A [`Game`] owns every seat's [`AgentLink`], the day snapshots and the
//! visibility filter. [`Game::run`] plays the session to the end:
//!
//! ```text
//! INITIALIZE to all
//! loop:
//!     abort if too many agents are errored
//!     Day(n):   DAILY_INITIALIZE to all, [whisper if day 0], talk
//!     Night(n): DAILY_FINISH to all, [whisper if day 0],
//!               [execution], divination, [whisper, guard, attack]
//!     next snapshot, day += 1, stop if a team has won
//! FINISH to all, close every connection
//! ```
//!
//! Bracketed steps depend on the day and settings. Requests are strictly
//! sequential; a failing agent never aborts a phase.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, warn};
use werewolf_types::{AgentIdx, GameId, Request, Role, Settings, Team};

use crate::communication::Channel;
use crate::link::{AgentLink, LinkError};
use crate::resolution::{error_limit_exceeded, win_side};
use crate::roster::Assignment;
use crate::snapshot::DaySnapshot;
use crate::status::SessionStatus;
use crate::telemetry::{Exchange, NoOpSink, TelemetrySink};
use crate::transport::Transport;
use crate::visibility::{ViewContext, VisibilityFilter};

/// Errors raised when a game cannot be created.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The dealt roles do not match the quota.
    #[error("{role} is dealt {actual} times but the quota says {expected}")]
    QuotaMismatch {
        /// The offending role.
        role: Role,
        /// Seats in the quota.
        expected: u32,
        /// Seats dealt.
        actual: u32,
    },

    /// More seats than indices can represent.
    #[error("too many agents")]
    TooManyAgents,
}

/// Public facts about one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    /// Seat index.
    pub idx: AgentIdx,
    /// Name given in the handshake.
    pub name: String,
    /// Team derived from the name.
    pub team: String,
    /// Dealt role.
    pub role: Role,
}

/// Result of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameOutcome {
    /// The session.
    pub game_id: GameId,
    /// The winning team, or `None` if the session was aborted.
    pub winner: Option<Team>,
    /// The day the session ended on.
    pub day: u32,
    /// Every seat with its role.
    pub agents: Vec<AgentSummary>,
}

/// One seated agent.
#[derive(Debug)]
pub(crate) struct Seat<T> {
    pub(crate) name: String,
    pub(crate) team: String,
    pub(crate) role: Role,
    pub(crate) link: AgentLink<T>,
}

impl<T: Transport> Seat<T> {
    pub(crate) const fn idx(&self) -> AgentIdx {
        self.link.idx()
    }
}

/// One session between a fixed roster of agents.
pub struct Game<T> {
    pub(crate) id: GameId,
    pub(crate) settings: Settings,
    pub(crate) seats: Vec<Seat<T>>,
    pub(crate) roles: BTreeMap<AgentIdx, Role>,
    pub(crate) today: DaySnapshot,
    pub(crate) history: Vec<DaySnapshot>,
    pub(crate) filter: VisibilityFilter,
    pub(crate) rng: StdRng,
    sink: Box<dyn TelemetrySink>,
    status: Arc<SessionStatus>,
}

impl<T: Transport> Game<T> {
    /// Seat the assigned roster in order, starting at `Agent[01]`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::QuotaMismatch`] if the dealt roles differ from
    /// `settings.role_num_map`.
    pub fn new(settings: Settings, assignments: Vec<Assignment<T>>) -> Result<Self, GameError> {
        let mut dealt: BTreeMap<Role, u32> = BTreeMap::new();
        for a in &assignments {
            let count = dealt.entry(a.role).or_default();
            *count = count.saturating_add(1);
        }
        for role in Role::ALL {
            let expected = settings.role_count(role);
            let actual = dealt.get(&role).copied().unwrap_or(0);
            if expected != actual {
                return Err(GameError::QuotaMismatch {
                    role,
                    expected,
                    actual,
                });
            }
        }

        let action = settings.action_timeout();
        let response = settings.response_timeout();
        let mut seats = Vec::with_capacity(assignments.len());
        for (i, a) in assignments.into_iter().enumerate() {
            let idx = u32::try_from(i)
                .ok()
                .and_then(|i| i.checked_add(1))
                .map(AgentIdx::new)
                .ok_or(GameError::TooManyAgents)?;
            seats.push(Seat {
                name: a.entry.name,
                team: a.entry.team,
                role: a.role,
                link: AgentLink::new(idx, a.entry.transport, action, response),
            });
        }

        let roles: BTreeMap<_, _> = seats.iter().map(|s| (s.idx(), s.role)).collect();
        let today = DaySnapshot::initial(roles.keys().copied());
        let id = GameId::new();

        Ok(Self {
            id,
            settings,
            seats,
            roles,
            today,
            history: Vec::new(),
            filter: VisibilityFilter::new(),
            rng: StdRng::from_os_rng(),
            sink: Box::new(NoOpSink),
            status: Arc::new(SessionStatus::new(id)),
        })
    }

    /// Install a telemetry sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a seeded RNG for speaking order, tie-breaks and the like.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The session id.
    pub const fn id(&self) -> GameId {
        self.id
    }

    /// Shared progress handle, readable while the game runs.
    pub fn status(&self) -> Arc<SessionStatus> {
        Arc::clone(&self.status)
    }

    /// Public facts about every seat.
    pub fn agents(&self) -> Vec<AgentSummary> {
        self.seats
            .iter()
            .map(|s| AgentSummary {
                idx: s.idx(),
                name: s.name.clone(),
                team: s.team.clone(),
                role: s.role,
            })
            .collect()
    }

    /// Play the session to the end and release every connection.
    pub async fn run(mut self) -> GameOutcome {
        info!(game_id = %self.id, agents = self.seats.len(), "game starting");
        let agents = self.agents();
        self.sink.on_session_start(self.id, &agents);

        self.broadcast(Request::Initialize).await;

        let winner = loop {
            if self.too_many_errors() {
                warn!(game_id = %self.id, day = self.today.day, "too many errored agents, aborting");
                break None;
            }
            self.day_phase().await;
            self.night_phase().await;
            self.advance_day();
            if let Some(team) = win_side(&self.today.status, &self.roles) {
                break Some(team);
            }
        };

        self.broadcast(Request::Finish).await;
        for seat in &mut self.seats {
            seat.link.close().await;
        }

        let outcome = GameOutcome {
            game_id: self.id,
            winner,
            day: self.today.day,
            agents,
        };
        self.status.finish(winner);
        self.sink.on_session_end(&outcome);
        info!(game_id = %self.id, day = outcome.day, winner = ?winner, "game finished");
        outcome
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn day_phase(&mut self) {
        let day = self.today.day;
        info!(game_id = %self.id, day, "day starting");
        self.broadcast(Request::DailyInitialize).await;
        if self.settings.is_talk_on_first_day && day == 0 {
            self.run_communication(Channel::Whisper).await;
        }
        self.run_communication(Channel::Talk).await;
    }

    async fn night_phase(&mut self) {
        let day = self.today.day;
        info!(game_id = %self.id, day, "night starting");
        self.broadcast(Request::DailyFinish).await;
        if self.settings.is_talk_on_first_day && day == 0 {
            self.run_communication(Channel::Whisper).await;
        }
        if day > 0 {
            self.execute().await;
        }
        self.divine().await;
        if day > 0 {
            self.run_communication(Channel::Whisper).await;
            self.guard().await;
            self.attack().await;
        }
    }

    fn advance_day(&mut self) {
        let next = self.today.next_day();
        self.history.push(std::mem::replace(&mut self.today, next));
        self.status.set_day(self.today.day);
        info!(game_id = %self.id, day = self.today.day, "day advanced");
    }

    fn too_many_errors(&self) -> bool {
        let errored = self.seats.iter().filter(|s| s.link.is_errored()).count();
        error_limit_exceeded(
            errored,
            self.seats.len(),
            self.settings.max_continue_error_ratio,
        )
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Send `request` to every seat in index order, ignoring failures.
    pub(crate) async fn broadcast(&mut self, request: Request) {
        let targets: Vec<AgentIdx> = self.roles.keys().copied().collect();
        for idx in targets {
            let _ = self.request(idx, request).await;
        }
    }

    /// Build the packet for `request`, send it to `idx`, and report the
    /// exchange to the sink.
    pub(crate) async fn request(
        &mut self,
        idx: AgentIdx,
        request: Request,
    ) -> Result<String, LinkError> {
        let ctx = ViewContext {
            roles: &self.roles,
            today: &self.today,
            yesterday: self.history.last(),
            settings: &self.settings,
        };
        let packet = self.filter.packet(request, idx, &ctx);

        let Some(seat) = self.seats.iter_mut().find(|s| s.link.idx() == idx) else {
            return Err(LinkError::Errored { agent: idx });
        };

        self.sink.on_request(self.id, idx, &packet);
        let requested_at = Utc::now();
        let result = seat.link.send(&packet).await;
        let responded_at = Utc::now();

        if let Err(error) = &result {
            warn!(game_id = %self.id, agent = %idx, %request, %error, "request failed");
        }
        self.sink.on_response(
            self.id,
            &Exchange {
                agent: idx,
                request,
                response: result.as_deref().ok(),
                error: result.as_ref().err(),
                requested_at,
                responded_at,
            },
        );
        result
    }

    /// The role dealt to `idx`.
    pub(crate) fn role_of(&self, idx: AgentIdx) -> Option<Role> {
        self.roles.get(&idx).copied()
    }

    /// Living seats whose role satisfies `filter`, in index order.
    pub(crate) fn alive_with(&self, filter: impl Fn(Role) -> bool) -> Vec<AgentIdx> {
        self.today
            .alive()
            .filter(|a| self.role_of(*a).is_some_and(&filter))
            .collect()
    }
}
