//! Votes, targeted abilities, and the end-of-game checks.
//!
//! # Plurality with revote
//!
//! Execution and attack both collect one target per eligible voter, tally,
//! and take the agents with the most votes as candidates. A single
//! candidate wins. Otherwise voting repeats, up to the configured number of
//! rounds in total. A tie that survives every round is broken at random
//! for execution; for an attack it is broken at random only when a night
//! without an attack is not allowed.
//!
//! # Target replies
//!
//! Replies are trimmed and matched against the canonical `Agent[NN]` label
//! first, then against the agents' handshake names. Unknown, dead, self
//! and (for attacks) werewolf targets are ignored and logged, never errors.
//!
//! # End of game
//!
//! No living werewolf means the village wins. Otherwise, as soon as living
//! humans no longer outnumber living werewolves, the werewolves win.

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};
use werewolf_types::{AgentIdx, Guard, Judge, Request, Role, Species, Status, Team, Vote};

use crate::game::Game;
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Pure algorithms
// ---------------------------------------------------------------------------

/// Agents sharing the highest vote count, in index order. Empty if there
/// are no votes.
pub fn tally(votes: &[Vote]) -> Vec<AgentIdx> {
    let mut counts: BTreeMap<AgentIdx, u32> = BTreeMap::new();
    for vote in votes {
        let count = counts.entry(vote.target).or_default();
        *count = count.saturating_add(1);
    }
    let Some(max) = counts.values().copied().max() else {
        return Vec::new();
    };
    counts
        .into_iter()
        .filter(|(_, n)| *n == max)
        .map(|(a, _)| a)
        .collect()
}

/// Whether an attack on `attacked` lands given tonight's guard.
///
/// The attack fails only if the guard protects `attacked` and the guarding
/// agent is still alive.
pub fn attack_lands(
    attacked: AgentIdx,
    guard: Option<&Guard>,
    status: &BTreeMap<AgentIdx, Status>,
) -> bool {
    guard.is_none_or(|g| {
        let guard_alive = status.get(&g.agent).is_some_and(|s| s.is_alive());
        g.target != attacked || !guard_alive
    })
}

/// The winning team, if any.
pub fn win_side(status: &BTreeMap<AgentIdx, Status>, roles: &BTreeMap<AgentIdx, Role>) -> Option<Team> {
    let (mut humans, mut wolves) = (0_u32, 0_u32);
    for (agent, state) in status {
        if !state.is_alive() {
            continue;
        }
        match roles.get(agent).map(|r| r.species()) {
            Some(Species::Werewolf) => wolves = wolves.saturating_add(1),
            Some(Species::Human) => humans = humans.saturating_add(1),
            None => {}
        }
    }
    if wolves == 0 {
        Some(Team::Villager)
    } else if humans <= wolves {
        Some(Team::Werewolf)
    } else {
        None
    }
}

/// Whether `errored` agents out of `total` exceed the tolerated share.
pub fn error_limit_exceeded(errored: usize, total: usize, ratio: f64) -> bool {
    let (Ok(errored), Ok(total)) = (u32::try_from(errored), u32::try_from(total)) else {
        return true;
    };
    f64::from(errored) > ratio * f64::from(total)
}

/// Resolve a reply to a seat: the `Agent[NN]` label first, then a
/// handshake name. Surrounding spaces and line breaks are ignored.
pub fn resolve_target<'a>(
    reply: &str,
    seats: impl IntoIterator<Item = (AgentIdx, &'a str)>,
) -> Option<AgentIdx> {
    let wanted = reply.trim_matches([' ', '\r', '\n']);
    let seats: Vec<(AgentIdx, &str)> = seats.into_iter().collect();
    if let Ok(idx) = wanted.parse::<AgentIdx>()
        && seats.iter().any(|(a, _)| *a == idx)
    {
        return Some(idx);
    }
    seats
        .iter()
        .find(|(_, name)| *name == wanted)
        .map(|(a, _)| *a)
}

// ---------------------------------------------------------------------------
// Phase actions
// ---------------------------------------------------------------------------

impl<T: Transport> Game<T> {
    /// Ask `agent` for a target and resolve the reply. Failures and
    /// unknown names yield `None`.
    async fn ask_target(&mut self, agent: AgentIdx, request: Request) -> Option<AgentIdx> {
        let reply = self.request(agent, request).await.ok()?;
        let target = resolve_target(
            &reply,
            self.seats.iter().map(|s| (s.idx(), s.name.as_str())),
        );
        if target.is_none() {
            info!(game_id = %self.id, %agent, %request, reply = %reply, "unresolvable target");
        }
        target
    }

    /// One round of votes. Ineligible targets are dropped.
    async fn collect_votes(&mut self, request: Request, voters: &[AgentIdx]) -> Vec<Vote> {
        let mut votes = Vec::with_capacity(voters.len());
        for &voter in voters {
            let Some(target) = self.ask_target(voter, request).await else {
                continue;
            };
            if !self.today.is_alive(target) {
                info!(game_id = %self.id, agent = %voter, %target, "vote for dead agent ignored");
                continue;
            }
            if target == voter {
                info!(game_id = %self.id, agent = %voter, "self vote ignored");
                continue;
            }
            if request == Request::Attack && self.role_of(target).is_some_and(Role::is_werewolf) {
                info!(game_id = %self.id, agent = %voter, %target, "attack on werewolf ignored");
                continue;
            }
            debug!(game_id = %self.id, agent = %voter, %target, %request, "vote recorded");
            votes.push(Vote {
                day: self.today.day,
                agent: voter,
                target,
            });
        }
        votes
    }

    /// Vote for up to `rounds` rounds. Returns the single winner, or the
    /// candidates still tied after the last round.
    async fn plurality(&mut self, request: Request, voters: &[AgentIdx], rounds: u32) -> Result<AgentIdx, Vec<AgentIdx>> {
        let mut candidates = Vec::new();
        for round in 0..rounds {
            let votes = self.collect_votes(request, voters).await;
            candidates = tally(&votes);
            if request == Request::Attack {
                self.today.attack_votes = votes;
            } else {
                self.today.votes = votes;
            }
            if let [winner] = candidates.as_slice() {
                return Ok(*winner);
            }
            info!(game_id = %self.id, %request, round, tied = candidates.len(), "no majority");
        }
        Err(candidates)
    }

    /// Execution by vote of every living agent.
    pub(crate) async fn execute(&mut self) {
        let voters: Vec<AgentIdx> = self.today.alive().collect();
        let executed = match self.plurality(Request::Vote, &voters, self.settings.max_revote).await {
            Ok(winner) => Some(winner),
            Err(tied) => tied.choose(&mut self.rng).copied(),
        };
        let Some(executed) = executed else {
            warn!(game_id = %self.id, day = self.today.day, "no votes, nobody executed");
            return;
        };
        let Some(species) = self.role_of(executed).map(Role::species) else {
            return;
        };

        self.today.kill(executed);
        self.today.executed = Some(executed);

        let medium = self
            .roles
            .iter()
            .find(|(_, r)| **r == Role::Medium)
            .map_or(executed, |(a, _)| *a);
        self.today.medium = Some(Judge {
            day: self.today.day,
            agent: medium,
            target: executed,
            result: species,
        });
        info!(game_id = %self.id, day = self.today.day, agent = %executed, ?species, "executed");
    }

    /// Divination by the first living seer.
    pub(crate) async fn divine(&mut self) {
        let Some(seer) = self.alive_with(|r| r == Role::Seer).first().copied() else {
            return;
        };
        let Some(target) = self.ask_target(seer, Request::Divine).await else {
            return;
        };
        if !self.today.is_alive(target) || target == seer {
            info!(game_id = %self.id, agent = %seer, %target, "divination target rejected");
            return;
        }
        let Some(result) = self.role_of(target).map(Role::species) else {
            return;
        };
        self.today.divine = Some(Judge {
            day: self.today.day,
            agent: seer,
            target,
            result,
        });
        info!(game_id = %self.id, agent = %seer, %target, ?result, "divined");
    }

    /// Protection by the first living bodyguard.
    pub(crate) async fn guard(&mut self) {
        let Some(bodyguard) = self.alive_with(|r| r == Role::Bodyguard).first().copied() else {
            return;
        };
        let Some(target) = self.ask_target(bodyguard, Request::Guard).await else {
            return;
        };
        if !self.today.is_alive(target) || target == bodyguard {
            info!(game_id = %self.id, agent = %bodyguard, %target, "guard target rejected");
            return;
        }
        self.today.guard = Some(Guard {
            day: self.today.day,
            agent: bodyguard,
            target,
        });
        info!(game_id = %self.id, agent = %bodyguard, %target, "guard set");
    }

    /// Attack by vote of the living werewolves.
    pub(crate) async fn attack(&mut self) {
        let wolves = self.alive_with(Role::is_werewolf);
        if wolves.is_empty() {
            return;
        }
        let attacked = match self
            .plurality(Request::Attack, &wolves, self.settings.max_attack_revote)
            .await
        {
            Ok(target) => Some(target),
            Err(_) if self.settings.is_enable_no_attack => None,
            Err(tied) => tied.choose(&mut self.rng).copied(),
        };
        let Some(attacked) = attacked else {
            info!(game_id = %self.id, day = self.today.day, "no attack tonight");
            return;
        };
        if attack_lands(attacked, self.today.guard.as_ref(), &self.today.status) {
            self.today.kill(attacked);
            self.today.attacked = Some(attacked);
            info!(game_id = %self.id, day = self.today.day, agent = %attacked, "attacked");
        } else {
            info!(game_id = %self.id, day = self.today.day, agent = %attacked, "attack blocked by guard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(agent: u32, target: u32) -> Vote {
        Vote {
            day: 1,
            agent: AgentIdx::new(agent),
            target: AgentIdx::new(target),
        }
    }

    fn board(seats: &[(u32, Role, Status)]) -> (BTreeMap<AgentIdx, Status>, BTreeMap<AgentIdx, Role>) {
        let status = seats.iter().map(|(i, _, s)| (AgentIdx::new(*i), *s)).collect();
        let roles = seats.iter().map(|(i, r, _)| (AgentIdx::new(*i), *r)).collect();
        (status, roles)
    }

    #[test]
    fn tally_picks_plurality() {
        let votes = [vote(1, 3), vote(2, 3), vote(3, 1)];
        assert_eq!(tally(&votes), vec![AgentIdx::new(3)]);
    }

    #[test]
    fn tally_reports_every_tied_candidate() {
        let votes = [vote(1, 2), vote(2, 1), vote(3, 4), vote(4, 3)];
        assert_eq!(tally(&votes).len(), 4);
        assert!(tally(&[]).is_empty());
    }

    #[test]
    fn guard_nullifies_attack_only_while_guard_lives() {
        let guard = Guard {
            day: 1,
            agent: AgentIdx::new(1),
            target: AgentIdx::new(2),
        };
        let (mut status, _) = board(&[
            (1, Role::Bodyguard, Status::Alive),
            (2, Role::Villager, Status::Alive),
            (3, Role::Villager, Status::Alive),
        ]);
        assert!(!attack_lands(AgentIdx::new(2), Some(&guard), &status));
        assert!(attack_lands(AgentIdx::new(3), Some(&guard), &status));
        assert!(attack_lands(AgentIdx::new(2), None, &status));

        status.insert(AgentIdx::new(1), Status::Dead);
        assert!(attack_lands(AgentIdx::new(2), Some(&guard), &status));
    }

    #[test]
    fn win_boundaries() {
        use Role::{Possessed, Villager, Werewolf};
        use Status::{Alive, Dead};

        // 0 humans, 1 wolf
        let (s, r) = board(&[(1, Werewolf, Alive), (2, Villager, Dead)]);
        assert_eq!(win_side(&s, &r), Some(Team::Werewolf));

        // 2 humans (one possessed), 2 wolves
        let (s, r) = board(&[
            (1, Werewolf, Alive),
            (2, Werewolf, Alive),
            (3, Possessed, Alive),
            (4, Villager, Alive),
        ]);
        assert_eq!(win_side(&s, &r), Some(Team::Werewolf));

        // 3 humans, 0 wolves
        let (s, r) = board(&[
            (1, Werewolf, Dead),
            (2, Villager, Alive),
            (3, Villager, Alive),
            (4, Villager, Alive),
        ]);
        assert_eq!(win_side(&s, &r), Some(Team::Villager));

        // 3 humans, 1 wolf
        let (s, r) = board(&[
            (1, Werewolf, Alive),
            (2, Villager, Alive),
            (3, Villager, Alive),
            (4, Villager, Alive),
        ]);
        assert_eq!(win_side(&s, &r), None);
    }

    #[test]
    fn error_limit_is_strict() {
        assert!(!error_limit_exceeded(1, 5, 0.2));
        assert!(error_limit_exceeded(2, 5, 0.2));
        assert!(error_limit_exceeded(1, 5, 0.0));
        assert!(!error_limit_exceeded(0, 5, 0.0));
        assert!(!error_limit_exceeded(5, 5, 1.0));
    }

    #[test]
    fn targets_resolve_by_label_then_name() {
        let seats = [
            (AgentIdx::new(1), "alpha1"),
            (AgentIdx::new(2), "beta1"),
        ];
        assert_eq!(resolve_target("Agent[02]\r\n", seats), Some(AgentIdx::new(2)));
        assert_eq!(resolve_target("  alpha1 ", seats), Some(AgentIdx::new(1)));
        assert_eq!(resolve_target("Agent[09]", seats), None);
        assert_eq!(resolve_target("gamma", seats), None);
        assert_eq!(resolve_target("", seats), None);
    }
}
