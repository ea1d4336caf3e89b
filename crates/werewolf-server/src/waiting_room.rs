//! Connections parked until a full roster is available.
//!
//! Connections are grouped by team name. A roster is taken in one of two
//! ways:
//!
//! - **Self-match**: one team with enough waiting connections fills every
//!   seat.
//! - **Mixed**: that many distinct teams, chosen at random, each give up
//!   their oldest connection.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::info;
use werewolf_core::roster::RosterEntry;

/// Waiting connections keyed by team.
#[derive(Debug)]
pub struct WaitingRoom<T> {
    teams: Mutex<BTreeMap<String, VecDeque<RosterEntry<T>>>>,
    seats: usize,
    self_match: bool,
}

impl<T> WaitingRoom<T> {
    /// An empty room filling rosters of `seats` connections.
    pub fn new(seats: usize, self_match: bool) -> Self {
        Self {
            teams: Mutex::new(BTreeMap::new()),
            seats,
            self_match,
        }
    }

    /// Park a connection under its team.
    pub async fn join(&self, entry: RosterEntry<T>) {
        let mut teams = self.teams.lock().await;
        info!(name = %entry.name, team = %entry.team, "agent waiting");
        teams.entry(entry.team.clone()).or_default().push_back(entry);
    }

    /// Take a full roster if one is available.
    pub async fn take_roster(&self) -> Option<Vec<RosterEntry<T>>> {
        let mut teams = self.teams.lock().await;
        pick_roster(&mut teams, self.seats, self.self_match, &mut rand::rng())
    }

    /// Number of parked connections.
    pub async fn waiting(&self) -> usize {
        self.teams.lock().await.values().map(VecDeque::len).sum()
    }
}

/// Remove and return one roster from `teams`, or leave it untouched.
pub fn pick_roster<T, R: Rng + ?Sized>(
    teams: &mut BTreeMap<String, VecDeque<RosterEntry<T>>>,
    seats: usize,
    self_match: bool,
    rng: &mut R,
) -> Option<Vec<RosterEntry<T>>> {
    let roster: Vec<RosterEntry<T>> = if self_match {
        let team = teams.iter().find(|(_, q)| q.len() >= seats)?.0.clone();
        let queue = teams.get_mut(&team)?;
        queue.drain(..seats).collect()
    } else {
        let names: Vec<String> = teams
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        if names.len() < seats {
            return None;
        }
        let chosen: Vec<String> = names.choose_multiple(rng, seats).cloned().collect();
        chosen
            .iter()
            .filter_map(|name| teams.get_mut(name).and_then(VecDeque::pop_front))
            .collect()
    };
    teams.retain(|_, q| !q.is_empty());
    Some(roster)
}
