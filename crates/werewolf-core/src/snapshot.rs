//! Per-day record of everything that happened.
//!
//! One [`DaySnapshot`] exists per day index. The game appends talk lines,
//! votes and judgements to today's snapshot; at the day boundary
//! [`DaySnapshot::next_day`] carries the status map forward and starts
//! everything else empty.

use std::collections::BTreeMap;

use werewolf_types::{AgentIdx, Guard, Judge, Status, Talk, Vote};

/// Facts recorded for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySnapshot {
    /// Day index, starting at 0.
    pub day: u32,
    /// Alive/dead per seat. Entries only ever move to `Dead`.
    pub status: BTreeMap<AgentIdx, Status>,
    /// Talk transcript.
    pub talks: Vec<Talk>,
    /// Whisper transcript.
    pub whispers: Vec<Talk>,
    /// Execution votes of the final round.
    pub votes: Vec<Vote>,
    /// Attack votes of the final round.
    pub attack_votes: Vec<Vote>,
    /// Tonight's divination.
    pub divine: Option<Judge>,
    /// Tonight's medium judgement of the executed agent.
    pub medium: Option<Judge>,
    /// Agent executed tonight.
    pub executed: Option<AgentIdx>,
    /// Agent killed by tonight's attack.
    pub attacked: Option<AgentIdx>,
    /// Tonight's protection.
    pub guard: Option<Guard>,
    /// Remaining talk lines per agent.
    pub remain_talk: BTreeMap<AgentIdx, u32>,
    /// Remaining whisper lines per agent.
    pub remain_whisper: BTreeMap<AgentIdx, u32>,
}

impl DaySnapshot {
    /// Day 0 with every seat alive.
    pub fn initial(agents: impl IntoIterator<Item = AgentIdx>) -> Self {
        let status: BTreeMap<_, _> = agents.into_iter().map(|a| (a, Status::Alive)).collect();
        Self::with_status(0, status)
    }

    fn with_status(day: u32, status: BTreeMap<AgentIdx, Status>) -> Self {
        let zeroes: BTreeMap<_, _> = status.keys().map(|a| (*a, 0)).collect();
        Self {
            day,
            status,
            talks: Vec::new(),
            whispers: Vec::new(),
            votes: Vec::new(),
            attack_votes: Vec::new(),
            divine: None,
            medium: None,
            executed: None,
            attacked: None,
            guard: None,
            remain_talk: zeroes.clone(),
            remain_whisper: zeroes,
        }
    }

    /// The following day: status carried over, everything else empty.
    pub fn next_day(&self) -> Self {
        Self::with_status(self.day.saturating_add(1), self.status.clone())
    }

    /// Whether `agent` is alive today. Unknown seats count as dead.
    pub fn is_alive(&self, agent: AgentIdx) -> bool {
        self.status.get(&agent).is_some_and(|s| s.is_alive())
    }

    /// Living seats in index order.
    pub fn alive(&self) -> impl Iterator<Item = AgentIdx> + '_ {
        self.status
            .iter()
            .filter(|(_, s)| s.is_alive())
            .map(|(a, _)| *a)
    }

    /// Mark `agent` dead. Unknown seats are ignored.
    pub fn kill(&mut self, agent: AgentIdx) {
        if let Some(status) = self.status.get_mut(&agent) {
            *status = Status::Dead;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(n: u32) -> impl Iterator<Item = AgentIdx> {
        (1..=n).map(AgentIdx::new)
    }

    #[test]
    fn next_day_carries_status_only() {
        let mut today = DaySnapshot::initial(seats(3));
        today.kill(AgentIdx::new(2));
        today.executed = Some(AgentIdx::new(2));
        today.votes.push(Vote {
            day: 0,
            agent: AgentIdx::new(1),
            target: AgentIdx::new(2),
        });

        let tomorrow = today.next_day();
        assert_eq!(tomorrow.day, 1);
        assert_eq!(tomorrow.status, today.status);
        assert!(tomorrow.executed.is_none());
        assert!(tomorrow.votes.is_empty());
        assert_eq!(tomorrow.remain_talk.len(), 3);
    }

    #[test]
    fn status_is_monotonic_across_days() {
        let mut day = DaySnapshot::initial(seats(4));
        day.kill(AgentIdx::new(4));
        for _ in 0..3 {
            day = day.next_day();
            assert!(!day.is_alive(AgentIdx::new(4)));
            assert_eq!(day.status.len(), 4);
        }
        let alive: Vec<_> = day.alive().collect();
        assert_eq!(alive, vec![AgentIdx::new(1), AgentIdx::new(2), AgentIdx::new(3)]);
    }

    #[test]
    fn unknown_seat_is_neither_alive_nor_added() {
        let mut day = DaySnapshot::initial(seats(2));
        day.kill(AgentIdx::new(9));
        assert!(!day.is_alive(AgentIdx::new(9)));
        assert_eq!(day.status.len(), 2);
    }
}
