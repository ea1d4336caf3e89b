//! Game record structs: votes, utterances, judges, guards and settings.
//!
//! These are the facts a day snapshot accumulates and the shapes agents
//! receive inside a packet. Field names serialize in `camelCase`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::enums::{Role, Species};
use crate::ids::AgentIdx;

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

/// One execution or attack vote. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Day the vote was cast.
    pub day: u32,
    /// The voter.
    pub agent: AgentIdx,
    /// The agent voted for.
    pub target: AgentIdx,
}

// ---------------------------------------------------------------------------
// Talk / whisper lines
// ---------------------------------------------------------------------------

/// Sentinel texts an agent may send instead of a real utterance.
pub mod sentinel {
    /// The agent has nothing more to say today.
    pub const OVER: &str = "Over";
    /// The agent passes this round.
    pub const SKIP: &str = "Skip";
    /// Agent-side pass that is stored as [`SKIP`].
    pub const FORCE_SKIP: &str = "ForceSkip";
}

/// One talk or whisper line.
///
/// On the wire the line also carries derived `skip` and `over` flags so
/// agents need not compare sentinel strings themselves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Talk {
    /// Phase-global monotonic index of the line.
    pub idx: u32,
    /// Day the line was spoken.
    pub day: u32,
    /// Round within the phase.
    pub turn: u32,
    /// The speaker.
    pub agent: AgentIdx,
    /// The utterance, or one of the [`sentinel`] texts.
    pub text: String,
}

impl Talk {
    /// Whether the line is a pass.
    pub fn is_skip(&self) -> bool {
        self.text == sentinel::SKIP || self.text == sentinel::FORCE_SKIP
    }

    /// Whether the line ends the speaker's participation for the phase.
    pub fn is_over(&self) -> bool {
        self.text == sentinel::OVER
    }
}

#[derive(Serialize)]
struct TalkWire<'a> {
    idx: u32,
    day: u32,
    turn: u32,
    agent: AgentIdx,
    text: &'a str,
    skip: bool,
    over: bool,
}

impl Serialize for Talk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TalkWire {
            idx: self.idx,
            day: self.day,
            turn: self.turn,
            agent: self.agent,
            text: &self.text,
            skip: self.is_skip(),
            over: self.is_over(),
        }
        .serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Judge / Guard
// ---------------------------------------------------------------------------

/// A divination or medium result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judge {
    /// Day the judgement was made.
    pub day: u32,
    /// The judging agent.
    pub agent: AgentIdx,
    /// The judged agent.
    pub target: AgentIdx,
    /// The target's species.
    pub result: Species,
}

/// A bodyguard's protection for one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    /// Day the guard was set.
    pub day: u32,
    /// The guarding agent.
    pub agent: AgentIdx,
    /// The protected agent.
    pub target: AgentIdx,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-session rule parameters. Sent to every agent on `INITIALIZE`.
///
/// Timeouts are in milliseconds. The error tolerance ratio stays on the
/// server and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// How many agents play each role.
    pub role_num_map: BTreeMap<Role, u32>,
    /// Talk lines allowed per agent per day.
    pub max_talk: u32,
    /// Talk rounds per day.
    pub max_talk_turn: u32,
    /// Whisper lines allowed per werewolf per phase.
    pub max_whisper: u32,
    /// Whisper rounds per phase.
    pub max_whisper_turn: u32,
    /// Consecutive skips after which an agent is forced to `Over`.
    pub max_skip: u32,
    /// Whether a tied attack may end with nobody attacked.
    pub is_enable_no_attack: bool,
    /// Whether yesterday's votes are shown to agents.
    pub is_vote_visible: bool,
    /// Whether day 0 has an extra whisper phase.
    pub is_talk_on_first_day: bool,
    /// Liveness probe timeout in milliseconds.
    pub response_timeout: u64,
    /// Action reply timeout in milliseconds.
    pub action_timeout: u64,
    /// Execution vote rounds in total.
    pub max_revote: u32,
    /// Attack vote rounds in total.
    pub max_attack_revote: u32,
    /// Errored agents tolerated, as a share of all agents.
    #[serde(skip_serializing, default)]
    pub max_continue_error_ratio: f64,
}

impl Settings {
    /// Total number of seats implied by the role quota.
    pub fn agent_count(&self) -> u32 {
        self.role_num_map
            .values()
            .fold(0_u32, |acc, n| acc.saturating_add(*n))
    }

    /// Seats of one role.
    pub fn role_count(&self, role: Role) -> u32 {
        self.role_num_map.get(&role).copied().unwrap_or(0)
    }

    /// Action timeout as a [`Duration`].
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout)
    }

    /// Liveness probe timeout as a [`Duration`].
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(text: &str) -> Talk {
        Talk {
            idx: 4,
            day: 1,
            turn: 0,
            agent: AgentIdx::new(2),
            text: text.to_owned(),
        }
    }

    #[test]
    fn talk_carries_derived_flags() {
        let value = serde_json::to_value(line(sentinel::FORCE_SKIP)).unwrap();
        assert_eq!(value["agent"], "Agent[02]");
        assert_eq!(value["skip"], true);
        assert_eq!(value["over"], false);

        let value = serde_json::to_value(line(sentinel::OVER)).unwrap();
        assert_eq!(value["skip"], false);
        assert_eq!(value["over"], true);
    }

    #[test]
    fn talk_reads_back_ignoring_flags() {
        let json = serde_json::to_string(&line("hello")).unwrap();
        let back: Talk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line("hello"));
    }

    #[test]
    fn settings_hide_error_ratio() {
        let settings = Settings {
            role_num_map: BTreeMap::from([(Role::Werewolf, 1), (Role::Villager, 4)]),
            max_talk: 5,
            max_talk_turn: 20,
            max_whisper: 5,
            max_whisper_turn: 20,
            max_skip: 3,
            is_enable_no_attack: false,
            is_vote_visible: true,
            is_talk_on_first_day: true,
            response_timeout: 6000,
            action_timeout: 3000,
            max_revote: 1,
            max_attack_revote: 1,
            max_continue_error_ratio: 0.2,
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert!(value.get("maxContinueErrorRatio").is_none());
        assert_eq!(value["roleNumMap"]["WEREWOLF"], 1);
        assert_eq!(value["actionTimeout"], 3000);
        assert_eq!(settings.agent_count(), 5);
        assert_eq!(settings.role_count(Role::Seer), 0);
        assert_eq!(settings.action_timeout(), Duration::from_millis(3000));
    }
}
