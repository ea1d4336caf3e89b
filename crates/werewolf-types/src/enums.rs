//! Enumeration types for the werewolf ruleset and protocol.
//!
//! Every enum serializes in `SCREAMING_SNAKE_CASE`, which is the spelling
//! agents see on the wire (`"WEREWOLF"`, `"DAILY_INITIALIZE"`, ...).

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles and sides
// ---------------------------------------------------------------------------

/// The side an agent wins or loses with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    /// The village: wins when no werewolf is alive.
    Villager,
    /// The wolves and their human ally.
    Werewolf,
}

/// What a seer or medium learns when judging an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Species {
    /// Any role except the werewolf itself, including the possessed.
    Human,
    /// A werewolf.
    Werewolf,
}

/// A role assigned at session start. Never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Whispers with the pack at night and votes on whom to attack.
    Werewolf,
    /// A human siding with the werewolves. Judged as human.
    Possessed,
    /// Divines one agent's species each night.
    Seer,
    /// Protects one agent from the night attack.
    Bodyguard,
    /// No special ability.
    Villager,
    /// Learns the species of each executed agent.
    Medium,
}

impl Role {
    /// All roles in table order.
    pub const ALL: [Self; 6] = [
        Self::Werewolf,
        Self::Possessed,
        Self::Seer,
        Self::Bodyguard,
        Self::Villager,
        Self::Medium,
    ];

    /// The side this role plays for.
    pub const fn team(self) -> Team {
        match self {
            Self::Werewolf | Self::Possessed => Team::Werewolf,
            Self::Seer | Self::Bodyguard | Self::Villager | Self::Medium => Team::Villager,
        }
    }

    /// The species a judge reports for this role.
    pub const fn species(self) -> Species {
        match self {
            Self::Werewolf => Species::Werewolf,
            Self::Possessed | Self::Seer | Self::Bodyguard | Self::Villager | Self::Medium => {
                Species::Human
            }
        }
    }

    /// Whether this role belongs to the pack (whispers, attacks).
    pub const fn is_werewolf(self) -> bool {
        matches!(self, Self::Werewolf)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Werewolf => "WEREWOLF",
            Self::Possessed => "POSSESSED",
            Self::Seer => "SEER",
            Self::Bodyguard => "BODYGUARD",
            Self::Villager => "VILLAGER",
            Self::Medium => "MEDIUM",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Alive or dead. Only ever moves from `Alive` to `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Still in the game.
    Alive,
    /// Executed or attacked.
    Dead,
}

impl Status {
    /// Shorthand for `self == Status::Alive`.
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The kind of packet the server sends to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Ask for the agent's name. Doubles as the liveness probe.
    Name,
    /// Ask for one talk utterance.
    Talk,
    /// Ask a werewolf for one whisper utterance.
    Whisper,
    /// Ask for an execution vote target.
    Vote,
    /// Ask the seer whom to divine.
    Divine,
    /// Ask the bodyguard whom to protect.
    Guard,
    /// Ask a werewolf whom to attack.
    Attack,
    /// Session start notice with the agent's role and settings.
    Initialize,
    /// Start-of-day notice.
    DailyInitialize,
    /// End-of-day notice.
    DailyFinish,
    /// Session end notice with the full role reveal.
    Finish,
}

impl Request {
    /// Whether the agent must answer this request with a text line.
    pub const fn requires_response(self) -> bool {
        match self {
            Self::Name
            | Self::Talk
            | Self::Whisper
            | Self::Vote
            | Self::Divine
            | Self::Guard
            | Self::Attack => true,
            Self::Initialize | Self::DailyInitialize | Self::DailyFinish | Self::Finish => false,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name => "NAME",
            Self::Talk => "TALK",
            Self::Whisper => "WHISPER",
            Self::Vote => "VOTE",
            Self::Divine => "DIVINE",
            Self::Guard => "GUARD",
            Self::Attack => "ATTACK",
            Self::Initialize => "INITIALIZE",
            Self::DailyInitialize => "DAILY_INITIALIZE",
            Self::DailyFinish => "DAILY_FINISH",
            Self::Finish => "FINISH",
        };
        f.write_str(s)
    }
}
