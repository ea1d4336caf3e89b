//! Identifier types for sessions and seated agents.
//!
//! Agents are identified by their seat index for the whole session. On the
//! wire an agent is always written as its label, `Agent[NN]` (two-digit,
//! 1-based), which is also the only answer accepted to a liveness probe.
//! Sessions use UUID v7 so recorded games sort by start time.

use core::fmt;
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Prefix of the canonical agent label.
const LABEL_PREFIX: &str = "Agent[";

/// Suffix of the canonical agent label.
const LABEL_SUFFIX: &str = "]";

/// Stable seat index of an agent within one session.
///
/// Indices are 1-based, matching the labels agents see on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentIdx(pub u32);

impl AgentIdx {
    /// Create an index from a raw seat number.
    pub const fn new(idx: u32) -> Self {
        Self(idx)
    }

    /// Return the raw seat number.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The canonical wire label, e.g. `Agent[03]`.
    pub fn label(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AgentIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LABEL_PREFIX}{:02}{LABEL_SUFFIX}", self.0)
    }
}

/// Error returned when a string is not a valid agent label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid agent label: {0:?}")]
pub struct ParseAgentIdxError(pub String);

impl FromStr for AgentIdx {
    type Err = ParseAgentIdxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(LABEL_PREFIX)
            .and_then(|rest| rest.strip_suffix(LABEL_SUFFIX))
            .ok_or_else(|| ParseAgentIdxError(s.to_owned()))?;
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_parse| ParseAgentIdxError(s.to_owned()))
    }
}

impl Serialize for AgentIdx {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AgentIdx {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelVisitor;

        impl Visitor<'_> for LabelVisitor {
            type Value = AgentIdx;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an agent label such as Agent[01]")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(LabelVisitor)
    }
}

/// Unique identifier of one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub Uuid);

impl GameId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn label_is_zero_padded() {
        assert_eq!(AgentIdx::new(3).label(), "Agent[03]");
        assert_eq!(AgentIdx::new(13).label(), "Agent[13]");
    }

    #[test]
    fn label_parses_back() {
        assert_eq!("Agent[07]".parse::<AgentIdx>(), Ok(AgentIdx::new(7)));
        assert!("Agent07".parse::<AgentIdx>().is_err());
        assert!("Agent[x]".parse::<AgentIdx>().is_err());
    }

    #[test]
    fn parse_error_names_the_label() {
        let message = "Agent07".parse::<AgentIdx>().err();
        let message = message.as_ref().map(ToString::to_string);
        assert_eq!(message.as_deref(), Some(r#"invalid agent label: "Agent07""#));
    }

    #[test]
    fn serializes_as_label_even_as_map_key() {
        let mut map = BTreeMap::new();
        map.insert(AgentIdx::new(1), 2_u32);
        let json = serde_json::to_string(&map).ok();
        assert_eq!(json.as_deref(), Some(r#"{"Agent[01]":2}"#));

        let back: Result<BTreeMap<AgentIdx, u32>, _> =
            serde_json::from_str(json.as_deref().unwrap_or("{}"));
        assert_eq!(back.ok(), Some(map));
    }

    #[test]
    fn game_ids_are_unique() {
        assert_ne!(GameId::new(), GameId::new());
    }
}
