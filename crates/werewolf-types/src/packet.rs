//! The outbound packet and the per-viewer game view it carries.
//!
//! A packet is one JSON object per request:
//!
//! ```json
//! { "request": "TALK", "info": { ... }, "talkHistory": [ ... ] }
//! ```
//!
//! Which optional parts are present depends on the request kind; the
//! builder in `werewolf-core` decides. Agents answer with a single text line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{Request, Role, Status};
use crate::ids::AgentIdx;
use crate::structs::{Judge, Settings, Talk, Vote};

/// The filtered view of the game one agent receives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Current day.
    pub day: u32,
    /// The viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentIdx>,
    /// Yesterday's medium result. Medium only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium_result: Option<Judge>,
    /// Yesterday's divination. Seer only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divine_result: Option<Judge>,
    /// Agent executed yesterday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_agent: Option<AgentIdx>,
    /// Agent killed by yesterday's attack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attacked_agent: Option<AgentIdx>,
    /// Yesterday's execution votes, when votes are visible.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vote_list: Vec<Vote>,
    /// Yesterday's attack votes, werewolves only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attack_vote_list: Vec<Vote>,
    /// Alive/dead for every seat.
    pub status_map: BTreeMap<AgentIdx, Status>,
    /// Roles the viewer is allowed to know.
    pub role_map: BTreeMap<AgentIdx, Role>,
    /// Remaining talk lines per agent.
    pub remain_talk_map: BTreeMap<AgentIdx, u32>,
    /// Remaining whisper lines per agent. Empty for non-werewolves.
    pub remain_whisper_map: BTreeMap<AgentIdx, u32>,
}

/// One message from the server to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// What the agent is asked to do.
    pub request: Request,
    /// The agent's filtered view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    /// Session settings, sent with initialize notices.
    #[serde(default, rename = "setting", skip_serializing_if = "Option::is_none")]
    pub setting: Option<Settings>,
    /// Talk lines not yet delivered to this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talk_history: Option<Vec<Talk>>,
    /// Whisper lines not yet delivered to this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whisper_history: Option<Vec<Talk>>,
}

impl Packet {
    /// A bare request with no payload, as used for the name probe.
    pub const fn bare(request: Request) -> Self {
        Self {
            request,
            info: None,
            setting: None,
            talk_history: None,
            whisper_history: None,
        }
    }
}
