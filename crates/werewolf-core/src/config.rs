//! Configuration loading and typed config structures for the werewolf server.
//!
//! The canonical configuration lives in `werewolf-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, a loader that reads the file, and the derivation of the
//! per-session [`Settings`] sent to agents.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use werewolf_types::{Role, Settings};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but describe an unplayable game.
    #[error("invalid game configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
///
/// Mirrors the structure of `werewolf-config.yaml`. All fields have
/// defaults, so an empty file yields a playable 5-agent server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerConfig {
    /// Bind address and matchmaking mode.
    #[serde(default)]
    pub server: ListenConfig,

    /// Game rules.
    #[serde(default)]
    pub game: GameConfig,

    /// Per-session JSON analysis output.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Read-only HTTP API over recorded sessions.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the bind address:
    /// - `WEREWOLF_HOST` overrides `server.host`
    /// - `WEREWOLF_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.server.apply_env_overrides();
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Listening address and how rosters are formed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// When true, one team fills every seat of a session.
    #[serde(default)]
    pub self_match: bool,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            self_match: false,
        }
    }
}

impl ListenConfig {
    /// Apply `WEREWOLF_HOST` / `WEREWOLF_PORT` overrides. An unparsable
    /// port is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WEREWOLF_HOST") {
            self.host = val;
        }
        if let Some(port) = std::env::var("WEREWOLF_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.port = port;
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Game rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Seats per session.
    #[serde(default = "default_agent_count")]
    pub agent_count: u32,

    /// Show yesterday's votes to agents.
    #[serde(default)]
    pub vote_visibility: bool,

    /// Extra whisper phase on day 0.
    #[serde(default = "default_true")]
    pub talk_on_first_day: bool,

    /// Abort once errored agents exceed this share of all agents.
    #[serde(default = "default_max_continue_error_ratio")]
    pub max_continue_error_ratio: f64,

    /// Talk limits.
    #[serde(default)]
    pub talk: SpeechConfig,

    /// Whisper limits.
    #[serde(default)]
    pub whisper: SpeechConfig,

    /// Skip streak limit.
    #[serde(default)]
    pub skip: SkipConfig,

    /// Execution vote rounds.
    #[serde(default)]
    pub vote: VoteConfig,

    /// Attack vote rounds.
    #[serde(default)]
    pub attack: AttackConfig,

    /// Reply and probe timeouts.
    #[serde(default)]
    pub timeout: TimeoutConfig,

    /// Explicit role quota. When absent the built-in table for
    /// `agent_count` is used.
    #[serde(default)]
    pub roles: Option<BTreeMap<Role, u32>>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            vote_visibility: false,
            talk_on_first_day: true,
            max_continue_error_ratio: default_max_continue_error_ratio(),
            talk: SpeechConfig::default(),
            whisper: SpeechConfig::default(),
            skip: SkipConfig::default(),
            vote: VoteConfig::default(),
            attack: AttackConfig::default(),
            timeout: TimeoutConfig::default(),
            roles: None,
        }
    }
}

impl GameConfig {
    /// Derive and validate the per-session settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no quota exists for the agent
    /// count, the quota does not add up, there is no werewolf, a revote
    /// limit is zero, or the error ratio lies outside `[0, 1]`.
    pub fn to_settings(&self) -> Result<Settings, ConfigError> {
        let role_num_map = match &self.roles {
            Some(roles) => roles.clone(),
            None => default_role_quota(self.agent_count).ok_or_else(|| ConfigError::Invalid {
                reason: format!("no built-in role table for {} agents", self.agent_count),
            })?,
        };

        let settings = Settings {
            role_num_map,
            max_talk: self.talk.max_count.per_agent,
            max_talk_turn: self.talk.max_count.per_day,
            max_whisper: self.whisper.max_count.per_agent,
            max_whisper_turn: self.whisper.max_count.per_day,
            max_skip: self.skip.max_count,
            is_enable_no_attack: self.attack.allow_no_target,
            is_vote_visible: self.vote_visibility,
            is_talk_on_first_day: self.talk_on_first_day,
            response_timeout: self.timeout.response_ms,
            action_timeout: self.timeout.action_ms,
            max_revote: self.vote.max_count,
            max_attack_revote: self.attack.max_count,
            max_continue_error_ratio: self.max_continue_error_ratio,
        };
        validate_settings(&settings, self.agent_count)?;
        Ok(settings)
    }
}

/// Check the invariants every session relies on.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first violation.
pub fn validate_settings(settings: &Settings, agent_count: u32) -> Result<(), ConfigError> {
    let invalid = |reason: String| Err(ConfigError::Invalid { reason });

    if settings.agent_count() != agent_count {
        return invalid(format!(
            "role quota seats {} but agent_count is {agent_count}",
            settings.agent_count()
        ));
    }
    if settings.role_count(Role::Werewolf) == 0 {
        return invalid("role quota has no werewolf".to_owned());
    }
    if settings.max_revote == 0 || settings.max_attack_revote == 0 {
        return invalid("vote and attack max_count must be at least 1".to_owned());
    }
    if !(0.0..=1.0).contains(&settings.max_continue_error_ratio) {
        return invalid(format!(
            "max_continue_error_ratio {} is outside [0, 1]",
            settings.max_continue_error_ratio
        ));
    }
    Ok(())
}

/// Built-in role tables for the standard 5- and 13-player games.
pub fn default_role_quota(agent_count: u32) -> Option<BTreeMap<Role, u32>> {
    let table: &[(Role, u32)] = match agent_count {
        5 => &[(Role::Werewolf, 1), (Role::Seer, 1), (Role::Villager, 3)],
        13 => &[
            (Role::Werewolf, 3),
            (Role::Possessed, 1),
            (Role::Seer, 1),
            (Role::Bodyguard, 1),
            (Role::Villager, 6),
            (Role::Medium, 1),
        ],
        _ => return None,
    };
    Some(table.iter().copied().collect())
}

/// Per-agent and per-phase limits for talk or whisper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SpeechConfig {
    /// The limits.
    #[serde(default)]
    pub max_count: SpeechLimits,
}

/// Line and round limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeechLimits {
    /// Lines per agent.
    #[serde(default = "default_per_agent")]
    pub per_agent: u32,

    /// Rounds per phase.
    #[serde(default = "default_per_day")]
    pub per_day: u32,
}

impl Default for SpeechLimits {
    fn default() -> Self {
        Self {
            per_agent: default_per_agent(),
            per_day: default_per_day(),
        }
    }
}

/// Skip streak configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkipConfig {
    /// Consecutive skips turned into `Over`.
    #[serde(default = "default_max_skip")]
    pub max_count: u32,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_skip(),
        }
    }
}

/// Execution vote configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoteConfig {
    /// Vote rounds in total.
    #[serde(default = "default_revote")]
    pub max_count: u32,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            max_count: default_revote(),
        }
    }
}

/// Attack vote configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttackConfig {
    /// Attack vote rounds in total.
    #[serde(default = "default_revote")]
    pub max_count: u32,

    /// Whether an unresolved tie means nobody is attacked.
    #[serde(default = "default_true")]
    pub allow_no_target: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            max_count: default_revote(),
            allow_no_target: true,
        }
    }
}

/// Reply and probe timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeoutConfig {
    /// Milliseconds to wait for an action reply.
    #[serde(default = "default_action_ms")]
    pub action_ms: u64,

    /// Milliseconds to wait for the liveness probe answer.
    #[serde(default = "default_response_ms")]
    pub response_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            action_ms: default_action_ms(),
            response_ms: default_response_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis / API / logging
// ---------------------------------------------------------------------------

/// Per-session JSON analysis output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisConfig {
    /// Record sessions at all.
    #[serde(default)]
    pub enable: bool,

    /// Directory receiving `{game_id}.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enable: false,
            output_dir: default_output_dir(),
        }
    }
}

/// Read-only HTTP API over recorded sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Mount `/api/games` and `/api/game`.
    #[serde(default)]
    pub enable: bool,

    /// Serve sessions that are still running.
    #[serde(default)]
    pub publish_running_game: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_agent_count() -> u32 {
    5
}

const fn default_max_continue_error_ratio() -> f64 {
    0.2
}

const fn default_per_agent() -> u32 {
    5
}

const fn default_per_day() -> u32 {
    20
}

const fn default_max_skip() -> u32 {
    3
}

const fn default_revote() -> u32 {
    1
}

const fn default_action_ms() -> u64 {
    3000
}

const fn default_response_ms() -> u64 {
    6000
}

fn default_output_dir() -> String {
    "./log/game".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
