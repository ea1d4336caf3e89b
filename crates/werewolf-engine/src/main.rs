//! Werewolf game server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `werewolf-config.yaml` (or defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the game rules
//! 4. Start the HTTP + `WebSocket` server and serve until terminated
//!
//! The config path can be overridden with `WEREWOLF_CONFIG`.

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use werewolf_core::config::{LoggingConfig, ServerConfig};
use werewolf_server::AppState;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG: &str = "werewolf-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, loaded_from) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("werewolf-engine starting");
    match loaded_from {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Validate the game rules before accepting any agent.
    let settings = config
        .game
        .to_settings()
        .map_err(|source| EngineError::Settings { source })?;
    info!(
        agent_count = settings.agent_count(),
        roles = ?settings.role_num_map,
        action_timeout_ms = settings.action_timeout,
        response_timeout_ms = settings.response_timeout,
        analysis = config.analysis.enable,
        "Game settings validated"
    );

    // 4. Serve.
    let state = Arc::new(AppState::new(config));
    spawn_outcome_logger(&state);
    werewolf_server::start_server(state).await?;
    Ok(())
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load `WEREWOLF_CONFIG` or `werewolf-config.yaml` if present, else
/// defaults. Returns the path the configuration came from.
fn load_config() -> Result<(ServerConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os("WEREWOLF_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    if path.exists() {
        let config = ServerConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = ServerConfig::default();
        config.server.apply_env_overrides();
        Ok((config, None))
    }
}

/// Log every finished session as it is announced.
fn spawn_outcome_logger(state: &AppState) {
    let mut finished = state.subscribe();
    tokio::spawn(async move {
        loop {
            match finished.recv().await {
                Ok(done) => info!(
                    game_id = %done.game_id,
                    winner = ?done.winner,
                    day = done.day,
                    roles = ?done.roles,
                    "Session finished"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Outcome logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    });
}
