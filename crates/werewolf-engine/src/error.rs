//! Error types for the server binary.
//!
//! [`EngineError`] wraps every failure mode of startup and serving so
//! `main` can propagate with `?`.

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: werewolf_core::config::ConfigError,
    },

    /// The game rules in the configuration are invalid.
    #[error("invalid game settings: {source}")]
    Settings {
        /// The underlying validation error.
        source: werewolf_core::config::ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: werewolf_server::ServerError,
    },
}
