//! Error types for tabmux-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Process handle error
    #[error("pty error: {0}")]
    Pty(#[from] tabmux_pty::Error),

    /// No session with the given id
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The controller task is gone
    #[error("controller stopped")]
    ControllerStopped,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
