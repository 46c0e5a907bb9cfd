//! Error types for tabmux-pty

use thiserror::Error;

/// PTY error type
#[derive(Debug, Error)]
pub enum Error {
    /// Pseudo-terminal allocation failed
    #[error("failed to open pty: {0}")]
    Open(String),

    /// The child process could not be started
    #[error("failed to start {program}: {message}")]
    Spawn {
        /// Program that was being launched
        program: String,
        /// Underlying OS error text
        message: String,
    },

    /// Resizing the terminal failed
    #[error("failed to resize pty: {0}")]
    Resize(String),

    /// The process is no longer running
    #[error("process is not running")]
    NotRunning,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
