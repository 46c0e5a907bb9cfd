//! Error types for tabmux-introspect

use thiserror::Error;

/// Introspection error type
#[derive(Debug, Error)]
pub enum Error {
    /// Program name rejected before probing
    #[error("invalid program name: {0:?}")]
    InvalidProgram(String),

    /// The help probe could not be started
    #[error("failed to run {program}: {message}")]
    Spawn {
        /// Program being probed
        program: String,
        /// Underlying OS error text
        message: String,
    },

    /// The help probe did not finish in time
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
