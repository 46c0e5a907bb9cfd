//! Events flowing from PTY tasks to the session owner.

/// Event emitted by a running [`PtyHandle`](crate::PtyHandle).
///
/// `K` identifies the owning session. `generation` distinguishes processes
/// spawned for the same session across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent<K> {
    /// Bytes read from the terminal, in emission order
    Output {
        /// Owning session
        session: K,
        /// Process generation
        generation: u64,
        /// Raw bytes
        data: Vec<u8>,
    },
    /// The process exited; always the last event for a generation
    Exited {
        /// Owning session
        session: K,
        /// Process generation
        generation: u64,
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },
}

impl<K> ProcessEvent<K> {
    /// Session the event belongs to.
    pub fn session(&self) -> &K {
        match self {
            Self::Output { session, .. } | Self::Exited { session, .. } => session,
        }
    }

    /// Process generation the event belongs to.
    pub fn generation(&self) -> u64 {
        match self {
            Self::Output { generation, .. } | Self::Exited { generation, .. } => *generation,
        }
    }
}
