//! Process backend seam
//!
//! The multiplexer never talks to a PTY directly. It spawns through a
//! [`ProcessBackend`] and controls the result through [`ProcessControl`], so
//! session logic can be exercised without real processes.

use crate::session::SessionId;
use std::path::Path;
use tabmux_pty::{LaunchPlan, ProcessEvent, PtyHandle, TerminalConfig};
use tokio::sync::mpsc;

/// Parameters for one spawn.
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest<'a> {
    /// Owning session
    pub session: &'a SessionId,
    /// Generation tag for the new process
    pub generation: u64,
    /// Launch configuration snapshot
    pub config: &'a TerminalConfig,
    /// Working directory
    pub cwd: &'a Path,
    /// Terminal width
    pub cols: u16,
    /// Terminal height
    pub rows: u16,
}

/// Control surface of a running session process.
pub trait ProcessControl: Send + std::fmt::Debug {
    /// Write bytes to the process input
    fn write(&self, data: &[u8]) -> tabmux_pty::Result<()>;
    /// Resize the terminal
    fn resize(&mut self, cols: u16, rows: u16) -> tabmux_pty::Result<()>;
    /// Kill the process; repeated calls are no-ops
    fn kill(&mut self);
    /// Whether the process has not exited yet
    fn is_alive(&self) -> bool;
}

/// Spawns session processes.
pub trait ProcessBackend: Send + Sync {
    /// Spawn a process; its events go to `events`.
    fn spawn(
        &self,
        request: SpawnRequest<'_>,
        events: mpsc::UnboundedSender<ProcessEvent<SessionId>>,
    ) -> tabmux_pty::Result<Box<dyn ProcessControl>>;
}

/// Backend spawning real pseudo-terminal processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PtyBackend;

impl ProcessBackend for PtyBackend {
    fn spawn(
        &self,
        request: SpawnRequest<'_>,
        events: mpsc::UnboundedSender<ProcessEvent<SessionId>>,
    ) -> tabmux_pty::Result<Box<dyn ProcessControl>> {
        let plan = LaunchPlan::from_config(request.config);
        let handle = PtyHandle::spawn(
            request.session.clone(),
            request.generation,
            &plan,
            request.cwd,
            request.cols,
            request.rows,
            events,
        )?;
        Ok(Box::new(handle))
    }
}

impl ProcessControl for PtyHandle {
    fn write(&self, data: &[u8]) -> tabmux_pty::Result<()> {
        PtyHandle::write(self, data)
    }

    fn resize(&mut self, cols: u16, rows: u16) -> tabmux_pty::Result<()> {
        PtyHandle::resize(self, cols, rows)
    }

    fn kill(&mut self) {
        PtyHandle::kill(self)
    }

    fn is_alive(&self) -> bool {
        PtyHandle::is_alive(self)
    }
}
