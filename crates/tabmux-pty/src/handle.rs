//! PTY-backed process handle
//!
//! Each handle runs three tasks:
//! - reader: forwards terminal output as [`ProcessEvent::Output`]
//! - writer: owns the write half, applies input and resize requests in order
//! - waiter: owns the child, reaps it or kills it on request
//!
//! The reader is the only task that emits events, so the exit event is
//! always sent after every output chunk it observed.

use crate::error::{Error, Result};
use crate::event::ProcessEvent;
use crate::launch::LaunchPlan;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// How long the reader keeps draining after the child has been reaped.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(50);

enum WriterCommand {
    Data(Vec<u8>),
    Resize { cols: u16, rows: u16 },
}

/// Handle to a child process attached to a pseudo-terminal.
///
/// Dropping the handle kills the process.
#[derive(Debug)]
pub struct PtyHandle {
    writer: mpsc::UnboundedSender<WriterCommand>,
    kill: Option<oneshot::Sender<()>>,
    alive: Arc<AtomicBool>,
    pid: Option<u32>,
    generation: u64,
    cols: u16,
    rows: u16,
}

impl PtyHandle {
    /// Spawn `plan` in a new pseudo-terminal of `cols` x `rows`.
    ///
    /// Events are tagged with `session` and `generation` and sent to
    /// `events`. Must be called from within a tokio runtime.
    pub fn spawn<K>(
        session: K,
        generation: u64,
        plan: &LaunchPlan,
        cwd: &Path,
        cols: u16,
        rows: u16,
        events: mpsc::UnboundedSender<ProcessEvent<K>>,
    ) -> Result<Self>
    where
        K: Clone + Send + 'static,
    {
        let (pty, pts) = pty_process::open().map_err(|e| Error::Open(e.to_string()))?;
        pty.resize(pty_process::Size::new(rows, cols))
            .map_err(|e| Error::Resize(e.to_string()))?;

        let mut cmd = pty_process::Command::new(&plan.program)
            .args(&plan.args)
            .env_clear()
            .current_dir(cwd);
        for (key, value) in &plan.env {
            cmd = cmd.env(key, value);
        }

        let mut child = cmd.spawn(pts).map_err(|e| Error::Spawn {
            program: plan.program.clone(),
            message: e.to_string(),
        })?;
        let pid = child.id();
        debug!(program = %plan.display(), pid = ?pid, generation, "Spawned pty process");

        let (read_half, mut write_half) = pty.into_split();
        let alive = Arc::new(AtomicBool::new(true));

        // Waiter
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (status_tx, status_rx) = oneshot::channel::<Option<i32>>();
        let waiter_alive = alive.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        debug!(error = %e, "Kill on exited process ignored");
                    }
                    child.wait().await
                }
            };
            waiter_alive.store(false, Ordering::SeqCst);
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(error = %e, "Failed to reap pty process");
                    None
                }
            };
            let _ = status_tx.send(code);
        });

        // Writer
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
        tokio::spawn(async move {
            while let Some(command) = writer_rx.recv().await {
                match command {
                    WriterCommand::Data(data) => {
                        if let Err(e) = write_half.write_all(&data).await {
                            debug!(error = %e, "PTY write failed");
                            continue;
                        }
                        let _ = write_half.flush().await;
                    }
                    WriterCommand::Resize { cols, rows } => {
                        if let Err(e) = write_half.resize(pty_process::Size::new(rows, cols)) {
                            debug!(error = %e, "PTY resize failed");
                        }
                    }
                }
            }
        });

        // Reader
        tokio::spawn(read_loop(read_half, status_rx, session, generation, events));

        let handle = Self {
            writer: writer_tx,
            kill: Some(kill_tx),
            alive,
            pid,
            generation,
            cols,
            rows,
        };

        if let Some(input) = &plan.startup_input {
            handle.write(input.as_bytes())?;
        }

        Ok(handle)
    }

    /// Queue bytes for the terminal's input.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::NotRunning);
        }
        self.writer
            .send(WriterCommand::Data(data.to_vec()))
            .map_err(|_| Error::NotRunning)
    }

    /// Resize the terminal.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.cols = cols;
        self.rows = rows;
        if !self.is_alive() {
            return Err(Error::NotRunning);
        }
        self.writer
            .send(WriterCommand::Resize { cols, rows })
            .map_err(|_| Error::NotRunning)
    }

    /// Kill the process. Calling this more than once is harmless.
    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }

    /// Whether the child has not been reaped yet.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// OS process id, if known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Generation this process was spawned for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last requested size as `(cols, rows)`.
    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn read_loop<K>(
    mut reader: pty_process::OwnedReadPty,
    mut status_rx: oneshot::Receiver<Option<i32>>,
    session: K,
    generation: u64,
    events: mpsc::UnboundedSender<ProcessEvent<K>>,
) where
    K: Clone + Send + 'static,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut early_status: Option<Option<i32>> = None;

    loop {
        tokio::select! {
            biased;
            read = reader.read(&mut buf) => match read {
                // EIO on the master means the slave side is gone
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let _ = events.send(ProcessEvent::Output {
                        session: session.clone(),
                        generation,
                        data: buf[..n].to_vec(),
                    });
                }
            },
            status = &mut status_rx, if early_status.is_none() => {
                early_status = Some(status.unwrap_or(None));
                // Background children may keep the slave open; drain what is buffered
                loop {
                    match tokio::time::timeout(DRAIN_TIMEOUT, reader.read(&mut buf)).await {
                        Ok(Ok(n)) if n > 0 => {
                            let _ = events.send(ProcessEvent::Output {
                                session: session.clone(),
                                generation,
                                data: buf[..n].to_vec(),
                            });
                        }
                        _ => break,
                    }
                }
                break;
            }
        }
    }

    let code = match early_status {
        Some(code) => code,
        None => status_rx.await.unwrap_or(None),
    };
    debug!(generation, code = ?code, "PTY process exited");
    let _ = events.send(ProcessEvent::Exited {
        session,
        generation,
        code,
    });
}
