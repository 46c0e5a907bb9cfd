//! Session multiplexer
//!
//! Owns every session of one panel and arbitrates which one is active.
//! All methods run on the controller task; nothing here is shared.

use crate::backend::{ProcessBackend, SpawnRequest};
use crate::config::CoreConfig;
use crate::detector::{OutputVerdict, PromptDetector};
use crate::routing::{OutboundMessage, Outbox, SessionListEntry};
use crate::session::{Session, SessionId};
use crate::timers::{KeyedTimers, TimerFired};
use crate::workspace::{resolve_working_dir, FolderPicker};
use std::path::PathBuf;
use std::sync::Arc;
use tabmux_pty::{ProcessEvent, TerminalConfig};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Size used until the display reports its own
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Session multiplexer.
pub struct Multiplexer {
    config: CoreConfig,
    sessions: Vec<Session>,
    created: u64,
    size: (u16, u16),
    backend: Arc<dyn ProcessBackend>,
    picker: Arc<dyn FolderPicker>,
    detector: PromptDetector<SessionId>,
    timers: KeyedTimers<SessionId>,
    outbox: Outbox,
    process_events: mpsc::UnboundedSender<ProcessEvent<SessionId>>,
}

impl Multiplexer {
    /// Create an empty multiplexer.
    ///
    /// Process events are delivered to `process_events` and detector timers
    /// to `timer_events`; the owner feeds both back through
    /// [`handle_process_event`](Self::handle_process_event) and
    /// [`handle_timer`](Self::handle_timer).
    pub fn new(
        config: CoreConfig,
        backend: Arc<dyn ProcessBackend>,
        picker: Arc<dyn FolderPicker>,
        outbox: Outbox,
        process_events: mpsc::UnboundedSender<ProcessEvent<SessionId>>,
        timer_events: mpsc::UnboundedSender<TimerFired<SessionId>>,
    ) -> Self {
        Self {
            detector: PromptDetector::new(config.detector.clone()),
            config,
            sessions: Vec::new(),
            created: 0,
            size: DEFAULT_SIZE,
            backend,
            picker,
            timers: KeyedTimers::new(timer_events),
            outbox,
            process_events,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Sessions in creation order
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Look up a session
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// The active session's id
    pub fn active_id(&self) -> Option<&SessionId> {
        self.sessions.iter().find(|s| s.active).map(|s| &s.id)
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Last known display size as `(cols, rows)`
    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    /// Current configuration snapshot
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Whether the detector currently reports the session as waiting
    pub fn is_waiting(&self, id: &SessionId) -> bool {
        self.detector.is_waiting(id)
    }

    /// Ordered session list as sent in `sessionsUpdate`.
    pub fn snapshot(&self) -> Vec<SessionListEntry> {
        self.sessions
            .iter()
            .map(|s| SessionListEntry {
                id: s.id.clone(),
                name: s.name.clone(),
                is_active: s.active,
                accent_color: s.accent_color().map(str::to_string),
            })
            .collect()
    }

    /// Send the full session list.
    pub fn publish_sessions(&self) {
        self.outbox.send(OutboundMessage::SessionsUpdate {
            sessions: self.snapshot(),
        });
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Record the display size without resizing any process.
    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.size = (cols, rows);
    }

    /// Open a session with the configuration as-is.
    pub async fn new_session(&mut self) -> SessionId {
        let (cols, rows) = self.size;
        let launch = self.config.terminal.launch.clone();
        self.create_session(launch, cols, rows, None).await
    }

    /// Open a session that starts the configured program immediately.
    pub async fn new_session_with_command(&mut self) -> SessionId {
        let (cols, rows) = self.size;
        let launch = self.config.terminal.launch.clone().with_auto_run();
        self.create_session(launch, cols, rows, None).await
    }

    /// Create a session, make it active and spawn its process.
    ///
    /// Spawn failures are reported in the session's output; the session
    /// stays open until restarted or closed.
    pub async fn create_session(
        &mut self,
        launch: TerminalConfig,
        cols: u16,
        rows: u16,
        cwd: Option<PathBuf>,
    ) -> SessionId {
        self.size = (cols, rows);
        let resolved =
            resolve_working_dir(cwd, &self.config.workspace.roots, self.picker.as_ref()).await;

        self.created += 1;
        let id = SessionId::generate();
        let mut session = Session::new(
            id.clone(),
            self.created,
            resolved.path,
            resolved.origin_index,
            launch.auto_run,
        );

        for other in &mut self.sessions {
            other.active = false;
        }
        session.active = true;

        self.outbox.send(OutboundMessage::SessionCreated {
            id: id.clone(),
            name: session.name.clone(),
            accent_color: session.accent_color().map(str::to_string),
        });
        info!(
            session_id = %id,
            name = %session.name,
            cwd = %session.cwd.display(),
            "Session created"
        );

        self.sessions.push(session);
        let index = self.sessions.len() - 1;
        self.spawn_process(index, &launch);
        self.publish_sessions();
        id
    }

    /// Close a session.
    ///
    /// If it was active, the most recently created remaining session takes
    /// over; if none remain a fresh session is created.
    pub async fn close_session(&mut self, id: &SessionId) {
        let Some(index) = self.index_of(id) else {
            debug!(session_id = %id, "Close ignored for unknown session");
            return;
        };

        let mut session = self.sessions.remove(index);
        if let Some(mut process) = session.process.take() {
            process.kill();
        }
        self.timers.cancel(id);
        self.detector.forget(id);
        self.outbox.send(OutboundMessage::SessionRemoved { id: id.clone() });
        info!(session_id = %id, "Session closed");

        if session.active {
            let newest = self
                .sessions
                .iter()
                .enumerate()
                .max_by_key(|(_, s)| s.seq)
                .map(|(i, _)| i);
            match newest {
                Some(next) => {
                    self.sessions[next].active = true;
                    self.outbox.send(OutboundMessage::SessionSwitched {
                        id: self.sessions[next].id.clone(),
                    });
                }
                None => {
                    self.new_session().await;
                    return;
                }
            }
        }
        self.publish_sessions();
    }

    /// Make `id` the active session. Unknown ids are ignored.
    pub fn switch_to(&mut self, id: &SessionId) {
        let Some(index) = self.index_of(id) else {
            debug!(session_id = %id, "Switch ignored for unknown session");
            return;
        };
        if self.sessions[index].active {
            return;
        }
        for session in &mut self.sessions {
            session.active = false;
        }
        self.sessions[index].active = true;
        self.outbox
            .send(OutboundMessage::SessionSwitched { id: id.clone() });
        self.publish_sessions();
    }

    /// Activate the next session in creation order, wrapping around.
    pub fn next(&mut self) {
        self.cycle(1);
    }

    /// Activate the previous session in creation order, wrapping around.
    pub fn previous(&mut self) {
        self.cycle(-1);
    }

    fn cycle(&mut self, step: isize) {
        let len = self.sessions.len();
        if len <= 1 {
            return;
        }
        let current = self.sessions.iter().position(|s| s.active).unwrap_or(0);
        let target = (current as isize + step).rem_euclid(len as isize) as usize;
        let id = self.sessions[target].id.clone();
        self.switch_to(&id);
    }

    /// Kill the active session's process and start it again with the
    /// current configuration.
    ///
    /// The display is cleared first. The killed process's exit report is
    /// suppressed for the restart grace window.
    pub fn restart(&mut self) {
        let Some(index) = self.sessions.iter().position(|s| s.active) else {
            return;
        };
        let grace = self.config.terminal.restart_grace();
        let mut launch = self.config.terminal.launch.clone();

        let session = &mut self.sessions[index];
        let id = session.id.clone();
        if let Some(mut process) = session.process.take() {
            process.kill();
        }
        session.suppress_exit_until = Some(Instant::now() + grace);
        launch.auto_run |= session.forced_auto_run;

        self.timers.cancel(&id);
        if self.detector.reset(&id) == Some(false) {
            self.outbox.notify(&id, false);
        }
        self.outbox
            .send(OutboundMessage::Clear { session_id: id.clone() });
        info!(session_id = %id, "Restarting session");
        self.spawn_process(index, &launch);
    }

    /// Kill every process and drop all sessions.
    pub fn dispose(&mut self) {
        for session in &mut self.sessions {
            if let Some(mut process) = session.process.take() {
                process.kill();
            }
        }
        self.timers.cancel_all();
        self.detector.clear();
        self.sessions.clear();
        debug!("Multiplexer disposed");
    }

    /// Apply a configuration change.
    ///
    /// Running processes are untouched; the new settings are used from the
    /// next spawn or restart. Detector patterns are recompiled.
    pub fn apply_config(&mut self, config: CoreConfig) {
        self.detector.reconfigure(config.detector.clone());
        if !config.detector.enabled {
            self.timers.cancel_all();
        }
        self.config = config;
        debug!("Configuration applied");
    }

    // ── I/O routing ─────────────────────────────────────────────────────

    /// Forward keystrokes to a session's process.
    pub fn write_input(&mut self, id: &SessionId, data: &[u8]) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        self.timers.cancel(id);
        if self.detector.on_input(id) == Some(false) {
            self.outbox.notify(id, false);
        }
        if let Some(process) = &self.sessions[index].process {
            if let Err(e) = process.write(data) {
                debug!(session_id = %id, error = %e, "Input dropped");
            }
        }
    }

    /// Resize a session's terminal and remember the size for new sessions.
    pub fn resize(&mut self, id: &SessionId, cols: u16, rows: u16) {
        self.size = (cols, rows);
        let Some(index) = self.index_of(id) else {
            return;
        };
        if let Some(process) = &mut self.sessions[index].process {
            if let Err(e) = process.resize(cols, rows) {
                debug!(session_id = %id, error = %e, "Resize dropped");
            }
        }
    }

    /// Route a process event to the display and the detector.
    pub fn handle_process_event(&mut self, event: ProcessEvent<SessionId>) {
        match event {
            ProcessEvent::Output {
                session,
                generation,
                data,
            } => self.on_process_output(&session, generation, &data),
            ProcessEvent::Exited {
                session,
                generation,
                code,
            } => self.on_process_exit(&session, generation, code),
        }
    }

    /// A detector timer fired.
    pub fn handle_timer(&mut self, fired: TimerFired<SessionId>) {
        self.timers.clear_fired(&fired.key);
        if self.detector.on_timer(&fired.key, fired.epoch) == Some(true) {
            debug!(session_id = %fired.key, "Session waiting for input");
            self.outbox.notify(&fired.key, true);
        }
    }

    fn on_process_output(&mut self, id: &SessionId, generation: u64, data: &[u8]) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let session = &mut self.sessions[index];
        if session.generation != generation {
            debug!(session_id = %id, generation, "Dropping output from replaced process");
            return;
        }
        let text = session.decode_output(data);
        if text.is_empty() {
            return;
        }
        self.outbox.output(id, text.as_str());

        match self.detector.on_output(id, &text) {
            OutputVerdict::Arm { epoch, delay } => self.timers.arm(id.clone(), epoch, delay),
            OutputVerdict::Quiet => self.timers.cancel(id),
        }
    }

    fn on_process_exit(&mut self, id: &SessionId, generation: u64, code: Option<i32>) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        let session = &mut self.sessions[index];
        let current = session.generation == generation;
        let suppressed = session.exit_suppressed(Instant::now());

        if current {
            if let Some(rest) = session.flush_output() {
                self.outbox.output(id, rest);
            }
            self.timers.cancel(id);
            if self.detector.reset(id) == Some(false) {
                self.outbox.notify(id, false);
            }
        }

        if suppressed {
            debug!(session_id = %id, generation, "Exit report suppressed after restart");
            return;
        }
        info!(session_id = %id, generation, code = ?code, "Session process exited");
        self.outbox.output(id, exit_message(code));
    }

    fn spawn_process(&mut self, index: usize, launch: &TerminalConfig) {
        let (cols, rows) = self.size;
        let session = &mut self.sessions[index];
        session.generation += 1;

        let request = SpawnRequest {
            session: &session.id,
            generation: session.generation,
            config: launch,
            cwd: &session.cwd,
            cols,
            rows,
        };
        match self.backend.spawn(request, self.process_events.clone()) {
            Ok(process) => {
                session.process = Some(process);
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Failed to start session process");
                session.process = None;
                self.outbox.output(&session.id, format!("[{e}]\r\n"));
            }
        }
    }

    fn index_of(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| &s.id == id)
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Informational line written when a process exits.
pub fn exit_message(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("\r\n[process exited with code {code}]\r\n"),
        None => "\r\n[process terminated by signal]\r\n".to_string(),
    }
}

#[cfg(test)]
mod tests;
