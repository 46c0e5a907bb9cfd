//! Controller task
//!
//! Every event that touches session state goes through one task: routing
//! messages, process output and exits, and detector timers. The
//! [`ControllerHandle`] is the only way in from the outside.

use crate::backend::ProcessBackend;
use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::multiplexer::Multiplexer;
use crate::routing::{InboundMessage, OutboundMessage, Outbox};
use crate::session::SessionId;
use crate::timers::TimerFired;
use crate::workspace::FolderPicker;
use std::sync::Arc;
use tabmux_pty::ProcessEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

enum Command {
    Message(InboundMessage),
    ApplyConfig(Box<CoreConfig>),
    Shutdown,
}

/// Cloneable handle for feeding the controller.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    /// Deliver a routing message.
    pub fn send(&self, message: InboundMessage) -> Result<()> {
        self.push(Command::Message(message))
    }

    /// Notify the controller of a configuration change.
    pub fn apply_config(&self, config: CoreConfig) -> Result<()> {
        self.push(Command::ApplyConfig(Box::new(config)))
    }

    /// Kill every session and stop the controller.
    pub fn shutdown(&self) -> Result<()> {
        self.push(Command::Shutdown)
    }

    fn push(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::ControllerStopped)
    }
}

/// Owns the multiplexer and serializes all events.
pub struct Controller {
    mux: Multiplexer,
    commands: mpsc::UnboundedReceiver<Command>,
    process_events: mpsc::UnboundedReceiver<ProcessEvent<SessionId>>,
    timer_events: mpsc::UnboundedReceiver<TimerFired<SessionId>>,
}

impl Controller {
    /// Build a controller, its handle, and the outbound message stream.
    pub fn new(
        config: CoreConfig,
        backend: Arc<dyn ProcessBackend>,
        picker: Arc<dyn FolderPicker>,
    ) -> (Self, ControllerHandle, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (outbox, outbound) = Outbox::channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (process_tx, process_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let mux = Multiplexer::new(config, backend, picker, outbox, process_tx, timer_tx);
        let controller = Self {
            mux,
            commands: command_rx,
            process_events: process_rx,
            timer_events: timer_rx,
        };
        let handle = ControllerHandle {
            commands: command_tx,
        };
        (controller, handle, outbound)
    }

    /// Run until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Controller started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Message(message)) => self.dispatch(message).await,
                    Some(Command::ApplyConfig(config)) => self.mux.apply_config(*config),
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = self.process_events.recv() => {
                    self.mux.handle_process_event(event);
                }
                Some(fired) = self.timer_events.recv() => {
                    self.mux.handle_timer(fired);
                }
            }
        }
        self.mux.dispose();
        info!("Controller stopped");
    }

    async fn dispatch(&mut self, message: InboundMessage) {
        debug!(message = ?message, "Inbound message");
        match message {
            InboundMessage::Ready { cols, rows } => {
                self.mux.set_size(cols, rows);
                if self.mux.is_empty() {
                    self.mux.new_session().await;
                } else {
                    if let Some(id) = self.mux.active_id().cloned() {
                        self.mux.resize(&id, cols, rows);
                    }
                    self.mux.publish_sessions();
                }
            }
            InboundMessage::Input { session_id, data } => {
                self.mux.write_input(&session_id, data.as_bytes());
            }
            InboundMessage::Resize {
                session_id,
                cols,
                rows,
            } => self.mux.resize(&session_id, cols, rows),
            InboundMessage::NewSession => {
                self.mux.new_session().await;
            }
            InboundMessage::NewSessionWithCommand => {
                self.mux.new_session_with_command().await;
            }
            InboundMessage::CloseSession { session_id } => {
                self.mux.close_session(&session_id).await;
            }
            InboundMessage::SwitchSession { session_id } => self.mux.switch_to(&session_id),
            InboundMessage::NextSession => self.mux.next(),
            InboundMessage::PreviousSession => self.mux.previous(),
            InboundMessage::RestartSession => self.mux.restart(),
        }
    }
}
