//! Routing surface
//!
//! Structured messages exchanged with the presentation layer. Both directions
//! use a `type` tag and camelCase field names.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Message from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// The display surface is ready with the given size
    Ready {
        /// Columns
        cols: u16,
        /// Rows
        rows: u16,
    },
    /// Keystrokes for a session
    Input {
        /// Target session
        session_id: SessionId,
        /// Raw input
        data: String,
    },
    /// The display surface was resized
    Resize {
        /// Target session
        session_id: SessionId,
        /// Columns
        cols: u16,
        /// Rows
        rows: u16,
    },
    /// Open a session with the configuration as-is
    NewSession,
    /// Open a session and start the configured program immediately
    NewSessionWithCommand,
    /// Close a session
    CloseSession {
        /// Target session
        session_id: SessionId,
    },
    /// Make a session active
    SwitchSession {
        /// Target session
        session_id: SessionId,
    },
    /// Activate the next session in creation order
    NextSession,
    /// Activate the previous session in creation order
    PreviousSession,
    /// Restart the active session's process
    RestartSession,
}

/// Entry of a `sessionsUpdate` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListEntry {
    /// Session id
    pub id: SessionId,
    /// Display name
    pub name: String,
    /// Whether the session is active
    pub is_active: bool,
    /// Accent color of the origin folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
}

/// Message to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    /// Terminal output for a session
    Output {
        /// Source session
        session_id: SessionId,
        /// Output text, escape sequences included
        data: String,
    },
    /// Clear a session's display
    Clear {
        /// Target session
        session_id: SessionId,
    },
    /// Full ordered session list
    SessionsUpdate {
        /// Sessions in creation order
        sessions: Vec<SessionListEntry>,
    },
    /// A session was created
    SessionCreated {
        /// Session id
        id: SessionId,
        /// Display name
        name: String,
        /// Accent color of the origin folder
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accent_color: Option<String>,
    },
    /// The active session changed
    SessionSwitched {
        /// Newly active session
        id: SessionId,
    },
    /// A session was removed
    SessionRemoved {
        /// Removed session
        id: SessionId,
    },
    /// Waiting-for-input indicator
    Notification {
        /// Session concerned
        session_id: SessionId,
        /// Show or hide the indicator
        show: bool,
    },
}

/// Sending side of the outbound stream.
///
/// Sends never fail: messages are dropped when the presentation layer is gone.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbox {
    /// Create an outbox and the receiver the bridge drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Send a message.
    pub fn send(&self, message: OutboundMessage) {
        if self.sender.send(message).is_err() {
            debug!("Outbound message dropped, no receiver");
        }
    }

    /// Send terminal output.
    pub fn output(&self, session_id: &SessionId, data: impl Into<String>) {
        self.send(OutboundMessage::Output {
            session_id: session_id.clone(),
            data: data.into(),
        });
    }

    /// Send a notification toggle.
    pub fn notify(&self, session_id: &SessionId, show: bool) {
        self.send(OutboundMessage::Notification {
            session_id: session_id.clone(),
            show,
        });
    }
}
