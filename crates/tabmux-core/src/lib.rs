//! Tabmux Core - Session Multiplexing
//!
//! This crate owns the sessions of one host panel:
//! - Multiplexer: create, close, switch, cycle and restart sessions
//! - Detector: decide from output and timing whether a session waits on input
//! - Routing: inbound and outbound messages exchanged with the presentation layer
//! - Controller: a single task that serializes every event touching session state
//! - Workspace: working-directory resolution across workspace roots

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod multiplexer;
pub mod routing;
pub mod session;
pub mod timers;
pub mod workspace;

pub use backend::{ProcessBackend, ProcessControl, PtyBackend, SpawnRequest};
pub use config::{CoreConfig, DetectorConfig, TerminalSettings, WorkspaceConfig};
pub use controller::{Controller, ControllerHandle};
pub use detector::{OutputVerdict, PromptDetector};
pub use error::{Error, Result};
pub use multiplexer::Multiplexer;
pub use routing::{InboundMessage, OutboundMessage, Outbox, SessionListEntry};
pub use session::{Session, SessionId};
pub use workspace::{FirstRootPicker, FolderPicker};
