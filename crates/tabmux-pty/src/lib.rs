//! Tabmux PTY - Process Handle Layer
//!
//! This crate spawns interactive programs attached to a pseudo-terminal and
//! exposes them as [`PtyHandle`]s:
//! - Launch: direct program invocation or an interactive shell with auto-run
//! - Environment: inherited variables merged with overrides, CI signals removed
//! - Events: ordered output chunks followed by exactly one exit event
//! - Control: write, resize and idempotent kill

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ansi;
pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod handle;
pub mod launch;

pub use config::{ExecutionMode, TerminalConfig};
pub use error::{Error, Result};
pub use event::ProcessEvent;
pub use handle::PtyHandle;
pub use launch::LaunchPlan;
