//! Terminal launch configuration
//!
//! A [`TerminalConfig`] is read once per spawn. Editing it later only affects
//! the next spawn or restart, never a process that is already running.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the configured program is started inside the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Spawn the program itself as the terminal's child process
    #[default]
    Direct,
    /// Spawn an interactive shell and optionally type the command into it
    Shell,
}

/// Snapshot of the settings used to launch one session process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Program to run (empty means "just open a shell")
    #[serde(default)]
    pub program: String,
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
    /// In shell mode, type the program command line once the shell starts
    #[serde(default = "default_true")]
    pub auto_run: bool,
    /// Shell to use instead of `$SHELL`
    #[serde(default)]
    pub shell: Option<String>,
    /// Extra environment variables for the child
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Direct program invocation or shell wrapping
    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

fn default_true() -> bool {
    true
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            auto_run: true,
            shell: None,
            env: BTreeMap::new(),
            execution_mode: ExecutionMode::default(),
        }
    }
}

impl TerminalConfig {
    /// Create a config that runs `program` directly.
    pub fn direct(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Default::default()
        }
    }

    /// Create a config that opens a shell and types `program` into it.
    pub fn shell(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            execution_mode: ExecutionMode::Shell,
            ..Default::default()
        }
    }

    /// Returns a copy with `auto_run` forced on.
    #[must_use]
    pub fn with_auto_run(mut self) -> Self {
        self.auto_run = true;
        self
    }
}
