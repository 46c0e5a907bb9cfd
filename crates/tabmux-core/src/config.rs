//! Core configuration
//!
//! Plain serde structs with defaults. Loading files and environment variables
//! is the binary's job; the multiplexer only receives snapshots.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tabmux_pty::TerminalConfig;

/// Default restart grace window
pub const DEFAULT_RESTART_GRACE_MS: u64 = 1000;
/// Default delay before a matched prompt is reported
pub const DEFAULT_DETECTOR_DELAY_MS: u64 = 300;
/// Default size of the stripped output tail
pub const DEFAULT_TAIL_CHARS: usize = 2048;

/// `[terminal]` section: launch settings plus session-level timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Launch configuration handed to the process layer
    #[serde(flatten)]
    pub launch: TerminalConfig,
    /// Window after a restart during which exit reports are suppressed
    #[serde(default = "default_restart_grace_ms")]
    pub restart_grace_ms: u64,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            launch: TerminalConfig::default(),
            restart_grace_ms: DEFAULT_RESTART_GRACE_MS,
        }
    }
}

impl TerminalSettings {
    /// Restart grace window as a duration.
    pub fn restart_grace(&self) -> Duration {
        Duration::from_millis(self.restart_grace_ms)
    }
}

/// `[workspace]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace root folders, in display order
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

/// `[detector]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Disable to never report waiting sessions
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Quiet period after a matching chunk before reporting
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Characters of stripped output kept per session
    #[serde(default = "default_tail_chars")]
    pub tail_chars: usize,
    /// Extra regular expressions, matched like the built-in set
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_DETECTOR_DELAY_MS,
            tail_chars: DEFAULT_TAIL_CHARS,
            patterns: Vec::new(),
        }
    }
}

impl DetectorConfig {
    /// Show delay as a duration.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Everything the multiplexer reads from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Terminal launch settings
    #[serde(default)]
    pub terminal: TerminalSettings,
    /// Workspace roots
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// Prompt-wait detection
    #[serde(default)]
    pub detector: DetectorConfig,
}

fn default_true() -> bool {
    true
}

fn default_restart_grace_ms() -> u64 {
    DEFAULT_RESTART_GRACE_MS
}

fn default_delay_ms() -> u64 {
    DEFAULT_DETECTOR_DELAY_MS
}

fn default_tail_chars() -> usize {
    DEFAULT_TAIL_CHARS
}
