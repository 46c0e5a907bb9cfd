//! Application configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabmux_core::{CoreConfig, DetectorConfig, TerminalSettings, WorkspaceConfig};
use tabmux_introspect::IntrospectConfig;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub terminal: TerminalSettings,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub introspect: IntrospectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// The part of the configuration the multiplexer reads.
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            terminal: self.terminal.clone(),
            workspace: self.workspace.clone(),
            detector: self.detector.clone(),
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Also write daily-rolling log files here
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// File name prefix inside `directory`
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            directory: None,
            file_name: default_file_name(),
        }
    }
}

fn default_filter() -> String {
    "tabmux=info,tabmux_core=info,tabmux_pty=info,tabmux_introspect=info".to_string()
}

fn default_file_name() -> String {
    "tabmux.log".to_string()
}
