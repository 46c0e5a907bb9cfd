//! Flag model

use crate::parser::HelpFormat;
use serde::{Deserialize, Serialize};

/// One flag accepted by a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFlag {
    /// Long form including dashes (`--output`, or `-output` for single-dash tools)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    /// Short form including the dash (`-o`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    /// Help description, continuation lines joined
    #[serde(default)]
    pub description: String,
    /// Whether the flag expects a value
    #[serde(default)]
    pub takes_value: bool,
    /// Placeholder shown in the help text (`FILE`, `string`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_hint: Option<String>,
}

impl CommandFlag {
    /// De-duplication key: the long form, or the short form without one.
    pub fn key(&self) -> &str {
        self.long
            .as_deref()
            .or(self.short.as_deref())
            .unwrap_or_default()
    }

    /// Whether either form starts with `prefix`.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        [self.long.as_deref(), self.short.as_deref()]
            .into_iter()
            .flatten()
            .any(|form| form.starts_with(prefix))
    }

    /// Forms joined for display, e.g. `-o, --output <FILE>`.
    pub fn signature(&self) -> String {
        let forms: Vec<&str> = [self.short.as_deref(), self.long.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let mut signature = forms.join(", ");
        if let Some(hint) = &self.value_hint {
            signature.push_str(&format!(" <{hint}>"));
        }
        signature
    }
}

/// Result of introspecting one program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHelp {
    /// Program name
    pub program: String,
    /// Flags in help-text order, de-duplicated
    pub flags: Vec<CommandFlag>,
    /// Help argument that produced the text (`--help`, `-h`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation: Option<String>,
    /// Strategy that recognized the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<HelpFormat>,
    /// Why the flag list is empty, when it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ParsedHelp {
    /// Empty result carrying a diagnostic.
    pub fn empty(program: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flags: Vec::new(),
            invocation: None,
            format: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Whether no flags were found
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags whose long or short form starts with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<&CommandFlag> {
        self.flags
            .iter()
            .filter(|flag| flag.matches_prefix(prefix))
            .collect()
    }
}
