//! Launch planning
//!
//! Turns a [`TerminalConfig`] into the concrete program, arguments,
//! environment and optional startup keystrokes for one spawn.

use crate::config::{ExecutionMode, TerminalConfig};
use crate::env::{build_environment, resolve_shell};

/// Shells known to accept `-l` for a login shell.
const LOGIN_SHELLS: &[&str] = &["bash", "zsh", "fish", "sh", "ksh", "dash"];

/// Everything needed to start one session process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Executable to spawn
    pub program: String,
    /// Arguments for the executable
    pub args: Vec<String>,
    /// Complete child environment (the host environment is not inherited again)
    pub env: Vec<(String, String)>,
    /// Keystrokes written to the terminal right after spawn
    pub startup_input: Option<String>,
}

impl LaunchPlan {
    /// Build a plan from the host environment.
    pub fn from_config(config: &TerminalConfig) -> Self {
        Self::with_environment(config, std::env::vars(), std::env::var("SHELL").ok())
    }

    /// Build a plan from an explicit inherited environment and `$SHELL` value.
    pub fn with_environment<I>(config: &TerminalConfig, inherited: I, env_shell: Option<String>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env = build_environment(inherited, &config.env);
        let program = config.program.trim();

        if config.execution_mode == ExecutionMode::Direct && !program.is_empty() {
            return Self {
                program: program.to_string(),
                args: config.args.clone(),
                env,
                startup_input: None,
            };
        }

        let shell = resolve_shell(config.shell.as_deref(), env_shell);
        let args = if is_login_capable(&shell) {
            vec!["-l".to_string()]
        } else {
            Vec::new()
        };
        let startup_input = (!program.is_empty() && config.auto_run)
            .then(|| format!("clear && {}\r", command_line(program, &config.args)));

        Self {
            program: shell,
            args,
            env,
            startup_input,
        }
    }

    /// Human readable command line, used in log and error messages.
    pub fn display(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

fn is_login_capable(shell: &str) -> bool {
    let name = shell.rsplit('/').next().unwrap_or(shell);
    LOGIN_SHELLS.contains(&name)
}

/// Join a program and its arguments into a line a POSIX shell reads back
/// as the same argv.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a word for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
