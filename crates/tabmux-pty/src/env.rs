//! Child environment and shell resolution
//!
//! The child inherits the host environment, then configuration overrides are
//! applied, then terminal capability variables are forced. CI markers coming
//! from the host are removed first: interactive tools switch to a
//! non-interactive mode when they see them.

use std::collections::BTreeMap;

/// Variables forced on every child so tools emit color and full-screen UI.
pub const FORCED_ENV: &[(&str, &str)] = &[
    ("TERM", "xterm-256color"),
    ("COLORTERM", "truecolor"),
    ("FORCE_COLOR", "1"),
];

/// Inherited variables that signal a CI environment.
pub const CI_SIGNALS: &[&str] = &["CI", "CONTINUOUS_INTEGRATION"];

/// Fallback shell when neither an override nor `$SHELL` is available.
pub const FALLBACK_SHELL: &str = "/bin/bash";

/// Build the child environment.
///
/// `inherited` is normally `std::env::vars()`; it is a parameter so callers
/// and tests can supply a fixed set.
pub fn build_environment<I>(inherited: I, overrides: &BTreeMap<String, String>) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = inherited
        .into_iter()
        .filter(|(key, _)| !CI_SIGNALS.contains(&key.as_str()))
        .collect();

    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }

    for (key, value) in FORCED_ENV {
        env.insert((*key).to_string(), (*value).to_string());
    }

    env.into_iter().collect()
}

/// Pick the shell: explicit override, then `$SHELL`, then [`FALLBACK_SHELL`].
pub fn resolve_shell(shell_override: Option<&str>, env_shell: Option<String>) -> String {
    shell_override
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| env_shell.filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_SHELL.to_string())
}
