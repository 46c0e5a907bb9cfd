//! Prompt-wait detection
//!
//! A per-session classifier deciding, from output text and timing alone,
//! whether a process is blocked on human input.
//!
//! ```text
//!            matching output            timer(epoch) still current
//!   Idle ─────────────────────▶ armed ─────────────────────────────▶ Waiting
//!    ▲                            │ newer output / keystroke            │
//!    └────────────────────────────┴─────────────────────────────────────┘
//!                                        keystroke / exit
//! ```
//!
//! The detector holds no timers itself. [`PromptDetector::on_output`] returns
//! an [`OutputVerdict::Arm`] carrying an epoch; the caller schedules a timer
//! and hands the epoch back to [`PromptDetector::on_timer`]. Any later event
//! bumps the epoch, so stale timers are ignored even if they were not aborted.

use crate::config::DetectorConfig;
use regex::Regex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tabmux_pty::ansi::strip_escapes;
use tokio::time::Instant;
use tracing::warn;

/// Non-blank lines of the tail that patterns are matched against.
const WINDOW_LINES: usize = 5;

/// Built-in prompt patterns.
const BUILTIN_PATTERNS: &[&str] = &[
    // yes/no prompts
    r"(?i)\[y/n\]|\(y/n\)|\[yes/no\]|\(yes/no\)",
    // confirmation questions
    r"(?i)\bdo you want to\b|\bare you sure\b|\b(?:continue|proceed|allow|approve|overwrite|confirm)\s*\?",
    // interactive menus
    r"(?mi)^[\s❯›>]*1\.\s*(?:yes|allow|no)\b",
    r"(?m)^\s*[❯›]\s+\S",
    // REPL-style prompts on their own line
    r"(?m)^\s*(?:>>>|❯|›|>)\s*$",
    // tool hint phrases
    r"(?i)press (?:enter|return|any key)|enter to (?:confirm|select|continue)|esc to cancel",
];

/// What the caller should do after an output chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputVerdict {
    /// Nothing to schedule
    Quiet,
    /// Schedule [`PromptDetector::on_timer`] with `epoch` after `delay`
    Arm {
        /// Epoch the timer must carry
        epoch: u64,
        /// Quiet period to wait
        delay: Duration,
    },
}

#[derive(Debug, Default)]
struct DetectorState {
    tail: String,
    epoch: u64,
    armed: bool,
    waiting: bool,
    last_output: Option<Instant>,
}

/// Per-session prompt-wait state machines.
#[derive(Debug)]
pub struct PromptDetector<K> {
    settings: DetectorConfig,
    patterns: Vec<Regex>,
    states: HashMap<K, DetectorState>,
}

impl<K> PromptDetector<K>
where
    K: Clone + Eq + Hash,
{
    /// Create a detector and compile its pattern list.
    pub fn new(settings: DetectorConfig) -> Self {
        let patterns = compile_patterns(&settings.patterns);
        Self {
            settings,
            patterns,
            states: HashMap::new(),
        }
    }

    /// Replace settings and recompile patterns. Session states are kept.
    pub fn reconfigure(&mut self, settings: DetectorConfig) {
        self.patterns = compile_patterns(&settings.patterns);
        self.settings = settings;
    }

    /// Feed an output chunk.
    ///
    /// Any pending show-timer is invalidated. Output never clears an
    /// existing waiting state.
    pub fn on_output(&mut self, key: &K, text: &str) -> OutputVerdict {
        let tail_chars = self.settings.tail_chars;
        let state = self.states.entry(key.clone()).or_default();
        state.epoch += 1;
        state.armed = false;
        state.last_output = Some(Instant::now());
        state.tail.push_str(&strip_escapes(text));
        truncate_front(&mut state.tail, tail_chars);

        if !self.settings.enabled || state.waiting {
            return OutputVerdict::Quiet;
        }

        let window = trailing_window(&state.tail, WINDOW_LINES);
        if self.patterns.iter().any(|re| re.is_match(&window)) {
            state.armed = true;
            OutputVerdict::Arm {
                epoch: state.epoch,
                delay: self.settings.delay(),
            }
        } else {
            OutputVerdict::Quiet
        }
    }

    /// A show-timer fired. Returns `Some(true)` on the `Idle → Waiting`
    /// transition, `None` for stale or unknown timers.
    pub fn on_timer(&mut self, key: &K, epoch: u64) -> Option<bool> {
        let state = self.states.get_mut(key)?;
        if !state.armed || state.epoch != epoch || state.waiting {
            return None;
        }
        state.armed = false;
        state.waiting = true;
        Some(true)
    }

    /// A keystroke was sent. Returns `Some(false)` on the `Waiting → Idle`
    /// transition.
    pub fn on_input(&mut self, key: &K) -> Option<bool> {
        let state = self.states.get_mut(key)?;
        state.epoch += 1;
        state.armed = false;
        // The answered prompt must not match again when the echo arrives
        state.tail.clear();
        if state.waiting {
            state.waiting = false;
            Some(false)
        } else {
            None
        }
    }

    /// Reset a session (process exit or restart). Returns `Some(false)` if
    /// it was waiting.
    pub fn reset(&mut self, key: &K) -> Option<bool> {
        let state = self.states.remove(key)?;
        state.waiting.then_some(false)
    }

    /// Discard all state for a session.
    pub fn forget(&mut self, key: &K) {
        self.states.remove(key);
    }

    /// Discard all state.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Whether the session is currently reported as waiting.
    pub fn is_waiting(&self, key: &K) -> bool {
        self.states.get(key).is_some_and(|s| s.waiting)
    }

    /// When the session last produced output.
    pub fn last_output(&self, key: &K) -> Option<Instant> {
        self.states.get(key).and_then(|s| s.last_output)
    }

    /// Number of compiled patterns, built-ins included
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

fn compile_patterns(user_patterns: &[String]) -> Vec<Regex> {
    BUILTIN_PATTERNS
        .iter()
        .copied()
        .chain(user_patterns.iter().map(String::as_str))
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Skipping invalid prompt pattern");
                None
            }
        })
        .collect()
}

/// Keep at most `max_chars` characters, dropping from the front.
fn truncate_front(text: &mut String, max_chars: usize) {
    let count = text.chars().count();
    if count <= max_chars {
        return;
    }
    let cut = text
        .char_indices()
        .nth(count - max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.drain(..cut);
}

/// Last `lines` non-blank lines of `text`, oldest first.
fn trailing_window(text: &str, lines: usize) -> String {
    let mut tail: Vec<&str> = text
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(lines)
        .collect();
    tail.reverse();
    tail.join("\n")
}
