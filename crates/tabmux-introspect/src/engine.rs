//! Introspection engine
//!
//! Wraps probing and parsing with three guarantees:
//! - fresh results come from the cache without running anything
//! - concurrent lookups of one program share a single probe
//! - debounced lookups only run for the last call of a burst for each program

use crate::cache::HelpCache;
use crate::config::IntrospectConfig;
use crate::error::{Error, Result};
use crate::flag::ParsedHelp;
use crate::parser::parse;
use crate::runner::HelpRunner;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tabmux_pty::ansi::strip_escapes;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Help arguments, tried in order.
pub const HELP_INVOCATIONS: &[&str] = &["--help", "-h", "help", "-help"];

type ProbeFuture = Shared<BoxFuture<'static, ParsedHelp>>;

struct EngineState {
    cache: HelpCache,
    in_flight: HashMap<String, ProbeFuture>,
    /// Latest debounce ticket per program
    pending_debounce: HashMap<String, u64>,
}

/// Cached, de-duplicated, debounced flag discovery.
pub struct HelpEngine {
    runner: Arc<dyn HelpRunner>,
    settings: IntrospectConfig,
    state: Mutex<EngineState>,
    debounce_ticket: AtomicU64,
}

impl HelpEngine {
    /// Create an engine.
    pub fn new(runner: Arc<dyn HelpRunner>, settings: IntrospectConfig) -> Self {
        let cache = HelpCache::new(settings.cache_max_age(), settings.cache_max_entries);
        Self {
            runner,
            settings,
            state: Mutex::new(EngineState {
                cache,
                in_flight: HashMap::new(),
                pending_debounce: HashMap::new(),
            }),
            debounce_ticket: AtomicU64::new(0),
        }
    }

    /// Flags of `program`.
    ///
    /// Exhausting every help invocation is not an error: the result is empty
    /// and carries a diagnostic. Only an invalid program name fails.
    pub async fn get_help(&self, program: &str) -> Result<ParsedHelp> {
        validate_program(program)?;

        let probe = {
            let mut state = self.state.lock().await;
            if let Some(hit) = state.cache.get(program, Instant::now()) {
                debug!(program = %program, "Help cache hit");
                return Ok(hit);
            }
            match state.in_flight.get(program) {
                Some(probe) => {
                    debug!(program = %program, "Joining in-flight help probe");
                    probe.clone()
                }
                None => {
                    let probe = run_probes(
                        self.runner.clone(),
                        program.to_string(),
                        self.settings.clone(),
                    )
                    .boxed()
                    .shared();
                    state.in_flight.insert(program.to_string(), probe.clone());
                    probe
                }
            }
        };

        let help = probe.clone().await;

        let mut state = self.state.lock().await;
        let owns_entry = state
            .in_flight
            .get(program)
            .is_some_and(|current| current.ptr_eq(&probe));
        if owns_entry {
            state.in_flight.remove(program);
            if !help.is_empty() {
                state.cache.insert(program, help.clone(), Instant::now());
            }
        }
        Ok(help)
    }

    /// Like [`get_help`](Self::get_help), but only the last call for the
    /// same program within the debounce period runs. Superseded calls
    /// return `Ok(None)`; calls for other programs are unaffected.
    pub async fn get_debounced_help(&self, program: &str) -> Result<Option<ParsedHelp>> {
        let ticket = self.debounce_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .lock()
            .await
            .pending_debounce
            .insert(program.to_string(), ticket);

        tokio::time::sleep(self.settings.debounce()).await;

        {
            let mut state = self.state.lock().await;
            if state.pending_debounce.get(program) != Some(&ticket) {
                return Ok(None);
            }
            state.pending_debounce.remove(program);
        }
        self.get_help(program).await.map(Some)
    }

    /// Forget the cached result for `program`.
    pub async fn invalidate(&self, program: &str) {
        self.state.lock().await.cache.invalidate(program);
    }

    /// Forget every cached result.
    pub async fn clear_cache(&self) {
        self.state.lock().await.cache.clear();
    }

    /// Number of cached programs
    pub async fn cached_len(&self) -> usize {
        self.state.lock().await.cache.len()
    }
}

/// Try each help invocation until one produces enough text, then parse it.
async fn run_probes(
    runner: Arc<dyn HelpRunner>,
    program: String,
    settings: IntrospectConfig,
) -> ParsedHelp {
    let timeout = settings.probe_timeout();
    for &arg in HELP_INVOCATIONS {
        match runner.run(&program, arg, timeout).await {
            Ok(raw) => {
                let text = strip_escapes(&raw);
                let len = text.trim().chars().count();
                if len > settings.min_output_len {
                    let mut help = parse(&program, &text);
                    help.invocation = Some(arg.to_string());
                    info!(
                        program = %program,
                        invocation = arg,
                        flags = help.flags.len(),
                        format = ?help.format,
                        "Help parsed"
                    );
                    return help;
                }
                debug!(program = %program, invocation = arg, len, "Help output too short");
            }
            Err(e) => {
                debug!(program = %program, invocation = arg, error = %e, "Help probe failed");
            }
        }
    }
    ParsedHelp::empty(
        program.as_str(),
        format!("no help output from {}", HELP_INVOCATIONS.join(", ")),
    )
}

/// Reject names that are empty or would need shell interpretation.
fn validate_program(program: &str) -> Result<()> {
    let invalid = program.is_empty()
        || program.starts_with('-')
        || program.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(
                    c,
                    ';' | '&' | '|' | '$' | '`' | '<' | '>' | '(' | ')' | '*' | '?' | '!' | '\'' | '"' | '\\'
                )
        });
    if invalid {
        return Err(Error::InvalidProgram(program.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
