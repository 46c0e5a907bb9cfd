//! Introspection settings (`[introspect]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for help probing and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectConfig {
    /// Per-invocation timeout
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Captured text must be longer than this to count as help output
    #[serde(default = "default_min_output_len")]
    pub min_output_len: usize,
    /// Cached results older than this are refetched
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,
    /// Cache capacity; the oldest entry is evicted first
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    /// Quiet period for debounced lookups
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for IntrospectConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            min_output_len: default_min_output_len(),
            cache_max_age_secs: default_cache_max_age_secs(),
            cache_max_entries: default_cache_max_entries(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl IntrospectConfig {
    /// Probe timeout as a duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Cache max age as a duration
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }

    /// Debounce period as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_min_output_len() -> usize {
    40
}

fn default_cache_max_age_secs() -> u64 {
    600
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_debounce_ms() -> u64 {
    150
}
