//! Help result cache

use crate::flag::ParsedHelp;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    help: ParsedHelp,
    fetched_at: Instant,
}

/// Parsed help per program, bounded in age and size.
#[derive(Debug)]
pub struct HelpCache {
    max_age: Duration,
    max_entries: usize,
    entries: HashMap<String, CacheEntry>,
}

impl HelpCache {
    /// Create a cache.
    pub fn new(max_age: Duration, max_entries: usize) -> Self {
        Self {
            max_age,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
        }
    }

    /// Fresh entry for `program`; stale entries are dropped and miss.
    pub fn get(&mut self, program: &str, now: Instant) -> Option<ParsedHelp> {
        let fresh = self
            .entries
            .get(program)
            .map(|entry| now.saturating_duration_since(entry.fetched_at) < self.max_age)?;
        if fresh {
            self.entries.get(program).map(|entry| entry.help.clone())
        } else {
            self.entries.remove(program);
            None
        }
    }

    /// Store a result, evicting the oldest entries when full.
    pub fn insert(&mut self, program: &str, help: ParsedHelp, now: Instant) {
        if !self.entries.contains_key(program) {
            while self.entries.len() >= self.max_entries {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.fetched_at)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => {
                        self.entries.remove(&key);
                    }
                    None => break,
                }
            }
        }
        self.entries.insert(
            program.to_string(),
            CacheEntry {
                help,
                fetched_at: now,
            },
        );
    }

    /// Drop one program.
    pub fn invalidate(&mut self, program: &str) {
        self.entries.remove(program);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
