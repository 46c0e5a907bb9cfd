//! Keyed one-shot timers
//!
//! Arming a key aborts its previous timer. A fired timer only delivers its
//! key and epoch; the receiver decides whether the epoch is still current.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A timer that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired<K> {
    /// Timer key
    pub key: K,
    /// Epoch passed to [`KeyedTimers::arm`]
    pub epoch: u64,
}

/// One pending timer per key.
#[derive(Debug)]
pub struct KeyedTimers<K> {
    fired: mpsc::UnboundedSender<TimerFired<K>>,
    pending: HashMap<K, JoinHandle<()>>,
}

impl<K> KeyedTimers<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    /// Create timers delivering to `fired`.
    pub fn new(fired: mpsc::UnboundedSender<TimerFired<K>>) -> Self {
        Self {
            fired,
            pending: HashMap::new(),
        }
    }

    /// Fire `key` with `epoch` after `delay`, replacing any pending timer.
    pub fn arm(&mut self, key: K, epoch: u64, delay: Duration) {
        let fired = self.fired.clone();
        let timer_key = key.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(TimerFired {
                key: timer_key,
                epoch,
            });
        });
        if let Some(previous) = self.pending.insert(key, task) {
            previous.abort();
        }
    }

    /// Cancel the pending timer for `key`.
    pub fn cancel(&mut self, key: &K) {
        if let Some(task) = self.pending.remove(key) {
            task.abort();
        }
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }

    /// Forget a timer that already fired.
    pub fn clear_fired(&mut self, key: &K) {
        self.pending.remove(key);
    }

    /// Number of keys with a pending timer
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no timer is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K> Drop for KeyedTimers<K> {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}
