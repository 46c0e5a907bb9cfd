//! Session data model

use crate::backend::ProcessControl;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::time::Instant;

/// Accent colors assigned by origin-folder index
pub const ACCENT_COLORS: &[&str] = &[
    "#4ec9b0", "#c586c0", "#dcdcaa", "#569cd6", "#ce9178", "#9cdcfe", "#d16969", "#b5cea8",
];

const ID_SUFFIX_LEN: usize = 8;

/// Opaque session identifier: creation time in milliseconds plus a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{}-{}", chrono::Utc::now().timestamp_millis(), suffix))
    }

    /// Borrow the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Accent color for an origin-folder index; the palette cycles.
pub fn accent_for(origin_index: usize) -> &'static str {
    ACCENT_COLORS[origin_index % ACCENT_COLORS.len()]
}

/// One multiplexed session.
///
/// Owned by the [`Multiplexer`](crate::Multiplexer) and mutated only through
/// its operations.
#[derive(Debug)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) seq: u64,
    pub(crate) name: String,
    pub(crate) active: bool,
    pub(crate) origin_index: Option<usize>,
    pub(crate) cwd: PathBuf,
    pub(crate) generation: u64,
    pub(crate) process: Option<Box<dyn ProcessControl>>,
    pub(crate) suppress_exit_until: Option<Instant>,
    pub(crate) forced_auto_run: bool,
    pending_utf8: Vec<u8>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        seq: u64,
        cwd: PathBuf,
        origin_index: Option<usize>,
        forced_auto_run: bool,
    ) -> Self {
        Self {
            id,
            seq,
            name: format!("Agent {seq}"),
            active: false,
            origin_index,
            cwd,
            generation: 0,
            process: None,
            suppress_exit_until: None,
            forced_auto_run,
            pending_utf8: Vec::new(),
        }
    }

    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Display name ("Agent N")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation sequence number, starting at 1
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether this is the active session
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Index of the workspace root the session was started in
    pub fn origin_index(&self) -> Option<usize> {
        self.origin_index
    }

    /// Accent color, only set when the session has an origin folder
    pub fn accent_color(&self) -> Option<&'static str> {
        self.origin_index.map(accent_for)
    }

    /// Resolved working directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Generation of the current (or last) process
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a live process is attached
    pub fn has_live_process(&self) -> bool {
        self.process.as_ref().is_some_and(|p| p.is_alive())
    }

    /// Whether an exit observed at `now` falls inside the restart grace window.
    pub(crate) fn exit_suppressed(&self, now: Instant) -> bool {
        self.suppress_exit_until.is_some_and(|until| now < until)
    }

    /// Decode output bytes, carrying an incomplete trailing UTF-8 sequence
    /// over to the next chunk.
    pub(crate) fn decode_output(&mut self, data: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_utf8);
        bytes.extend_from_slice(data);
        let split = utf8_split_point(&bytes);
        self.pending_utf8 = bytes.split_off(split);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Flush any carried bytes (lossily).
    pub(crate) fn flush_output(&mut self) -> Option<String> {
        if self.pending_utf8.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.pending_utf8);
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Length of the prefix of `bytes` that does not end in an incomplete
/// UTF-8 sequence.
fn utf8_split_point(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let byte = bytes[len - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let expected = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return len,
        };
        return if expected > back { len - back } else { len };
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        let (millis, suffix) = a.as_str().split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
    }

    #[test]
    fn test_session_id_serializes_as_string() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_accent_palette_cycles() {
        assert_eq!(accent_for(0), ACCENT_COLORS[0]);
        assert_eq!(accent_for(ACCENT_COLORS.len() + 1), ACCENT_COLORS[1]);
    }

    #[test]
    fn test_name_and_accent() {
        let session = Session::new(SessionId::from("s"), 3, PathBuf::from("/tmp"), Some(1), false);
        assert_eq!(session.name(), "Agent 3");
        assert_eq!(session.accent_color(), Some(ACCENT_COLORS[1]));

        let plain = Session::new(SessionId::from("p"), 1, PathBuf::from("/tmp"), None, false);
        assert_eq!(plain.accent_color(), None);
    }

    #[test]
    fn test_split_multibyte_output_is_reassembled() {
        let mut session = Session::new(SessionId::from("s"), 1, PathBuf::from("/tmp"), None, false);
        let bytes = "ok ❯ ".as_bytes();
        // '❯' is three bytes starting at index 3
        assert_eq!(session.decode_output(&bytes[..4]), "ok ");
        assert_eq!(session.decode_output(&bytes[4..]), "❯ ");
        assert!(session.flush_output().is_none());
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut session = Session::new(SessionId::from("s"), 1, PathBuf::from("/tmp"), None, false);
        assert_eq!(session.decode_output(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }
}
