//! Audio session model
//!
//! An [`AudioSession`] mirrors one OS-level audio-capable process; a
//! [`Snapshot`] is a point-in-time capture of all of them, keyed by id.
//! Snapshots are compared structurally, never by reference identity.

use std::collections::BTreeMap;
use std::fmt;

use crate::constants::audio::{MASTER_DISPLAY_NAME, MASTER_SESSION_ID};

/// Opaque session identifier, stable for the session's lifetime.
///
/// Process-backed sessions use `pid:<n>`; the master pseudo-session uses
/// the reserved id `master`. Ids are not preserved across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_pid(pid: u32) -> Self {
        Self(format!("pid:{pid}"))
    }

    pub fn master() -> Self {
        Self::new(MASTER_SESSION_ID)
    }

    pub fn is_master(&self) -> bool {
        self.0 == MASTER_SESSION_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One OS-level audio-capable process instance.
///
/// Volume is a normalized scalar in [0.0, 1.0], quantized to the same f32
/// representation on both sides, so equality comparison is exact.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSession {
    pub id: SessionId,
    pub display_name: String,
    pub volume: f32,
    pub muted: bool,
    /// Marks the master/system pseudo-session (no backing process)
    pub is_system: bool,
    /// Backing process id; 0 for the master pseudo-session
    pub pid: u32,
}

impl AudioSession {
    pub fn new(
        id: SessionId,
        display_name: impl Into<String>,
        volume: f32,
        muted: bool,
        pid: u32,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            volume,
            muted,
            is_system: false,
            pid,
        }
    }

    /// The master/system volume pseudo-session
    pub fn master(volume: f32, muted: bool) -> Self {
        Self {
            id: SessionId::master(),
            display_name: MASTER_DISPLAY_NAME.to_string(),
            volume,
            muted,
            is_system: true,
            pid: 0,
        }
    }

    /// Fallback display name for sessions whose metadata lookup failed
    pub fn fallback_name(pid: u32) -> String {
        format!("Process {pid}")
    }
}

/// Point-in-time capture of all current audio sessions, keyed by id.
///
/// Backed by a `BTreeMap` so iteration order is deterministic, which keeps
/// diff output reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    sessions: BTreeMap<SessionId, AudioSession>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sessions(sessions: impl IntoIterator<Item = AudioSession>) -> Self {
        Self {
            sessions: sessions
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<&AudioSession> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn insert(&mut self, session: AudioSession) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<AudioSession> {
        self.sessions.remove(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut AudioSession> {
        self.sessions.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioSession> {
        self.sessions.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }
}
