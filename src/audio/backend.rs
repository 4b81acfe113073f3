//! Platform audio backend trait
//!
//! The one seam between the engine and the OS audio subsystem. Backends
//! are read/write adapters only: enumeration plus a volume scalar and mute
//! flag per session. No signal processing.

use super::session::{AudioSession, SessionId};
use crate::errors::AudioResult;

pub trait AudioBackend: Send {
    /// Enumerate all process-backed audio sessions.
    ///
    /// Fails with `AudioError::SubsystemUnavailable` only when enumeration
    /// itself fails. A session whose metadata lookup fails is included with
    /// a fallback display name, never silently omitted.
    fn capture_sessions(&mut self) -> AudioResult<Vec<AudioSession>>;

    /// Read the master endpoint volume as the `master` pseudo-session.
    fn capture_master(&mut self) -> AudioResult<AudioSession>;

    /// Set session volume. Caller clamps; `value` is already in [0.0, 1.0].
    fn set_volume(&mut self, id: &SessionId, value: f32) -> AudioResult<()>;

    /// Set session mute state.
    fn set_muted(&mut self, id: &SessionId, muted: bool) -> AudioResult<()>;
}
