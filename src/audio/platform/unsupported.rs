//! Stub backend for platforms without a session audio API.
//!
//! Keeps the engine and its tests buildable off-Windows; every capture
//! reports the subsystem unavailable.

use crate::audio::{AudioBackend, AudioSession, SessionId};
use crate::errors::{AudioError, AudioResult};

pub struct UnsupportedAudioBackend;

impl UnsupportedAudioBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for UnsupportedAudioBackend {
    fn capture_sessions(&mut self) -> AudioResult<Vec<AudioSession>> {
        Err(AudioError::SubsystemUnavailable(
            "session audio control is not supported on this platform".into(),
        ))
    }

    fn capture_master(&mut self) -> AudioResult<AudioSession> {
        Err(AudioError::SubsystemUnavailable(
            "session audio control is not supported on this platform".into(),
        ))
    }

    fn set_volume(&mut self, id: &SessionId, _value: f32) -> AudioResult<()> {
        Err(AudioError::SessionNotFound(id.clone()))
    }

    fn set_muted(&mut self, id: &SessionId, _muted: bool) -> AudioResult<()> {
        Err(AudioError::SessionNotFound(id.clone()))
    }
}
