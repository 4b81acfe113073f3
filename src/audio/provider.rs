//! Snapshot provider and control interface
//!
//! Wraps the platform backend with the two contracts the coordinator
//! consumes: atomic snapshot capture (with degraded-state tracking across
//! consecutive failures) and clamped volume/mute mutation.

use tracing::{debug, warn};

use super::backend::AudioBackend;
use super::session::{SessionId, Snapshot};
use crate::constants::audio::DEGRADED_AFTER;
use crate::errors::AudioResult;

pub struct SnapshotProvider {
    backend: Box<dyn AudioBackend>,
    consecutive_failures: u32,
}

impl SnapshotProvider {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            consecutive_failures: 0,
        }
    }

    /// Capture a snapshot of all current audio sessions.
    ///
    /// When `include_system` is set the master endpoint is read and included
    /// as the `master` pseudo-session. A failed master read does not fail
    /// the capture; the pseudo-session is simply absent for that cycle.
    pub fn capture(&mut self, include_system: bool) -> AudioResult<Snapshot> {
        let sessions = match self.backend.capture_sessions() {
            Ok(sessions) => {
                self.consecutive_failures = 0;
                sessions
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    failures = self.consecutive_failures,
                    error = %e,
                    "session capture failed"
                );
                return Err(e);
            }
        };

        let mut snapshot = Snapshot::from_sessions(sessions);

        if include_system {
            match self.backend.capture_master() {
                Ok(master) => snapshot.insert(master),
                Err(e) => warn!(error = %e, "master volume read failed"),
            }
        }

        debug!(sessions = snapshot.len(), "captured snapshot");
        Ok(snapshot)
    }

    /// True after `DEGRADED_AFTER` consecutive capture failures.
    /// Cleared by the next successful capture.
    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures >= DEGRADED_AFTER
    }

    /// Set session volume, clamping out-of-range input rather than failing.
    /// Returns the value actually applied.
    pub fn set_volume(&mut self, id: &SessionId, value: f32) -> AudioResult<f32> {
        let clamped = value.clamp(0.0, 1.0);
        if clamped != value {
            debug!(session = %id, requested = value, applied = clamped, "clamped volume");
        }
        self.backend.set_volume(id, clamped)?;
        Ok(clamped)
    }

    pub fn set_muted(&mut self, id: &SessionId, muted: bool) -> AudioResult<()> {
        self.backend.set_muted(id, muted)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted in-memory backend shared by provider and coordinator tests

    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use crate::audio::{AudioBackend, AudioSession, SessionId};
    use crate::errors::{AudioError, AudioResult};

    #[derive(Default)]
    pub struct FakeState {
        pub sessions: BTreeMap<SessionId, AudioSession>,
        pub master: Option<AudioSession>,
        pub fail_captures: u32,
        pub reject_control: bool,
        pub volume_calls: Vec<(SessionId, f32)>,
        pub mute_calls: Vec<(SessionId, bool)>,
    }

    #[derive(Clone, Default)]
    pub struct FakeBackend {
        pub state: Arc<Mutex<FakeState>>,
    }

    impl FakeBackend {
        pub fn with_sessions(sessions: impl IntoIterator<Item = AudioSession>) -> Self {
            let backend = Self::default();
            {
                let mut state = backend.state.lock().unwrap();
                for s in sessions {
                    state.sessions.insert(s.id.clone(), s);
                }
            }
            backend
        }
    }

    impl AudioBackend for FakeBackend {
        fn capture_sessions(&mut self) -> AudioResult<Vec<AudioSession>> {
            let mut state = self.state.lock().unwrap();
            if state.fail_captures > 0 {
                state.fail_captures -= 1;
                return Err(AudioError::SubsystemUnavailable("scripted failure".into()));
            }
            Ok(state.sessions.values().cloned().collect())
        }

        fn capture_master(&mut self) -> AudioResult<AudioSession> {
            let state = self.state.lock().unwrap();
            state
                .master
                .clone()
                .ok_or_else(|| AudioError::SubsystemUnavailable("no master".into()))
        }

        fn set_volume(&mut self, id: &SessionId, value: f32) -> AudioResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.reject_control {
                return Err(AudioError::ControlRejected(id.clone(), "denied".into()));
            }
            state.volume_calls.push((id.clone(), value));
            if id.is_master() {
                match state.master.as_mut() {
                    Some(master) => master.volume = value,
                    None => return Err(AudioError::SessionNotFound(id.clone())),
                }
                return Ok(());
            }
            match state.sessions.get_mut(id) {
                Some(session) => {
                    session.volume = value;
                    Ok(())
                }
                None => Err(AudioError::SessionNotFound(id.clone())),
            }
        }

        fn set_muted(&mut self, id: &SessionId, muted: bool) -> AudioResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.reject_control {
                return Err(AudioError::ControlRejected(id.clone(), "denied".into()));
            }
            state.mute_calls.push((id.clone(), muted));
            if id.is_master() {
                match state.master.as_mut() {
                    Some(master) => master.muted = muted,
                    None => return Err(AudioError::SessionNotFound(id.clone())),
                }
                return Ok(());
            }
            match state.sessions.get_mut(id) {
                Some(session) => {
                    session.muted = muted;
                    Ok(())
                }
                None => Err(AudioError::SessionNotFound(id.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeBackend;
    use super::*;
    use crate::audio::AudioSession;
    use crate::errors::AudioError;

    fn session(pid: u32, name: &str, volume: f32) -> AudioSession {
        AudioSession::new(SessionId::from_pid(pid), name, volume, false, pid)
    }

    #[test]
    fn capture_includes_master_when_enabled() {
        let backend = FakeBackend::with_sessions([session(1, "firefox", 0.5)]);
        backend.state.lock().unwrap().master = Some(AudioSession::master(0.8, false));

        let mut provider = SnapshotProvider::new(Box::new(backend));
        let snap = provider.capture(true).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(snap.contains(&SessionId::master()));

        let snap = provider.capture(false).unwrap();
        assert_eq!(snap.len(), 1);
        assert!(!snap.contains(&SessionId::master()));
    }

    #[test]
    fn master_read_failure_does_not_fail_capture() {
        let backend = FakeBackend::with_sessions([session(1, "firefox", 0.5)]);
        let mut provider = SnapshotProvider::new(Box::new(backend));

        let snap = provider.capture(true).unwrap();
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn degraded_after_consecutive_failures_and_clears_on_success() {
        let backend = FakeBackend::with_sessions([session(1, "firefox", 0.5)]);
        backend.state.lock().unwrap().fail_captures = DEGRADED_AFTER;

        let mut provider = SnapshotProvider::new(Box::new(backend));
        for i in 0..DEGRADED_AFTER {
            assert!(!provider.is_degraded(), "degraded too early at {i}");
            assert!(matches!(
                provider.capture(false),
                Err(AudioError::SubsystemUnavailable(_))
            ));
        }
        assert!(provider.is_degraded());

        provider.capture(false).unwrap();
        assert!(!provider.is_degraded());
    }

    #[test]
    fn set_volume_clamps_out_of_range() {
        let backend = FakeBackend::with_sessions([session(1, "firefox", 0.5)]);
        let state = backend.state.clone();
        let mut provider = SnapshotProvider::new(Box::new(backend));

        let applied = provider
            .set_volume(&SessionId::from_pid(1), 1.5)
            .unwrap();
        assert_eq!(applied, 1.0);

        let applied = provider
            .set_volume(&SessionId::from_pid(1), -0.25)
            .unwrap();
        assert_eq!(applied, 0.0);

        let calls = &state.lock().unwrap().volume_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, 1.0);
        assert_eq!(calls[1].1, 0.0);
    }

    #[test]
    fn set_volume_on_missing_session_fails() {
        let backend = FakeBackend::default();
        let mut provider = SnapshotProvider::new(Box::new(backend));

        assert!(matches!(
            provider.set_volume(&SessionId::from_pid(42), 0.5),
            Err(AudioError::SessionNotFound(_))
        ));
    }

    #[test]
    fn control_rejection_propagates() {
        let backend = FakeBackend::with_sessions([session(1, "firefox", 0.5)]);
        backend.state.lock().unwrap().reject_control = true;
        let mut provider = SnapshotProvider::new(Box::new(backend));

        assert!(matches!(
            provider.set_muted(&SessionId::from_pid(1), true),
            Err(AudioError::ControlRejected(..))
        ));
    }
}
