//! WASAPI session backend
//!
//! Read/write adapter over the Windows audio session API: the default
//! render endpoint's session enumerator for per-process sessions, and the
//! endpoint volume interface for the master pseudo-session. Sessions are
//! keyed by process id, matching how control calls are routed back.

use windows::core::{Interface, GUID, PWSTR};
use windows::Win32::Foundation::{CloseHandle, MAX_PATH};
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{
    eConsole, eRender, AudioSessionStateActive, AudioSessionStateInactive,
    IAudioSessionControl, IAudioSessionControl2, IAudioSessionManager2, IMMDevice,
    IMMDeviceEnumerator, ISimpleAudioVolume, MMDeviceEnumerator,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

use crate::audio::{AudioBackend, AudioSession, SessionId};
use crate::errors::{AudioError, AudioResult};

const NO_EVENT_CONTEXT: *const GUID = std::ptr::null();

fn unavailable(e: windows::core::Error) -> AudioError {
    AudioError::SubsystemUnavailable(e.to_string())
}

/// Resolve a process's executable base name, without the `.exe` suffix.
fn process_display_name(pid: u32) -> Option<String> {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = [0u16; MAX_PATH as usize];
        let mut size = buffer.len() as u32;
        let pwstr = PWSTR(buffer.as_mut_ptr());

        let result = QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, pwstr, &mut size);
        let _ = CloseHandle(handle);
        result.ok()?;

        let full_path = String::from_utf16_lossy(&buffer[..size as usize]);
        full_path
            .split('\\')
            .next_back()
            .map(|s| s.trim_end_matches(".exe").to_string())
    }
}

/// Display name from session metadata, ignoring the unresolved
/// `@%SystemRoot%...` resource references some sessions report.
fn session_display_name(control: &IAudioSessionControl) -> Option<String> {
    unsafe {
        let name = control.GetDisplayName().ok()?;
        let name = name.to_string().ok()?;
        (!name.is_empty() && !name.starts_with("@%")).then_some(name)
    }
}

pub struct WindowsAudioBackend {
    com_ready: bool,
}

impl WindowsAudioBackend {
    pub fn new() -> Self {
        Self { com_ready: false }
    }

    fn ensure_com(&mut self) -> AudioResult<()> {
        if self.com_ready {
            return Ok(());
        }
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED).ok() }.map_err(unavailable)?;
        self.com_ready = true;
        Ok(())
    }

    fn default_device(&self) -> AudioResult<IMMDevice> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(unavailable)?;
            enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(unavailable)
        }
    }

    fn endpoint_volume(&self) -> AudioResult<IAudioEndpointVolume> {
        let device = self.default_device()?;
        unsafe { device.Activate(CLSCTX_ALL, None) }.map_err(unavailable)
    }

    /// Find the simple-volume interface for a process-backed session.
    /// Re-enumerates on each call so a stale id surfaces as `SessionNotFound`
    /// instead of a dangling handle.
    fn find_session_volume(&self, id: &SessionId) -> AudioResult<ISimpleAudioVolume> {
        let device = self.default_device()?;
        unsafe {
            let manager: IAudioSessionManager2 =
                device.Activate(CLSCTX_ALL, None).map_err(unavailable)?;
            let enumerator = manager.GetSessionEnumerator().map_err(unavailable)?;
            let count = enumerator.GetCount().map_err(unavailable)?;

            for i in 0..count {
                let Ok(control) = enumerator.GetSession(i) else {
                    continue;
                };
                let Ok(control2) = control.cast::<IAudioSessionControl2>() else {
                    continue;
                };
                let pid = control2.GetProcessId().unwrap_or(0);
                if pid != 0 && SessionId::from_pid(pid) == *id {
                    return control
                        .cast::<ISimpleAudioVolume>()
                        .map_err(|e| AudioError::ControlRejected(id.clone(), e.to_string()));
                }
            }
        }
        Err(AudioError::SessionNotFound(id.clone()))
    }
}

impl AudioBackend for WindowsAudioBackend {
    fn capture_sessions(&mut self) -> AudioResult<Vec<AudioSession>> {
        self.ensure_com()?;
        let device = self.default_device()?;

        unsafe {
            let manager: IAudioSessionManager2 =
                device.Activate(CLSCTX_ALL, None).map_err(unavailable)?;
            let enumerator = manager.GetSessionEnumerator().map_err(unavailable)?;
            let count = enumerator.GetCount().map_err(unavailable)?;

            let mut sessions = Vec::new();
            for i in 0..count {
                let Ok(control) = enumerator.GetSession(i) else {
                    continue;
                };
                let Ok(state) = control.GetState() else {
                    continue;
                };
                if state != AudioSessionStateActive && state != AudioSessionStateInactive {
                    continue;
                }
                let Ok(control2) = control.cast::<IAudioSessionControl2>() else {
                    continue;
                };
                let pid = control2.GetProcessId().unwrap_or(0);
                if pid == 0 {
                    // Sessions without a backing process (system sounds)
                    // are covered by the master pseudo-session.
                    continue;
                }
                let Ok(volume_control) = control.cast::<ISimpleAudioVolume>() else {
                    continue;
                };

                // A failed metadata lookup never hides an active session;
                // it falls back to a pid-derived name.
                let mut display_name = process_display_name(pid);
                if display_name.is_none() {
                    display_name = session_display_name(&control);
                }
                let display_name =
                    display_name.unwrap_or_else(|| AudioSession::fallback_name(pid));

                let volume = volume_control.GetMasterVolume().unwrap_or(1.0);
                let muted = volume_control
                    .GetMute()
                    .map(|m| m.as_bool())
                    .unwrap_or(false);

                sessions.push(AudioSession::new(
                    SessionId::from_pid(pid),
                    display_name,
                    volume,
                    muted,
                    pid,
                ));
            }
            Ok(sessions)
        }
    }

    fn capture_master(&mut self) -> AudioResult<AudioSession> {
        self.ensure_com()?;
        let endpoint = self.endpoint_volume()?;
        unsafe {
            let volume = endpoint
                .GetMasterVolumeLevelScalar()
                .map_err(unavailable)?;
            let muted = endpoint.GetMute().map(|m| m.as_bool()).unwrap_or(false);
            Ok(AudioSession::master(volume, muted))
        }
    }

    fn set_volume(&mut self, id: &SessionId, value: f32) -> AudioResult<()> {
        self.ensure_com()?;
        if id.is_master() {
            let endpoint = self.endpoint_volume()?;
            return unsafe { endpoint.SetMasterVolumeLevelScalar(value, NO_EVENT_CONTEXT) }
                .map_err(|e| AudioError::ControlRejected(id.clone(), e.to_string()));
        }
        let volume_control = self.find_session_volume(id)?;
        unsafe { volume_control.SetMasterVolume(value, NO_EVENT_CONTEXT) }
            .map_err(|e| AudioError::ControlRejected(id.clone(), e.to_string()))
    }

    fn set_muted(&mut self, id: &SessionId, muted: bool) -> AudioResult<()> {
        self.ensure_com()?;
        if id.is_master() {
            let endpoint = self.endpoint_volume()?;
            return unsafe { endpoint.SetMute(muted, NO_EVENT_CONTEXT) }
                .map_err(|e| AudioError::ControlRejected(id.clone(), e.to_string()));
        }
        let volume_control = self.find_session_volume(id)?;
        unsafe { volume_control.SetMute(muted, NO_EVENT_CONTEXT) }
            .map_err(|e| AudioError::ControlRejected(id.clone(), e.to_string()))
    }
}
