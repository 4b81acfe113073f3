//! Domain error types
//!
//! Transient audio failures are retried on the next refresh tick; the
//! validation-level errors are rejected before any state change.

use thiserror::Error;

use crate::audio::SessionId;

/// Errors from the audio subsystem adapter
#[derive(Error, Debug)]
pub enum AudioError {
    /// Session enumeration itself failed (audio service down, COM error)
    #[error("audio subsystem unavailable: {0}")]
    SubsystemUnavailable(String),

    /// The session disappeared between snapshot and control call
    #[error("audio session not found: {0}")]
    SessionNotFound(SessionId),

    /// The OS denied the mutation (e.g. protected system process)
    #[error("control rejected for session {0}: {1}")]
    ControlRejected(SessionId, String),
}

/// Errors from profile and settings management
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profile not found: '{0}'")]
    NotFound(String),

    /// The default profile cannot be renamed or deleted
    #[error("profile '{0}' is protected")]
    Protected(String),

    #[error("a profile named '{0}' already exists")]
    DuplicateName(String),

    /// Empty or whitespace-only profile name
    #[error("invalid profile name: {0:?}")]
    InvalidName(String),

    /// Write failure; in-memory state stays authoritative
    #[error("failed to persist {document}: {source}")]
    Persistence {
        document: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from hotkey registration
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("invalid hotkey spec {spec:?}: {reason}")]
    InvalidSpec { spec: String, reason: String },
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
