//! Application-wide constants
//!
//! Single source of truth for magic numbers and string literals used
//! throughout the engine.

/// Configuration file locations and document names
pub mod config {
    /// Directory under the platform config dir holding our documents
    pub const APP_DIR: &str = "overmix";

    /// Profile collection document
    pub const PROFILES_FILENAME: &str = "profiles.toml";

    /// Legacy standalone settings document (import seed, debounce target)
    pub const SETTINGS_FILENAME: &str = "settings.toml";

    /// Name of the protected default profile
    pub const DEFAULT_PROFILE: &str = "Default";
}

/// Refresh and persistence timing
pub mod timing {
    /// Overlay refresh interval while visible
    pub const REFRESH_INTERVAL_MS: u64 = 3000;

    /// Quiet interval before a dirty document is written
    pub const SAVE_DEBOUNCE_MS: u64 = 500;
}

/// Audio session constants
pub mod audio {
    /// Reserved id of the master/system pseudo-session
    pub const MASTER_SESSION_ID: &str = "master";

    /// Display name of the master/system pseudo-session
    pub const MASTER_DISPLAY_NAME: &str = "System Volume";

    /// Consecutive capture failures before the degraded indicator is set
    pub const DEGRADED_AFTER: u32 = 3;
}

/// Overlay geometry and opacity bounds
pub mod overlay {
    pub const DEFAULT_WIDTH: u32 = 300;
    pub const DEFAULT_HEIGHT: u32 = 350;
    pub const MIN_WIDTH: u32 = 280;
    pub const MIN_HEIGHT: u32 = 350;
    pub const MAX_WIDTH: u32 = 1000;
    pub const MAX_HEIGHT: u32 = 1000;

    pub const DEFAULT_OPACITY: f64 = 0.9;
    pub const MIN_OPACITY: f64 = 0.1;
    pub const MAX_OPACITY: f64 = 1.0;
}

/// Default hotkey bindings
pub mod hotkeys {
    pub const DEFAULT_TOGGLE_OVERLAY: &str = "ctrl+shift+v";
    pub const DEFAULT_OPEN_SETTINGS: &str = "ctrl+shift+s";
    pub const DEFAULT_QUIT: &str = "ctrl+shift+q";
}
