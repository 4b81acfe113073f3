//! The active settings document
//!
//! A `Configuration` is the unit a profile stores: overlay geometry and
//! opacity, per-action hotkey bindings, color theme slots, and behavior
//! flags. Loading is lenient per key: a missing key takes its documented
//! default, a type-mismatched key is logged and falls back without
//! discarding the rest of the document.

use std::collections::BTreeMap;

use serde::Serialize;
use toml::Value;
use tracing::warn;

use crate::constants::{hotkeys as hotkey_defaults, overlay};
use crate::hotkeys::HotkeyAction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub overlay_width: u32,
    pub overlay_height: u32,
    pub overlay_opacity: f64,
    /// Action name → hotkey spec string
    pub hotkeys: BTreeMap<String, String>,
    /// Color slot → color value string
    pub colors: BTreeMap<String, String>,
    pub behavior: BehaviorFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorFlags {
    pub confirm_on_quit: bool,
    pub show_system_volume: bool,
    pub always_show_filter: bool,
}

impl Default for BehaviorFlags {
    fn default() -> Self {
        Self {
            confirm_on_quit: true,
            show_system_volume: true,
            always_show_filter: false,
        }
    }
}

fn default_hotkeys() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            HotkeyAction::ToggleOverlay.name().to_string(),
            hotkey_defaults::DEFAULT_TOGGLE_OVERLAY.to_string(),
        ),
        (
            HotkeyAction::OpenSettings.name().to_string(),
            hotkey_defaults::DEFAULT_OPEN_SETTINGS.to_string(),
        ),
        (
            HotkeyAction::Quit.name().to_string(),
            hotkey_defaults::DEFAULT_QUIT.to_string(),
        ),
    ])
}

fn default_colors() -> BTreeMap<String, String> {
    [
        ("main_background", "rgba(30, 30, 30, {alpha})"),
        ("title_bar_bg", "rgba(43, 43, 43, 255)"),
        ("master_frame_bg", "rgba(30, 58, 95, 255)"),
        ("container_bg", "rgba(43, 43, 43, 255)"),
        ("app_control_bg", "rgba(50, 50, 50, 200)"),
        ("master_slider_handle", "#4caf50"),
        ("app_slider_handle", "#1e88e5"),
        ("primary_button_bg", "#1e88e5"),
        ("close_button_bg", "#d32f2f"),
        ("text_white", "white"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            overlay_width: overlay::DEFAULT_WIDTH,
            overlay_height: overlay::DEFAULT_HEIGHT,
            overlay_opacity: overlay::DEFAULT_OPACITY,
            hotkeys: default_hotkeys(),
            colors: default_colors(),
            behavior: BehaviorFlags::default(),
        }
    }
}

impl Configuration {
    /// Build a configuration from a parsed TOML table, key by key.
    ///
    /// Unknown keys are ignored; extra entries inside the hotkey and color
    /// maps are preserved. The result is clamped to safe ranges.
    pub fn from_table(table: &toml::Table) -> Self {
        let defaults = Configuration::default();
        let mut config = Configuration {
            overlay_width: read_u32(table, "overlay_width", defaults.overlay_width),
            overlay_height: read_u32(table, "overlay_height", defaults.overlay_height),
            overlay_opacity: read_f64(table, "overlay_opacity", defaults.overlay_opacity),
            hotkeys: read_string_map(table, "hotkeys", defaults.hotkeys),
            colors: read_string_map(table, "colors", defaults.colors),
            behavior: read_behavior(table),
        };
        config.validate_and_clamp();
        config
    }

    /// Clamp geometry and opacity to safe ranges, warning on corrections.
    pub fn validate_and_clamp(&mut self) {
        if !(overlay::MIN_WIDTH..=overlay::MAX_WIDTH).contains(&self.overlay_width) {
            warn!(overlay_width = self.overlay_width, "overlay_width out of range, clamping");
            self.overlay_width = self
                .overlay_width
                .clamp(overlay::MIN_WIDTH, overlay::MAX_WIDTH);
        }
        if !(overlay::MIN_HEIGHT..=overlay::MAX_HEIGHT).contains(&self.overlay_height) {
            warn!(overlay_height = self.overlay_height, "overlay_height out of range, clamping");
            self.overlay_height = self
                .overlay_height
                .clamp(overlay::MIN_HEIGHT, overlay::MAX_HEIGHT);
        }
        if !(overlay::MIN_OPACITY..=overlay::MAX_OPACITY).contains(&self.overlay_opacity) {
            warn!(overlay_opacity = self.overlay_opacity, "overlay_opacity out of range, clamping");
            self.overlay_opacity = self
                .overlay_opacity
                .clamp(overlay::MIN_OPACITY, overlay::MAX_OPACITY);
        }
    }

    /// The configured spec string for one hotkey action.
    pub fn hotkey(&self, action: HotkeyAction) -> Option<&str> {
        self.hotkeys.get(action.name()).map(String::as_str)
    }
}

fn read_u32(table: &toml::Table, key: &str, default: u32) -> u32 {
    match table.get(key) {
        None => default,
        Some(Value::Integer(i)) if *i >= 0 && *i <= u32::MAX as i64 => *i as u32,
        Some(other) => {
            warn!(key, value = %other, "type mismatch, using default");
            default
        }
    }
}

fn read_f64(table: &toml::Table, key: &str, default: f64) -> f64 {
    // Integer or float accepted, the way hand-edited documents write them
    match table.get(key) {
        None => default,
        Some(Value::Float(f)) => *f,
        Some(Value::Integer(i)) => *i as f64,
        Some(other) => {
            warn!(key, value = %other, "type mismatch, using default");
            default
        }
    }
}

fn read_behavior(table: &toml::Table) -> BehaviorFlags {
    let defaults = BehaviorFlags::default();
    let Some(value) = table.get("behavior") else {
        return defaults;
    };
    let Value::Table(behavior) = value else {
        warn!(value = %value, "behavior is not a table, using defaults");
        return defaults;
    };
    BehaviorFlags {
        confirm_on_quit: read_bool(behavior, "confirm_on_quit", defaults.confirm_on_quit),
        show_system_volume: read_bool(behavior, "show_system_volume", defaults.show_system_volume),
        always_show_filter: read_bool(behavior, "always_show_filter", defaults.always_show_filter),
    }
}

fn read_bool(table: &toml::Table, key: &str, default: bool) -> bool {
    match table.get(key) {
        None => default,
        Some(Value::Boolean(b)) => *b,
        Some(other) => {
            warn!(key, value = %other, "type mismatch, using default");
            default
        }
    }
}

/// Read a string map, starting from defaults so missing entries are filled.
/// Individual non-string entries fall back; extra entries are preserved.
fn read_string_map(
    table: &toml::Table,
    key: &str,
    defaults: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let Some(value) = table.get(key) else {
        return defaults;
    };
    let Value::Table(entries) = value else {
        warn!(key, value = %value, "expected a table, using defaults");
        return defaults;
    };
    let mut map = defaults;
    for (entry_key, entry_value) in entries {
        match entry_value {
            Value::String(s) => {
                map.insert(entry_key.clone(), s.clone());
            }
            other => {
                warn!(key, entry = %entry_key, value = %other, "type mismatch, keeping default");
            }
        }
    }
    map
}
