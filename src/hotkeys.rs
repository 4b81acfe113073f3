//! Global hotkey bridge
//!
//! Hotkey specs are validated at registration time, before any listener is
//! started; an invalid spec fails with `HotkeyError::InvalidSpec` and that
//! binding is simply skipped. The OS listener runs on a background thread
//! and never touches coordinator state: every observed firing becomes an
//! immutable `HotkeyAction` value pushed through an `mpsc` channel that the
//! coordinator drains on its own execution context.
//!
//! Spec grammar: zero or more modifier tokens (`ctrl`, `shift`, `alt`,
//! `super` — `win`/`meta` are aliases) joined with `+` around exactly one
//! base key token. Case-insensitive, modifier order irrelevant.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::Sender;

use tracing::{debug, warn};

use crate::errors::HotkeyError;

/// The actions a global hotkey can trigger. Doubles as the command value
/// delivered across the thread boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HotkeyAction {
    ToggleOverlay,
    OpenSettings,
    Quit,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 3] = [
        HotkeyAction::ToggleOverlay,
        HotkeyAction::OpenSettings,
        HotkeyAction::Quit,
    ];

    /// The action's key in the configuration hotkey map.
    pub fn name(self) -> &'static str {
        match self {
            HotkeyAction::ToggleOverlay => "toggle_overlay",
            HotkeyAction::OpenSettings => "open_settings",
            HotkeyAction::Quit => "quit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// Base key of a combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKey {
    /// Letter, digit, or printable punctuation
    Char(char),
    /// Function key F1..=F12
    Function(u8),
    Named(NamedKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Tab,
    Space,
    Enter,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl NamedKey {
    fn token(self) -> &'static str {
        match self {
            NamedKey::Tab => "tab",
            NamedKey::Space => "space",
            NamedKey::Enter => "enter",
            NamedKey::Escape => "esc",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::Insert => "insert",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "pageup",
            NamedKey::PageDown => "pagedown",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        let key = match token {
            "tab" => NamedKey::Tab,
            "space" => NamedKey::Space,
            "enter" | "return" => NamedKey::Enter,
            "esc" | "escape" => NamedKey::Escape,
            "backspace" => NamedKey::Backspace,
            "delete" => NamedKey::Delete,
            "insert" => NamedKey::Insert,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pageup" => NamedKey::PageUp,
            "pagedown" => NamedKey::PageDown,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            _ => return None,
        };
        Some(key)
    }
}

impl BaseKey {
    fn from_token(token: &str) -> Option<Self> {
        if let Some(named) = NamedKey::from_token(token) {
            return Some(BaseKey::Named(named));
        }
        if let Some(digits) = token.strip_prefix('f') {
            if !digits.is_empty() {
                if let Ok(n) = digits.parse::<u8>() {
                    return (1..=12).contains(&n).then_some(BaseKey::Function(n));
                }
            }
        }
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_graphic() {
                return Some(BaseKey::Char(c.to_ascii_lowercase()));
            }
        }
        None
    }
}

impl fmt::Display for BaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseKey::Char(c) => write!(f, "{c}"),
            BaseKey::Function(n) => write!(f, "f{n}"),
            BaseKey::Named(named) => f.write_str(named.token()),
        }
    }
}

/// A validated key combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeySpec {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub superkey: bool,
    pub key: BaseKey,
}

impl HotkeySpec {
    pub fn parse(spec: &str) -> Result<Self, HotkeyError> {
        let invalid = |reason: &str| HotkeyError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        if spec.trim().is_empty() {
            return Err(invalid("empty spec"));
        }

        let mut ctrl = false;
        let mut shift = false;
        let mut alt = false;
        let mut superkey = false;
        let mut key = None;

        for token in spec.split('+') {
            let token = token.trim().to_ascii_lowercase();
            let flag = match token.as_str() {
                "" => return Err(invalid("empty token")),
                "ctrl" | "control" => &mut ctrl,
                "shift" => &mut shift,
                "alt" => &mut alt,
                "super" | "win" | "meta" => &mut superkey,
                other => {
                    if key.is_some() {
                        return Err(invalid("more than one base key"));
                    }
                    key = Some(
                        BaseKey::from_token(other)
                            .ok_or_else(|| invalid("unknown key token"))?,
                    );
                    continue;
                }
            };
            if *flag {
                return Err(invalid("duplicate modifier"));
            }
            *flag = true;
        }

        let key = key.ok_or_else(|| invalid("missing base key"))?;
        Ok(Self {
            ctrl,
            shift,
            alt,
            superkey,
            key,
        })
    }
}

impl fmt::Display for HotkeySpec {
    /// Canonical form: modifiers in fixed order, lowercase tokens.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (set, token) in [
            (self.ctrl, "ctrl"),
            (self.shift, "shift"),
            (self.alt, "alt"),
            (self.superkey, "super"),
        ] {
            if set {
                write!(f, "{token}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Owns the binding registry and the background listener lifecycle.
///
/// Re-registration deterministically removes the previous OS hooks before
/// installing new ones, so one physical combination never delivers twice.
pub struct HotkeyBridge {
    bindings: BTreeMap<HotkeyAction, HotkeySpec>,
    listener: Option<listener::ListenerHandle>,
}

impl HotkeyBridge {
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
            listener: None,
        }
    }

    /// Validate and stage one binding, replacing any previous binding for
    /// the same action. Takes effect at the next `start`.
    pub fn register(&mut self, action: HotkeyAction, spec: &str) -> Result<(), HotkeyError> {
        let parsed = HotkeySpec::parse(spec)?;
        debug!(action = action.name(), spec = %parsed, "hotkey staged");
        self.bindings.insert(action, parsed);
        Ok(())
    }

    /// Stage bindings from a configuration hotkey map. Invalid specs are
    /// skipped (and returned); the remaining bindings still register.
    /// Map entries that name no known action are ignored.
    pub fn apply_bindings(
        &mut self,
        hotkeys: &BTreeMap<String, String>,
    ) -> Vec<(String, HotkeyError)> {
        self.bindings.clear();
        let mut rejected = Vec::new();
        for (name, spec) in hotkeys {
            let Some(action) = HotkeyAction::from_name(name) else {
                debug!(action = %name, "no such hotkey action, ignoring");
                continue;
            };
            if let Err(e) = self.register(action, spec) {
                warn!(action = %name, error = %e, "hotkey not registered");
                rejected.push((name.clone(), e));
            }
        }
        rejected
    }

    pub fn binding(&self, action: HotkeyAction) -> Option<&HotkeySpec> {
        self.bindings.get(&action)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// (Re)start the OS listener with the staged bindings. Any previous
    /// listener is stopped and its hooks unregistered first.
    pub fn start(&mut self, sender: Sender<HotkeyAction>) {
        self.stop();
        self.listener = listener::spawn(self.bindings.clone(), sender);
    }

    /// Stop the listener and unregister all OS hooks. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.stop();
        }
    }
}

impl Default for HotkeyBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HotkeyBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(target_os = "windows")]
mod listener {
    //! Windows listener: `RegisterHotKey` bindings on a dedicated thread
    //! that pumps its own message queue. `WM_HOTKEY` messages arrive in the
    //! order the combinations fired and are forwarded FIFO.

    use std::collections::BTreeMap;
    use std::sync::mpsc::{self, Sender};
    use std::thread::{self, JoinHandle};

    use tracing::{debug, error, info, warn};
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
        MOD_SHIFT, MOD_WIN,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetMessageW, PostThreadMessageW, MSG, WM_HOTKEY, WM_QUIT,
    };

    use super::{BaseKey, HotkeyAction, HotkeySpec, NamedKey};

    pub struct ListenerHandle {
        thread: JoinHandle<()>,
        thread_id: u32,
    }

    impl ListenerHandle {
        pub fn stop(self) {
            unsafe {
                let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
            if self.thread.join().is_err() {
                error!("hotkey listener thread panicked");
            }
        }
    }

    fn modifiers_of(spec: &HotkeySpec) -> HOT_KEY_MODIFIERS {
        let mut mods = MOD_NOREPEAT;
        if spec.ctrl {
            mods |= MOD_CONTROL;
        }
        if spec.shift {
            mods |= MOD_SHIFT;
        }
        if spec.alt {
            mods |= MOD_ALT;
        }
        if spec.superkey {
            mods |= MOD_WIN;
        }
        mods
    }

    fn virtual_key_of(key: BaseKey) -> Option<u32> {
        match key {
            BaseKey::Char(c) if c.is_ascii_alphanumeric() => {
                Some(c.to_ascii_uppercase() as u32)
            }
            BaseKey::Char(c) => {
                // OEM punctuation keys on the US layout
                let vk = match c {
                    ';' => 0xBA,
                    '=' => 0xBB,
                    ',' => 0xBC,
                    '-' => 0xBD,
                    '.' => 0xBE,
                    '/' => 0xBF,
                    '`' => 0xC0,
                    '[' => 0xDB,
                    '\\' => 0xDC,
                    ']' => 0xDD,
                    '\'' => 0xDE,
                    _ => return None,
                };
                Some(vk)
            }
            BaseKey::Function(n) => Some(0x6F + n as u32),
            BaseKey::Named(named) => {
                let vk = match named {
                    NamedKey::Tab => 0x09,
                    NamedKey::Space => 0x20,
                    NamedKey::Enter => 0x0D,
                    NamedKey::Escape => 0x1B,
                    NamedKey::Backspace => 0x08,
                    NamedKey::Delete => 0x2E,
                    NamedKey::Insert => 0x2D,
                    NamedKey::Home => 0x24,
                    NamedKey::End => 0x23,
                    NamedKey::PageUp => 0x21,
                    NamedKey::PageDown => 0x22,
                    NamedKey::Left => 0x25,
                    NamedKey::Up => 0x26,
                    NamedKey::Right => 0x27,
                    NamedKey::Down => 0x28,
                };
                Some(vk)
            }
        }
    }

    pub fn spawn(
        bindings: BTreeMap<HotkeyAction, HotkeySpec>,
        sender: Sender<HotkeyAction>,
    ) -> Option<ListenerHandle> {
        if bindings.is_empty() {
            return None;
        }

        let (id_tx, id_rx) = mpsc::channel();
        let thread = thread::spawn(move || {
            let thread_id = unsafe { GetCurrentThreadId() };
            if id_tx.send(thread_id).is_err() {
                return;
            }

            // Hotkeys registered on this thread deliver WM_HOTKEY to its queue
            let mut registered = Vec::new();
            for (index, (action, spec)) in bindings.iter().enumerate() {
                let id = index as i32 + 1;
                let Some(vk) = virtual_key_of(spec.key) else {
                    warn!(action = action.name(), spec = %spec, "no virtual key for binding, skipping");
                    continue;
                };
                match unsafe { RegisterHotKey(None, id, modifiers_of(spec), vk) } {
                    Ok(()) => {
                        debug!(action = action.name(), spec = %spec, "hotkey registered");
                        registered.push((id, *action));
                    }
                    Err(e) => {
                        warn!(action = action.name(), spec = %spec, error = %e, "hotkey registration failed, skipping");
                    }
                }
            }
            info!(count = registered.len(), "hotkey listener started");

            let mut msg = MSG::default();
            loop {
                let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                if result.0 <= 0 {
                    break;
                }
                if msg.message == WM_HOTKEY {
                    let id = msg.wParam.0 as i32;
                    if let Some((_, action)) = registered.iter().find(|(rid, _)| *rid == id) {
                        debug!(action = action.name(), "hotkey fired");
                        if sender.send(*action).is_err() {
                            break;
                        }
                    }
                }
            }

            for (id, _) in &registered {
                let _ = unsafe { UnregisterHotKey(None, *id) };
            }
            info!("hotkey listener stopped");
        });

        match id_rx.recv() {
            Ok(thread_id) => Some(ListenerHandle { thread, thread_id }),
            Err(_) => {
                let _ = thread.join();
                None
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod listener {
    //! Off-Windows there is no global hook to install; bindings validate
    //! and stage but no listener thread is spawned.

    use std::collections::BTreeMap;
    use std::sync::mpsc::Sender;

    use tracing::warn;

    use super::{HotkeyAction, HotkeySpec};

    pub struct ListenerHandle;

    impl ListenerHandle {
        pub fn stop(self) {}
    }

    pub fn spawn(
        bindings: BTreeMap<HotkeyAction, HotkeySpec>,
        _sender: Sender<HotkeyAction>,
    ) -> Option<ListenerHandle> {
        if !bindings.is_empty() {
            warn!("global hotkeys are not supported on this platform");
        }
        None
    }
}
