//! Application coordinator
//!
//! Single-threaded orchestrator: drives the periodic refresh (capture →
//! diff → presentation), drains hotkey commands FIFO, applies presentation
//! requests, and wires configuration changes to persistence. No other
//! component mutates the snapshot, the active configuration, or the
//! profile collection; background contexts only hand immutable values in
//! through channels.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::audio::{diff, AudioBackend, DiffEvent, SessionId, Snapshot, SnapshotProvider};
use crate::config::{Configuration, ProfileCollection};
use crate::errors::{AudioError, ProfileError};
use crate::hotkeys::{HotkeyAction, HotkeyBridge};
use crate::persistence::PersistenceManager;

/// The boundary to the external presentation layer. The coordinator pushes
/// minimal updates out; the presentation issues request commands back and
/// never mutates engine state directly.
pub trait PresentationSink {
    fn sessions_changed(&mut self, events: &[DiffEvent]);
    fn configuration_changed(&mut self, config: &Configuration);
    fn profiles_changed(&mut self, profiles: &ProfileCollection);

    fn overlay_visibility_changed(&mut self, visible: bool) {
        let _ = visible;
    }

    fn settings_requested(&mut self) {}

    /// Quit confirmation when `confirm_on_quit` is set.
    fn confirm_quit(&mut self) -> bool {
        true
    }

    /// Non-blocking, user-visible notice (stale action, rejected control,
    /// persistence failure, degraded audio subsystem).
    fn notice(&mut self, message: &str) {
        let _ = message;
    }
}

pub struct Coordinator<S: PresentationSink> {
    provider: SnapshotProvider,
    last_snapshot: Snapshot,
    persistence: PersistenceManager,
    profiles: ProfileCollection,
    config: Configuration,
    bridge: HotkeyBridge,
    hotkey_tx: Sender<HotkeyAction>,
    hotkey_rx: Receiver<HotkeyAction>,
    sink: S,
    overlay_visible: bool,
    quit_requested: bool,
    degraded_notified: bool,
}

impl<S: PresentationSink> Coordinator<S> {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        persistence: PersistenceManager,
        mut sink: S,
    ) -> Self {
        let profiles = persistence.load();
        let config = profiles.active_config().clone();
        sink.profiles_changed(&profiles);
        sink.configuration_changed(&config);

        let (hotkey_tx, hotkey_rx) = mpsc::channel();
        let mut bridge = HotkeyBridge::new();
        for (name, e) in bridge.apply_bindings(&config.hotkeys) {
            sink.notice(&format!("hotkey '{name}' not registered: {e}"));
        }
        bridge.start(hotkey_tx.clone());

        Self {
            provider: SnapshotProvider::new(backend),
            last_snapshot: Snapshot::new(),
            persistence,
            profiles,
            config,
            bridge,
            hotkey_tx,
            hotkey_rx,
            sink,
            overlay_visible: false,
            quit_requested: false,
            degraded_notified: false,
        }
    }

    /// One refresh cycle: drain hotkey commands, refresh the session view
    /// while the overlay is visible, drive the persistence debounce.
    pub fn tick(&mut self, now: Instant) {
        self.drain_hotkeys();
        if self.overlay_visible && !self.quit_requested {
            self.refresh();
        }
        if let Err(e) = self.persistence.poll(now, &self.config) {
            self.sink.notice(&e.to_string());
        }
    }

    /// Commands are processed in the order the listener observed them.
    fn drain_hotkeys(&mut self) {
        while let Ok(action) = self.hotkey_rx.try_recv() {
            debug!(action = action.name(), "hotkey command");
            match action {
                HotkeyAction::ToggleOverlay => self.toggle_overlay(),
                HotkeyAction::OpenSettings => self.sink.settings_requested(),
                HotkeyAction::Quit => self.request_quit(),
            }
        }
    }

    fn refresh(&mut self) {
        let include_system = self.config.behavior.show_system_volume;
        match self.provider.capture(include_system) {
            Ok(snapshot) => {
                self.degraded_notified = false;
                let events = diff(&self.last_snapshot, &snapshot);
                if !events.is_empty() {
                    self.sink.sessions_changed(&events);
                }
                self.last_snapshot = snapshot;
            }
            Err(e) => {
                // Transient: retried next tick, surfaced once degraded
                warn!(error = %e, "refresh failed");
                if self.provider.is_degraded() && !self.degraded_notified {
                    self.degraded_notified = true;
                    self.sink.notice("audio subsystem unavailable");
                }
            }
        }
    }

    pub fn toggle_overlay(&mut self) {
        if self.overlay_visible {
            self.hide_overlay();
        } else {
            self.show_overlay();
        }
    }

    pub fn show_overlay(&mut self) {
        self.overlay_visible = true;
        self.refresh();
        self.sink.overlay_visibility_changed(true);
    }

    pub fn hide_overlay(&mut self) {
        self.overlay_visible = false;
        self.sink.overlay_visibility_changed(false);
    }

    pub fn request_set_volume(&mut self, id: &SessionId, value: f32) {
        match self.provider.set_volume(id, value) {
            Ok(applied) => {
                // Echo into the held snapshot so the next diff does not
                // re-emit our own mutation as an external update.
                if let Some(session) = self.last_snapshot.get_mut(id) {
                    session.volume = applied;
                }
            }
            Err(AudioError::SessionNotFound(_)) => {
                // Race between the UI action and session teardown: drop the
                // stale action and re-resolve the session list.
                debug!(session = %id, "stale volume request");
                self.refresh();
            }
            Err(e) => self.sink.notice(&e.to_string()),
        }
    }

    pub fn request_set_muted(&mut self, id: &SessionId, muted: bool) {
        match self.provider.set_muted(id, muted) {
            Ok(()) => {
                if let Some(session) = self.last_snapshot.get_mut(id) {
                    session.muted = muted;
                }
            }
            Err(AudioError::SessionNotFound(_)) => {
                debug!(session = %id, "stale mute request");
                self.refresh();
            }
            Err(e) => self.sink.notice(&e.to_string()),
        }
    }

    /// Replace the active configuration (settings edits, window resize,
    /// opacity drags). Persisted debounced; hotkeys rebind when their map
    /// changed.
    pub fn update_configuration(&mut self, mut config: Configuration, now: Instant) {
        config.validate_and_clamp();
        if config == self.config {
            return;
        }
        let hotkeys_changed = config.hotkeys != self.config.hotkeys;
        self.config = config;
        self.persistence.settings_changed(now);
        if hotkeys_changed {
            self.rebind_hotkeys();
        }
        self.sink.configuration_changed(&self.config);
    }

    pub fn request_switch_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        if self.profiles.has_unsaved_changes(&self.config) {
            info!(
                profile = %self.profiles.active_name(),
                "discarding unsaved changes on profile switch"
            );
        }
        let config = self.profiles.switch(name)?;
        self.flush_profiles_best_effort();
        self.apply_active_configuration(config);
        Ok(())
    }

    /// Save the active configuration into the active profile.
    pub fn request_save_profile(&mut self) {
        self.profiles.store_active(self.config.clone());
        self.flush_profiles_best_effort();
        self.sink.profiles_changed(&self.profiles);
    }

    /// Create a profile from the current active configuration.
    pub fn request_new_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        self.profiles.create(name, self.config.clone())?;
        self.flush_profiles_best_effort();
        self.sink.profiles_changed(&self.profiles);
        Ok(())
    }

    pub fn request_rename_profile(&mut self, old: &str, new: &str) -> Result<(), ProfileError> {
        self.profiles.rename(old, new)?;
        self.flush_profiles_best_effort();
        self.sink.profiles_changed(&self.profiles);
        Ok(())
    }

    pub fn request_delete_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        let was_active = self.profiles.active_name() == name;
        self.profiles.delete(name)?;
        self.flush_profiles_best_effort();
        if was_active {
            // Deleting the active profile falls back to the default
            let config = self.profiles.active_config().clone();
            self.apply_active_configuration(config);
        } else {
            self.sink.profiles_changed(&self.profiles);
        }
        Ok(())
    }

    pub fn request_quit(&mut self) {
        if self.config.behavior.confirm_on_quit && !self.sink.confirm_quit() {
            info!("quit cancelled");
            return;
        }
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Finalize: flush dirty documents and unregister all hotkeys.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.persistence.flush_all(&self.config, &self.profiles) {
            error!(error = %e, "flush on shutdown failed");
        }
        self.bridge.stop();
        info!("coordinator shut down");
    }

    /// Write-through best effort: a failed profile write is surfaced and
    /// the in-memory state stays authoritative.
    fn flush_profiles_best_effort(&mut self) {
        if let Err(e) = self.persistence.flush_profiles(&self.profiles) {
            self.sink.notice(&e.to_string());
        }
    }

    fn apply_active_configuration(&mut self, config: Configuration) {
        let hotkeys_changed = config.hotkeys != self.config.hotkeys;
        self.config = config;
        if hotkeys_changed {
            self.rebind_hotkeys();
        }
        self.sink.configuration_changed(&self.config);
        self.sink.profiles_changed(&self.profiles);
    }

    fn rebind_hotkeys(&mut self) {
        let rejected = self.bridge.apply_bindings(&self.config.hotkeys);
        for (name, e) in rejected {
            self.sink.notice(&format!("hotkey '{name}' not registered: {e}"));
        }
        self.bridge.start(self.hotkey_tx.clone());
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn profiles(&self) -> &ProfileCollection {
        &self.profiles
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.last_snapshot
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    #[cfg(test)]
    fn hotkey_sender(&self) -> Sender<HotkeyAction> {
        self.hotkey_tx.clone()
    }
}
