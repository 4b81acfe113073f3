//! Document persistence
//!
//! Owns the on-disk representation of the two configuration documents and
//! the per-document state machine Clean → Dirty → (write) → Clean. Two
//! triggers exist: a debounced timer for incidental changes (slider drags,
//! window resize coalesce into one write after a quiet interval) and an
//! immediate flush for explicit actions (profile switch/rename/delete/
//! save), which supersedes any pending debounce and completes before the
//! action reports success.
//!
//! Content is rendered at write time, so a pending debounced write always
//! persists the current state, never the state at mark-dirty time. Writes
//! for one document never overlap: everything runs on the coordinator's
//! single execution context.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::{Configuration, ProfileCollection};
use crate::constants::config::{APP_DIR, PROFILES_FILENAME, SETTINGS_FILENAME};
use crate::constants::timing::SAVE_DEBOUNCE_MS;
use crate::errors::ProfileError;

enum DocumentState {
    Clean,
    Dirty { since: Instant },
}

struct DocumentStore {
    path: PathBuf,
    label: &'static str,
    quiet: Duration,
    state: DocumentState,
}

impl DocumentStore {
    fn new(path: PathBuf, label: &'static str, quiet: Duration) -> Self {
        Self {
            path,
            label,
            quiet,
            state: DocumentState::Clean,
        }
    }

    /// Mark dirty, resetting (not stacking) the debounce deadline.
    fn mark_dirty(&mut self, now: Instant) {
        self.state = DocumentState::Dirty { since: now };
    }

    fn is_dirty(&self) -> bool {
        matches!(self.state, DocumentState::Dirty { .. })
    }

    fn due(&self, now: Instant) -> bool {
        match self.state {
            DocumentState::Dirty { since } => now.duration_since(since) >= self.quiet,
            DocumentState::Clean => false,
        }
    }

    /// Write the document if the quiet interval has elapsed.
    /// Returns whether a write happened.
    fn poll(
        &mut self,
        now: Instant,
        render: impl FnOnce() -> String,
    ) -> Result<bool, ProfileError> {
        if !self.due(now) {
            return Ok(false);
        }
        self.write(&render())?;
        Ok(true)
    }

    /// Write immediately if dirty, superseding any pending debounce.
    fn flush(&mut self, render: impl FnOnce() -> String) -> Result<bool, ProfileError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.write(&render())?;
        Ok(true)
    }

    /// On failure the document stays dirty; in-memory state remains
    /// authoritative and nothing is rolled back.
    fn write(&mut self, contents: &str) -> Result<(), ProfileError> {
        let persist_err = |source: std::io::Error| {
            error!(document = self.label, path = %self.path.display(), error = %source, "write failed");
            ProfileError::Persistence {
                document: self.label,
                source,
            }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }
        fs::write(&self.path, contents).map_err(persist_err)?;

        self.state = DocumentState::Clean;
        debug!(document = self.label, path = %self.path.display(), "document written");
        Ok(())
    }
}

pub struct PersistenceManager {
    settings: DocumentStore,
    profiles: DocumentStore,
}

impl PersistenceManager {
    pub fn new(dir: &Path) -> Self {
        Self::with_quiet_interval(dir, Duration::from_millis(SAVE_DEBOUNCE_MS))
    }

    pub fn with_quiet_interval(dir: &Path, quiet: Duration) -> Self {
        Self {
            settings: DocumentStore::new(dir.join(SETTINGS_FILENAME), "settings", quiet),
            profiles: DocumentStore::new(dir.join(PROFILES_FILENAME), "profiles", quiet),
        }
    }

    /// Default document directory under the platform config dir.
    pub fn default_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    /// Load the profile collection, failing softly at every level.
    ///
    /// Missing profiles document: a collection holding only the default
    /// profile, seeded from the legacy settings document when one exists
    /// (import-only; once a profiles document exists the settings document
    /// is never read again). Malformed document: logged, defaults.
    pub fn load(&self) -> ProfileCollection {
        match fs::read_to_string(&self.profiles.path) {
            Ok(text) => match text.parse::<toml::Table>() {
                Ok(table) => {
                    let collection = ProfileCollection::from_table(&table);
                    info!(
                        profiles = collection.len(),
                        active = %collection.active_name(),
                        "profiles loaded"
                    );
                    collection
                }
                Err(e) => {
                    error!(
                        path = %self.profiles.path.display(),
                        error = %e,
                        "malformed profiles document, falling back to defaults"
                    );
                    ProfileCollection::default()
                }
            },
            Err(_) => {
                info!("no profiles document, creating default profile");
                ProfileCollection::with_default(self.import_legacy_settings())
            }
        }
    }

    /// One-shot import of the legacy standalone settings document as the
    /// seed for the default profile.
    fn import_legacy_settings(&self) -> Configuration {
        match fs::read_to_string(&self.settings.path) {
            Ok(text) => match text.parse::<toml::Table>() {
                Ok(table) => {
                    info!(path = %self.settings.path.display(), "imported legacy settings document");
                    Configuration::from_table(&table)
                }
                Err(e) => {
                    error!(
                        path = %self.settings.path.display(),
                        error = %e,
                        "malformed settings document, using defaults"
                    );
                    Configuration::default()
                }
            },
            Err(_) => Configuration::default(),
        }
    }

    /// Note an incidental mutation of the active configuration; the write
    /// happens once no further mutation arrives for the quiet interval.
    pub fn settings_changed(&mut self, now: Instant) {
        self.settings.mark_dirty(now);
    }

    /// Drive the debounce timer. Called once per coordinator cycle.
    pub fn poll(&mut self, now: Instant, active: &Configuration) -> Result<bool, ProfileError> {
        self.settings
            .poll(now, || render_configuration(active))
    }

    /// Immediate, synchronous write of the profile collection. Used by
    /// every explicit profile action before it reports success.
    pub fn flush_profiles(&mut self, collection: &ProfileCollection) -> Result<(), ProfileError> {
        self.profiles.mark_dirty(Instant::now());
        self.profiles.flush(|| collection.to_toml_string())?;
        Ok(())
    }

    /// Flush everything still dirty; called at shutdown.
    pub fn flush_all(
        &mut self,
        active: &Configuration,
        collection: &ProfileCollection,
    ) -> Result<(), ProfileError> {
        self.settings.flush(|| render_configuration(active))?;
        self.profiles.flush(|| collection.to_toml_string())?;
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.settings.is_dirty() || self.profiles.is_dirty()
    }
}

fn render_configuration(config: &Configuration) -> String {
    toml::to_string_pretty(config).expect("configuration serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const QUIET: Duration = Duration::from_millis(500);

    fn manager(dir: &Path) -> PersistenceManager {
        PersistenceManager::with_quiet_interval(dir, QUIET)
    }

    #[test]
    fn load_without_documents_returns_default_collection() {
        let dir = tempdir().unwrap();
        let collection = manager(dir.path()).load();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["Default"]);
        assert_eq!(collection.active_name(), "Default");
    }

    #[test]
    fn load_malformed_profiles_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(PROFILES_FILENAME), "not [valid toml").unwrap();

        let collection = manager(dir.path()).load();
        assert_eq!(collection.active_name(), "Default");
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn legacy_settings_seed_default_profile_when_no_profiles_exist() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            "overlay_width = 640\noverlay_height = 480",
        )
        .unwrap();

        let collection = manager(dir.path()).load();
        assert_eq!(collection.active_config().overlay_width, 640);
        assert_eq!(collection.active_config().overlay_height, 480);
    }

    #[test]
    fn legacy_settings_ignored_once_profiles_document_exists() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let mut collection = ProfileCollection::default();
        let mut wide = Configuration::default();
        wide.overlay_width = 800;
        collection.store_active(wide);
        mgr.flush_profiles(&collection).unwrap();

        fs::write(dir.path().join(SETTINGS_FILENAME), "overlay_width = 999").unwrap();

        let reloaded = manager(dir.path()).load();
        assert_eq!(reloaded.active_config().overlay_width, 800);
    }

    #[test]
    fn debounce_coalesces_burst_into_single_write() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());
        let config = Configuration::default();
        let t0 = Instant::now();

        // Burst of mutations, each resetting the quiet deadline
        for i in 0..5 {
            mgr.settings_changed(t0 + Duration::from_millis(i * 100));
        }

        // Not yet quiet relative to the last mutation
        let wrote = mgr.poll(t0 + Duration::from_millis(700), &config).unwrap();
        assert!(!wrote);
        assert!(!dir.path().join(SETTINGS_FILENAME).exists());

        // Quiet interval elapsed: exactly one write
        let wrote = mgr.poll(t0 + Duration::from_millis(900), &config).unwrap();
        assert!(wrote);
        assert!(dir.path().join(SETTINGS_FILENAME).exists());

        // Clean again: no further writes
        let wrote = mgr.poll(t0 + Duration::from_millis(2000), &config).unwrap();
        assert!(!wrote);
    }

    #[test]
    fn poll_renders_state_at_write_time_not_mark_time() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());
        let t0 = Instant::now();

        let mut config = Configuration::default();
        mgr.settings_changed(t0);
        config.overlay_width = 777;

        mgr.poll(t0 + QUIET, &config).unwrap();

        let text = fs::read_to_string(dir.path().join(SETTINGS_FILENAME)).unwrap();
        assert!(text.contains("overlay_width = 777"));
    }

    #[test]
    fn flush_profiles_writes_immediately() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());
        let collection = ProfileCollection::default();

        mgr.flush_profiles(&collection).unwrap();

        let path = dir.path().join(PROFILES_FILENAME);
        assert!(path.exists());
        let reloaded = manager(dir.path()).load();
        assert_eq!(reloaded, collection);
    }

    #[test]
    fn flush_all_drains_pending_settings() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());
        let config = Configuration::default();
        let collection = ProfileCollection::default();

        mgr.settings_changed(Instant::now());
        assert!(mgr.has_pending());

        mgr.flush_all(&config, &collection).unwrap();
        assert!(!mgr.has_pending());
        assert!(dir.path().join(SETTINGS_FILENAME).exists());
    }

    #[test]
    fn write_failure_surfaces_and_keeps_document_dirty() {
        let dir = tempdir().unwrap();
        // A file where the document directory should be makes creation fail
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "").unwrap();

        let mut mgr = manager(&blocked.join("sub"));
        let config = Configuration::default();
        let t0 = Instant::now();

        mgr.settings_changed(t0);
        let result = mgr.poll(t0 + QUIET, &config);
        assert!(matches!(result, Err(ProfileError::Persistence { .. })));
        assert!(mgr.has_pending());
    }
}
