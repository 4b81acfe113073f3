//! Named profile collection
//!
//! A profile is a named, persisted `Configuration` snapshot switchable as
//! a unit. The `Default` profile always exists and can never be deleted or
//! renamed; the active-profile name always resolves to an existing entry,
//! self-healing to `Default` when persisted state disagrees.

use std::collections::BTreeMap;

use serde::Serialize;
use toml::Value;
use tracing::{info, warn};

use super::settings::Configuration;
use crate::constants::config::DEFAULT_PROFILE;
use crate::errors::ProfileError;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCollection {
    profiles: BTreeMap<String, Configuration>,
    active: String,
}

/// Serialized shape of the profiles document
#[derive(Serialize)]
struct ProfilesDoc<'a> {
    active_profile: &'a str,
    profiles: &'a BTreeMap<String, Configuration>,
}

impl Default for ProfileCollection {
    fn default() -> Self {
        Self::with_default(Configuration::default())
    }
}

impl ProfileCollection {
    /// A collection holding only the default profile, seeded with `config`.
    pub fn with_default(config: Configuration) -> Self {
        Self {
            profiles: BTreeMap::from([(DEFAULT_PROFILE.to_string(), config)]),
            active: DEFAULT_PROFILE.to_string(),
        }
    }

    /// Build from a parsed TOML table, then self-heal the invariants:
    /// the default profile exists and the active name resolves.
    pub fn from_table(table: &toml::Table) -> Self {
        let mut profiles = BTreeMap::new();
        match table.get("profiles") {
            Some(Value::Table(entries)) => {
                for (name, value) in entries {
                    match value {
                        Value::Table(profile_table) => {
                            profiles.insert(
                                name.clone(),
                                Configuration::from_table(profile_table),
                            );
                        }
                        other => {
                            warn!(profile = %name, value = %other, "profile entry is not a table, skipping");
                        }
                    }
                }
            }
            Some(other) => warn!(value = %other, "profiles key is not a table, ignoring"),
            None => {}
        }

        let active = match table.get("active_profile") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                warn!(value = %other, "active_profile is not a string, falling back");
                DEFAULT_PROFILE.to_string()
            }
            None => DEFAULT_PROFILE.to_string(),
        };

        let mut collection = Self { profiles, active };
        collection.heal();
        collection
    }

    fn heal(&mut self) {
        if !self.profiles.contains_key(DEFAULT_PROFILE) {
            info!("default profile missing, recreating");
            self.profiles
                .insert(DEFAULT_PROFILE.to_string(), Configuration::default());
        }
        if !self.profiles.contains_key(&self.active) {
            warn!(active = %self.active, "active profile does not exist, falling back to default");
            self.active = DEFAULT_PROFILE.to_string();
        }
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(&ProfilesDoc {
            active_profile: &self.active,
            profiles: &self.profiles,
        })
        .expect("profile collection serializes")
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn get(&self, name: &str) -> Option<&Configuration> {
        self.profiles.get(name)
    }

    /// The active profile's persisted configuration. The active name always
    /// resolves, so this cannot fail.
    pub fn active_config(&self) -> &Configuration {
        &self.profiles[&self.active]
    }

    pub fn is_protected(&self, name: &str) -> bool {
        name == DEFAULT_PROFILE
    }

    /// "Unsaved changes" is derived, never stored: true when `config`
    /// differs field-by-field from the active profile's persisted snapshot.
    pub fn has_unsaved_changes(&self, config: &Configuration) -> bool {
        self.active_config() != config
    }

    fn validate_name(name: &str) -> Result<(), ProfileError> {
        if name.trim().is_empty() {
            return Err(ProfileError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Create a new profile from `base`.
    pub fn create(&mut self, name: &str, base: Configuration) -> Result<(), ProfileError> {
        Self::validate_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(ProfileError::DuplicateName(name.to_string()));
        }
        self.profiles.insert(name.to_string(), base);
        info!(profile = %name, "profile created");
        Ok(())
    }

    /// Delete a profile. The default profile is protected; deleting the
    /// active profile falls back to the default.
    pub fn delete(&mut self, name: &str) -> Result<(), ProfileError> {
        if self.is_protected(name) {
            return Err(ProfileError::Protected(name.to_string()));
        }
        if self.profiles.remove(name).is_none() {
            return Err(ProfileError::NotFound(name.to_string()));
        }
        if self.active == name {
            self.active = DEFAULT_PROFILE.to_string();
        }
        info!(profile = %name, "profile deleted");
        Ok(())
    }

    /// Rename a profile. The default profile is protected; the active name
    /// follows a rename of the active profile.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), ProfileError> {
        if self.is_protected(old) {
            return Err(ProfileError::Protected(old.to_string()));
        }
        Self::validate_name(new)?;
        if self.profiles.contains_key(new) {
            return Err(ProfileError::DuplicateName(new.to_string()));
        }
        let config = self
            .profiles
            .remove(old)
            .ok_or_else(|| ProfileError::NotFound(old.to_string()))?;
        self.profiles.insert(new.to_string(), config);
        if self.active == old {
            self.active = new.to_string();
        }
        info!(old = %old, new = %new, "profile renamed");
        Ok(())
    }

    /// Switch the active profile, returning the target's persisted
    /// configuration. The previous profile's unsaved changes are the
    /// caller's to discard.
    pub fn switch(&mut self, name: &str) -> Result<Configuration, ProfileError> {
        let config = self
            .profiles
            .get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?
            .clone();
        self.active = name.to_string();
        info!(profile = %name, "switched profile");
        Ok(config)
    }

    /// Store a configuration snapshot into an existing profile.
    pub fn store(&mut self, name: &str, config: Configuration) -> Result<(), ProfileError> {
        match self.profiles.get_mut(name) {
            Some(slot) => {
                *slot = config;
                info!(profile = %name, "settings saved to profile");
                Ok(())
            }
            None => Err(ProfileError::NotFound(name.to_string())),
        }
    }

    /// Store a configuration snapshot into the active profile.
    pub fn store_active(&mut self, config: Configuration) {
        let active = self.active.clone();
        self.store(&active, config)
            .expect("active profile always resolves");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_with_width(width: u32) -> Configuration {
        let mut config = Configuration::default();
        config.overlay_width = width;
        config
    }

    #[test]
    fn default_collection_holds_only_default_profile() {
        let collection = ProfileCollection::default();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["Default"]);
        assert_eq!(collection.active_name(), "Default");
    }

    #[test]
    fn deleting_default_profile_is_protected() {
        let mut collection = ProfileCollection::default();
        assert!(matches!(
            collection.delete("Default"),
            Err(ProfileError::Protected(_))
        ));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn renaming_default_profile_is_protected() {
        let mut collection = ProfileCollection::default();
        assert!(matches!(
            collection.rename("Default", "Other"),
            Err(ProfileError::Protected(_))
        ));
    }

    #[test]
    fn create_rejects_duplicates_case_sensitively() {
        let mut collection = ProfileCollection::default();
        collection.create("Work", Configuration::default()).unwrap();
        assert!(matches!(
            collection.create("Work", Configuration::default()),
            Err(ProfileError::DuplicateName(_))
        ));
        // Different case is a different profile
        collection.create("work", Configuration::default()).unwrap();
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn create_rejects_blank_names() {
        let mut collection = ProfileCollection::default();
        assert!(matches!(
            collection.create("   ", Configuration::default()),
            Err(ProfileError::InvalidName(_))
        ));
    }

    #[test]
    fn deleting_active_profile_falls_back_to_default() {
        let mut collection = ProfileCollection::default();
        collection.create("Gaming", Configuration::default()).unwrap();
        collection.switch("Gaming").unwrap();
        assert_eq!(collection.active_name(), "Gaming");

        collection.delete("Gaming").unwrap();
        assert_eq!(collection.active_name(), "Default");
        assert!(collection.get("Gaming").is_none());
    }

    #[test]
    fn rename_follows_active_profile() {
        let mut collection = ProfileCollection::default();
        collection.create("Work", Configuration::default()).unwrap();
        collection.switch("Work").unwrap();

        collection.rename("Work", "Office").unwrap();
        assert_eq!(collection.active_name(), "Office");
        assert!(collection.get("Work").is_none());
        assert!(collection.get("Office").is_some());
    }

    #[test]
    fn rename_to_existing_name_is_rejected() {
        let mut collection = ProfileCollection::default();
        collection.create("A", Configuration::default()).unwrap();
        collection.create("B", Configuration::default()).unwrap();
        assert!(matches!(
            collection.rename("A", "B"),
            Err(ProfileError::DuplicateName(_))
        ));
    }

    #[test]
    fn switch_to_missing_profile_fails() {
        let mut collection = ProfileCollection::default();
        assert!(matches!(
            collection.switch("Gaming"),
            Err(ProfileError::NotFound(_))
        ));
        assert_eq!(collection.active_name(), "Default");
    }

    #[test]
    fn switch_returns_persisted_config_verbatim() {
        let mut collection = ProfileCollection::default();
        collection.create("Gaming", config_with_width(640)).unwrap();

        let config = collection.switch("Gaming").unwrap();
        assert_eq!(config.overlay_width, 640);
        assert_eq!(config, *collection.active_config());
    }

    #[test]
    fn unsaved_changes_is_derived_by_comparison() {
        let collection = ProfileCollection::default();
        let mut config = collection.active_config().clone();
        assert!(!collection.has_unsaved_changes(&config));

        config.overlay_width = 999;
        assert!(collection.has_unsaved_changes(&config));
    }

    #[test]
    fn from_table_heals_missing_default_and_dangling_active() {
        let table: toml::Table = r#"
active_profile = "Ghost"

[profiles.Work]
overlay_width = 500
"#
        .parse()
        .unwrap();
        let collection = ProfileCollection::from_table(&table);
        assert!(collection.get("Default").is_some());
        assert_eq!(collection.active_name(), "Default");
        assert_eq!(collection.get("Work").unwrap().overlay_width, 500);
    }

    #[test]
    fn document_round_trips() {
        let mut collection = ProfileCollection::default();
        collection.create("Work", config_with_width(500)).unwrap();
        collection.switch("Work").unwrap();

        let text = collection.to_toml_string();
        let table: toml::Table = text.parse().unwrap();
        let reloaded = ProfileCollection::from_table(&table);
        assert_eq!(reloaded, collection);
    }

    #[test]
    fn active_always_resolves_after_operation_sequences() {
        let mut collection = ProfileCollection::default();
        collection.create("A", Configuration::default()).unwrap();
        collection.create("B", Configuration::default()).unwrap();
        collection.switch("A").unwrap();
        collection.rename("A", "C").unwrap();
        collection.delete("B").unwrap();
        collection.delete("C").unwrap();
        let _ = collection.switch("missing");

        assert!(collection.get(collection.active_name()).is_some());
    }
}
