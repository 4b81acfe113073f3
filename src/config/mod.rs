//! Configuration management
//!
//! Two documents: the profile collection (source of truth) and the legacy
//! standalone settings document (import seed and debounce target for the
//! active configuration, never read back once profiles exist).

mod profiles;
mod settings;

pub use profiles::ProfileCollection;
pub use settings::{BehaviorFlags, Configuration};
