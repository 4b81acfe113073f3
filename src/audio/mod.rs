mod backend;
mod diff;
pub mod platform;
mod provider;
mod session;

pub use backend::AudioBackend;
pub use diff::{apply, diff, DiffEvent};
pub use platform::create_backend;
pub use provider::SnapshotProvider;
pub use session::{AudioSession, SessionId, Snapshot};

#[cfg(test)]
pub(crate) use provider::test_support;
