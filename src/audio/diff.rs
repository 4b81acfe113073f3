//! Snapshot diffing
//!
//! Compares two snapshots structurally and emits an ordered event list the
//! presentation layer can apply as minimal, non-flickering updates instead
//! of a full rebuild every refresh tick.
//!
//! Event order is fixed: removals first (presentation frees resources
//! before reuse), then additions, then updates. Within each class, events
//! follow the snapshot's sorted id order so runs are reproducible.

use super::session::{AudioSession, SessionId, Snapshot};

/// One observed change between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEvent {
    Added(AudioSession),
    Removed(SessionId),
    Updated {
        id: SessionId,
        old_volume: f32,
        new_volume: f32,
        old_muted: bool,
        new_muted: bool,
    },
}

/// Compute the ordered change list from `previous` to `current`.
///
/// O(n) over keyed lookups. Volume comparison is exact: both sides hold the
/// same quantized f32 representation, so no tolerance is applied.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<DiffEvent> {
    let mut events = Vec::new();

    for id in previous.ids() {
        if !current.contains(id) {
            events.push(DiffEvent::Removed(id.clone()));
        }
    }

    for session in current.iter() {
        if !previous.contains(&session.id) {
            events.push(DiffEvent::Added(session.clone()));
        }
    }

    for session in current.iter() {
        if let Some(old) = previous.get(&session.id) {
            if old.volume != session.volume || old.muted != session.muted {
                events.push(DiffEvent::Updated {
                    id: session.id.clone(),
                    old_volume: old.volume,
                    new_volume: session.volume,
                    old_muted: old.muted,
                    new_muted: session.muted,
                });
            }
        }
    }

    events
}

/// Apply a diff event list to a snapshot.
///
/// Applying `diff(a, b)` to a copy of `a` reconstructs `b`. Used by
/// presentation state that mirrors the coordinator's snapshot.
pub fn apply(snapshot: &mut Snapshot, events: &[DiffEvent]) {
    for event in events {
        match event {
            DiffEvent::Removed(id) => {
                snapshot.remove(id);
            }
            DiffEvent::Added(session) => {
                snapshot.insert(session.clone());
            }
            DiffEvent::Updated {
                id,
                new_volume,
                new_muted,
                ..
            } => {
                if let Some(session) = snapshot.get_mut(id) {
                    session.volume = *new_volume;
                    session.muted = *new_muted;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(pid: u32, name: &str, volume: f32, muted: bool) -> AudioSession {
        AudioSession::new(SessionId::from_pid(pid), name, volume, muted, pid)
    }

    fn event_class(event: &DiffEvent) -> u8 {
        match event {
            DiffEvent::Removed(_) => 0,
            DiffEvent::Added(_) => 1,
            DiffEvent::Updated { .. } => 2,
        }
    }

    #[test]
    fn diff_of_identical_snapshots_is_empty() {
        let snap = Snapshot::from_sessions([
            session(1, "firefox", 0.5, false),
            session(2, "spotify", 1.0, true),
        ]);
        assert!(diff(&snap, &snap).is_empty());
    }

    #[test]
    fn diff_detects_addition_and_update() {
        // A = {p1: 0.5, unmuted}; B = {p1: 0.8, unmuted; p2: 1.0}
        let a = Snapshot::from_sessions([session(1, "p1", 0.5, false)]);
        let b = Snapshot::from_sessions([
            session(1, "p1", 0.8, false),
            session(2, "p2", 1.0, false),
        ]);

        let events = diff(&a, &b);
        assert_eq!(
            events,
            vec![
                DiffEvent::Added(session(2, "p2", 1.0, false)),
                DiffEvent::Updated {
                    id: SessionId::from_pid(1),
                    old_volume: 0.5,
                    new_volume: 0.8,
                    old_muted: false,
                    new_muted: false,
                },
            ]
        );
    }

    #[test]
    fn diff_detects_removal() {
        let a = Snapshot::from_sessions([
            session(1, "firefox", 0.5, false),
            session(2, "spotify", 1.0, false),
        ]);
        let b = Snapshot::from_sessions([session(1, "firefox", 0.5, false)]);

        let events = diff(&a, &b);
        assert_eq!(events, vec![DiffEvent::Removed(SessionId::from_pid(2))]);
    }

    #[test]
    fn diff_detects_mute_change_only() {
        let a = Snapshot::from_sessions([session(1, "firefox", 0.5, false)]);
        let b = Snapshot::from_sessions([session(1, "firefox", 0.5, true)]);

        let events = diff(&a, &b);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            DiffEvent::Updated {
                old_muted: false,
                new_muted: true,
                ..
            }
        ));
    }

    #[test]
    fn removals_precede_additions_precede_updates() {
        let a = Snapshot::from_sessions([
            session(1, "keep", 0.5, false),
            session(2, "gone", 0.3, false),
            session(9, "gone-too", 0.3, false),
        ]);
        let b = Snapshot::from_sessions([
            session(1, "keep", 0.9, false),
            session(3, "new", 1.0, false),
            session(4, "new-too", 0.2, true),
        ]);

        let events = diff(&a, &b);
        let classes: Vec<u8> = events.iter().map(event_class).collect();
        let mut sorted = classes.clone();
        sorted.sort_unstable();
        assert_eq!(classes, sorted, "events out of class order: {events:?}");
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn applying_diff_reconstructs_target() {
        let a = Snapshot::from_sessions([
            session(1, "firefox", 0.5, false),
            session(2, "spotify", 1.0, true),
            session(3, "discord", 0.7, false),
        ]);
        let b = Snapshot::from_sessions([
            session(1, "firefox", 0.2, true),
            session(3, "discord", 0.7, false),
            session(4, "mpv", 0.4, false),
        ]);

        let mut reconstructed = a.clone();
        apply(&mut reconstructed, &diff(&a, &b));
        assert_eq!(reconstructed, b);
    }

    #[test]
    fn applying_empty_diff_is_identity() {
        let a = Snapshot::from_sessions([session(1, "firefox", 0.5, false)]);
        let mut copy = a.clone();
        apply(&mut copy, &[]);
        assert_eq!(copy, a);
    }

    #[test]
    fn diff_includes_master_pseudo_session() {
        let a = Snapshot::new();
        let b = Snapshot::from_sessions([AudioSession::master(0.8, false)]);

        let events = diff(&a, &b);
        assert_eq!(events.len(), 1);
        match &events[0] {
            DiffEvent::Added(s) => assert!(s.is_system),
            other => panic!("expected Added, got {other:?}"),
        }
    }
}
