use std::collections::HashMap;

use crate::classification::TrackClassification;
use crate::storage::{StringId, TraceStorage, TrackId};
use crate::track::{Dimension, TrackRegistry};

/// Handle to one named group of sibling tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackSetId(pub u32);

#[derive(Debug)]
struct TrackState {
    track: TrackId,
    /// The cookie currently occupying this track, `None` when idle.
    cookie: Option<i64>,
    /// Open begins minus ends for the occupying cookie.
    nesting: u32,
}

#[derive(Debug)]
struct TrackSet {
    name: StringId,
    tracks: Vec<TrackState>,
}

/// Groups of sibling tracks for async events, keyed by cookie.
///
/// An async operation carries a cookie from its begin to its end; all
/// operations with the same set name share a group, and each concurrently
/// live cookie gets its own sibling track so overlapping operations never
/// stack on one another. A finished cookie releases its track for reuse.
#[derive(Debug, Default)]
pub struct TrackSetRegistry {
    sets: Vec<TrackSet>,
    ids: HashMap<StringId, TrackSetId>,
}

impl TrackSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_global(&mut self, name: StringId) -> TrackSetId {
        if let Some(&id) = self.ids.get(&name) {
            return id;
        }
        let id = TrackSetId(self.sets.len() as u32);
        self.sets.push(TrackSet {
            name,
            tracks: Vec::new(),
        });
        self.ids.insert(name, id);
        id
    }

    /// The track a begin with this cookie belongs on. Re-begins on a live
    /// cookie nest; otherwise an idle sibling is claimed or a new one
    /// created.
    pub fn begin(
        &mut self,
        registry: &mut TrackRegistry,
        storage: &mut TraceStorage,
        set: TrackSetId,
        cookie: i64,
    ) -> TrackId {
        let state = self.state_for_begin(registry, storage, set, cookie);
        state.cookie = Some(cookie);
        state.nesting += 1;
        state.track
    }

    /// The track an end with this cookie belongs on. When the last open
    /// begin closes the track goes idle; an unmatched end still resolves a
    /// track so the caller can record the mismatch there.
    pub fn end(
        &mut self,
        registry: &mut TrackRegistry,
        storage: &mut TraceStorage,
        set: TrackSetId,
        cookie: i64,
    ) -> TrackId {
        let state = self.state_for_begin(registry, storage, set, cookie);
        if state.nesting > 0 {
            state.nesting -= 1;
        }
        if state.nesting == 0 {
            state.cookie = None;
        }
        state.track
    }

    /// Resolves a track for an instantaneous event without claiming it.
    pub fn scoped(
        &mut self,
        registry: &mut TrackRegistry,
        storage: &mut TraceStorage,
        set: TrackSetId,
        cookie: i64,
    ) -> TrackId {
        self.state_for_begin(registry, storage, set, cookie).track
    }

    fn state_for_begin(
        &mut self,
        registry: &mut TrackRegistry,
        storage: &mut TraceStorage,
        set: TrackSetId,
        cookie: i64,
    ) -> &mut TrackState {
        let group = &mut self.sets[set.0 as usize];
        if let Some(index) = group.tracks.iter().position(|t| t.cookie == Some(cookie)) {
            return &mut group.tracks[index];
        }
        if let Some(index) = group.tracks.iter().position(|t| t.cookie.is_none()) {
            return &mut group.tracks[index];
        }
        let child = group.tracks.len() as u32;
        let track = registry.intern(
            storage,
            TrackClassification::Unknown,
            vec![Dimension::Name(group.name), Dimension::ChildIndex(child)],
            Some(group.name),
        );
        group.tracks.push(TrackState {
            track,
            cookie: None,
            nesting: 0,
        });
        let index = group.tracks.len() - 1;
        &mut group.tracks[index]
    }
}

#[cfg(test)]
mod test {
    use super::TrackSetRegistry;
    use crate::storage::TraceStorage;
    use crate::track::TrackRegistry;

    #[test]
    fn distinct_cookies_get_sibling_tracks() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut sets = TrackSetRegistry::new();
        let name = storage.intern("Suspend/Resume Latency");
        let set = sets.intern_global(name);

        let a = sets.begin(&mut registry, &mut storage, set, 1);
        let b = sets.begin(&mut registry, &mut storage, set, 2);
        assert_ne!(a, b);

        // Ending cookie 2 must leave cookie 1's track alone.
        let ended = sets.end(&mut registry, &mut storage, set, 2);
        assert_eq!(ended, b);
        let still_a = sets.begin(&mut registry, &mut storage, set, 1);
        assert_eq!(still_a, a);
    }

    #[test]
    fn released_track_is_reused() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut sets = TrackSetRegistry::new();
        let name = storage.intern("async");
        let set = sets.intern_global(name);

        let a = sets.begin(&mut registry, &mut storage, set, 1);
        sets.end(&mut registry, &mut storage, set, 1);
        let b = sets.begin(&mut registry, &mut storage, set, 9);
        assert_eq!(a, b);
    }

    #[test]
    fn nested_begins_need_matching_ends() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut sets = TrackSetRegistry::new();
        let name = storage.intern("async");
        let set = sets.intern_global(name);

        let a = sets.begin(&mut registry, &mut storage, set, 5);
        sets.begin(&mut registry, &mut storage, set, 5);
        sets.end(&mut registry, &mut storage, set, 5);
        // Still occupied by cookie 5 after one of two ends.
        let other = sets.begin(&mut registry, &mut storage, set, 6);
        assert_ne!(a, other);
        sets.end(&mut registry, &mut storage, set, 5);
        let reused = sets.begin(&mut registry, &mut storage, set, 7);
        assert_eq!(a, reused);
    }

    #[test]
    fn unmatched_end_still_resolves_a_track() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut sets = TrackSetRegistry::new();
        let name = storage.intern("async");
        let set = sets.intern_global(name);
        let track = sets.end(&mut registry, &mut storage, set, 3);
        assert_eq!(storage.track(track).name, Some(name));
    }
}
