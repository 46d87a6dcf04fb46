use std::collections::HashMap;

use crate::classification::TrackClassification;
use crate::process::{Upid, Utid};
use crate::storage::{StringId, TraceStorage};

/// One axis of a track's identity. Tracks are addressed by their full
/// dimension set, so two events land on the same track exactly when their
/// dimensions agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    Cpu(u32),
    Gpu(u32),
    Thread(Utid),
    Process(Upid),
    Name(StringId),
    /// Disambiguates sibling tracks inside one track set.
    ChildIndex(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TrackKey {
    classification: TrackClassification,
    dimensions: Vec<Dimension>,
}

/// Content-addressed track interner.
///
/// The first interning of a key creates the track row and fixes its display
/// name; later hits return the existing id and ignore the name argument, so
/// races between differently-named producers can't flap the name.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    keys: HashMap<TrackKey, TrackId>,
}

pub use crate::storage::TrackId;

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(
        &mut self,
        storage: &mut TraceStorage,
        classification: TrackClassification,
        dimensions: Vec<Dimension>,
        name: Option<StringId>,
    ) -> TrackId {
        let key = TrackKey {
            classification,
            dimensions,
        };
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = storage.new_track(classification, name);
        self.keys.insert(key, id);
        id
    }

    /// The track that carries a thread's slice stack.
    pub fn intern_thread(&mut self, storage: &mut TraceStorage, utid: Utid) -> TrackId {
        self.intern(
            storage,
            TrackClassification::Thread,
            vec![Dimension::Thread(utid)],
            None,
        )
    }

    /// A per-cpu slice track, e.g. irq handling on one core.
    pub fn intern_cpu(
        &mut self,
        storage: &mut TraceStorage,
        classification: TrackClassification,
        cpu: u32,
        name: Option<StringId>,
    ) -> TrackId {
        self.intern(storage, classification, vec![Dimension::Cpu(cpu)], name)
    }

    pub fn intern_cpu_counter(
        &mut self,
        storage: &mut TraceStorage,
        classification: TrackClassification,
        cpu: u32,
        name: Option<StringId>,
    ) -> TrackId {
        self.intern(storage, classification, vec![Dimension::Cpu(cpu)], name)
    }

    pub fn intern_gpu_counter(
        &mut self,
        storage: &mut TraceStorage,
        classification: TrackClassification,
        gpu: u32,
        name: Option<StringId>,
    ) -> TrackId {
        self.intern(storage, classification, vec![Dimension::Gpu(gpu)], name)
    }

    /// A per-thread counter identified by name, e.g. allocation deltas
    /// attributed to the emitting thread.
    pub fn intern_thread_counter(
        &mut self,
        storage: &mut TraceStorage,
        utid: Utid,
        name: StringId,
    ) -> TrackId {
        self.intern(
            storage,
            TrackClassification::Unknown,
            vec![Dimension::Thread(utid), Dimension::Name(name)],
            Some(name),
        )
    }

    /// A per-process counter identified by name, e.g. memory counters.
    pub fn intern_process_counter(
        &mut self,
        storage: &mut TraceStorage,
        upid: Upid,
        name: StringId,
    ) -> TrackId {
        self.intern(
            storage,
            TrackClassification::Unknown,
            vec![Dimension::Process(upid), Dimension::Name(name)],
            Some(name),
        )
    }

    pub fn intern_global(
        &mut self,
        storage: &mut TraceStorage,
        classification: TrackClassification,
        name: Option<StringId>,
    ) -> TrackId {
        let dimensions = match name {
            Some(name) => vec![Dimension::Name(name)],
            None => Vec::new(),
        };
        self.intern(storage, classification, dimensions, name)
    }

    /// A global track identified purely by its display name. Kept for event
    /// sources that predate classifications; new callers should pass a real
    /// classification through [`intern_global`](Self::intern_global).
    pub fn intern_legacy_global(&mut self, storage: &mut TraceStorage, name: StringId) -> TrackId {
        tracing::debug!(name = storage.string(name), "legacy name-keyed track");
        self.intern(
            storage,
            TrackClassification::Unknown,
            vec![Dimension::Name(name)],
            Some(name),
        )
    }
}

#[cfg(test)]
mod test {
    use super::{Dimension, TrackRegistry};
    use crate::classification::TrackClassification;
    use crate::process::Utid;
    use crate::storage::TraceStorage;

    #[test]
    fn interning_is_idempotent_per_key() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let a = registry.intern_thread(&mut storage, Utid(1));
        let b = registry.intern_thread(&mut storage, Utid(1));
        let c = registry.intern_thread(&mut storage, Utid(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(storage.tracks().len(), 2);
    }

    #[test]
    fn dimensions_separate_same_classification() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let name = storage.intern("cpufreq");
        let cpu0 = registry.intern_cpu_counter(
            &mut storage,
            TrackClassification::CpuFrequency,
            0,
            Some(name),
        );
        let cpu1 = registry.intern_cpu_counter(
            &mut storage,
            TrackClassification::CpuFrequency,
            1,
            Some(name),
        );
        assert_ne!(cpu0, cpu1);
    }

    #[test]
    fn first_name_wins() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let first = storage.intern("first");
        let second = storage.intern("second");
        let id = registry.intern(
            &mut storage,
            TrackClassification::Unknown,
            vec![Dimension::Name(first)],
            Some(first),
        );
        let again = registry.intern(
            &mut storage,
            TrackClassification::Unknown,
            vec![Dimension::Name(first)],
            Some(second),
        );
        assert_eq!(id, again);
        assert_eq!(storage.track(id).name, Some(first));
    }
}
