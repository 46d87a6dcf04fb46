use std::collections::HashMap;

use crate::stats::Stat;
use crate::storage::{StringId, TraceStorage};

/// Per-packet-sequence interning state.
///
/// Symbol ids are only meaningful within the emitting sequence and only until
/// that sequence resets its incremental state, at which point every id is
/// invalidated at once.
#[derive(Debug, Default)]
pub struct SequenceState {
    generation: u32,
    kernel_symbols: HashMap<u64, String>,
}

impl SequenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_kernel_symbol(&mut self, iid: u64, name: String) {
        self.kernel_symbols.insert(iid, name);
    }

    pub fn kernel_symbol(&self, iid: u64) -> Option<&str> {
        self.kernel_symbols.get(&iid).map(String::as_str)
    }

    /// Drops every interned entry and bumps the generation. Ids seen after
    /// this refer to the new generation's table.
    pub fn clear_incremental_state(&mut self) {
        self.kernel_symbols.clear();
        self.generation += 1;
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Resolves a kernel symbol id to an interned string, falling back to the
/// hex-printed id when the sequence has no entry for it. The fallback keeps
/// the event usable and is counted rather than treated as an error.
pub fn kernel_symbol_or_fallback(
    storage: &mut TraceStorage,
    sequence: &SequenceState,
    iid: u64,
) -> StringId {
    match sequence.kernel_symbol(iid) {
        Some(name) => {
            let name = name.to_owned();
            storage.intern(&name)
        }
        None => {
            storage.stats.add(Stat::KERNEL_SYMBOL_FALLBACK, 1);
            storage.intern(&format!("0x{iid:x}"))
        }
    }
}

#[cfg(test)]
mod test {
    use super::{kernel_symbol_or_fallback, SequenceState};
    use crate::stats::Stat;
    use crate::storage::TraceStorage;

    #[test]
    fn resolution_is_scoped_to_the_sequence_generation() {
        let mut storage = TraceStorage::new();
        let mut sequence = SequenceState::new();
        sequence.add_kernel_symbol(3, "schedule".to_owned());

        let resolved = kernel_symbol_or_fallback(&mut storage, &sequence, 3);
        assert_eq!(storage.string(resolved), "schedule");
        assert_eq!(storage.stats.get(Stat::KERNEL_SYMBOL_FALLBACK), 0);

        sequence.clear_incremental_state();
        let fallback = kernel_symbol_or_fallback(&mut storage, &sequence, 3);
        assert_eq!(storage.string(fallback), "0x3");
        assert_eq!(storage.stats.get(Stat::KERNEL_SYMBOL_FALLBACK), 1);
        assert_eq!(sequence.generation(), 1);
    }

    #[test]
    fn unknown_id_formats_as_hex() {
        let mut storage = TraceStorage::new();
        let sequence = SequenceState::new();
        let id = kernel_symbol_or_fallback(&mut storage, &sequence, 0xdeadbeef);
        assert_eq!(storage.string(id), "0xdeadbeef");
    }
}
