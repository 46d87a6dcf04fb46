use std::collections::HashMap;

use crate::stats::Stat;
use crate::storage::{ArgValue, SliceRowId, StringId, TraceStorage, TrackId};

/// Begin/end nesting state, one stack of open slices per track.
///
/// A begin opens a slice at the current depth; the matching end is always
/// the innermost open slice on that track, whatever name it carries. Events
/// arrive in timestamp order, so proper nesting on a track is guaranteed by
/// construction and depth never has to be re-derived.
#[derive(Debug, Default)]
pub struct SliceTracker {
    stacks: HashMap<TrackId, Vec<SliceRowId>>,
}

impl SliceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a slice. The row is written immediately with `dur == -1` and
    /// patched when the end arrives.
    pub fn begin(
        &mut self,
        storage: &mut TraceStorage,
        ts: i64,
        track: TrackId,
        category: Option<StringId>,
        name: Option<StringId>,
        args: &[(StringId, ArgValue)],
    ) -> SliceRowId {
        let stack = self.stacks.entry(track).or_default();
        let depth = stack.len() as u32;
        let arg_set = storage.new_arg_set();
        storage.add_args(arg_set, args);
        let id = storage.push_slice(ts, -1, track, category, name, depth, arg_set);
        stack.push(id);
        id
    }

    /// Closes the innermost open slice on `track` and attaches `args` to it.
    ///
    /// An end with nothing open is counted and degrades to a zero-duration
    /// slice at `ts`, so the event stays visible instead of vanishing.
    pub fn end(
        &mut self,
        storage: &mut TraceStorage,
        ts: i64,
        track: TrackId,
        category: Option<StringId>,
        name: Option<StringId>,
        args: &[(StringId, ArgValue)],
    ) -> SliceRowId {
        if let Some(id) = self.stacks.entry(track).or_default().pop() {
            storage.close_slice(id, ts);
            let arg_set = storage.slice(id).arg_set;
            storage.add_args(arg_set, args);
            return id;
        }
        storage.increment_stat(Stat::SLICE_END_WITHOUT_BEGIN);
        let arg_set = storage.new_arg_set();
        storage.add_args(arg_set, args);
        storage.push_slice(ts, 0, track, category, name, 0, arg_set)
    }

    /// Writes an already-complete slice at the current depth without opening
    /// it. `dur` of zero marks an instant.
    pub fn scoped(
        &mut self,
        storage: &mut TraceStorage,
        ts: i64,
        dur: i64,
        track: TrackId,
        category: Option<StringId>,
        name: Option<StringId>,
        args: &[(StringId, ArgValue)],
    ) -> SliceRowId {
        let depth = self.stacks.get(&track).map_or(0, Vec::len) as u32;
        let arg_set = storage.new_arg_set();
        storage.add_args(arg_set, args);
        storage.push_slice(ts, dur.max(0), track, category, name, depth, arg_set)
    }

    pub fn open_depth(&self, track: TrackId) -> usize {
        self.stacks.get(&track).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod test {
    use super::SliceTracker;
    use crate::stats::Stat;
    use crate::storage::{ArgValue, TraceStorage};
    use crate::track::TrackRegistry;
    use crate::process::Utid;

    #[test]
    fn nesting_closes_innermost_first() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut slices = SliceTracker::new();
        let track = registry.intern_thread(&mut storage, Utid(1));
        let x = storage.intern("X");
        let y = storage.intern("Y");

        let outer = slices.begin(&mut storage, 10, track, None, Some(x), &[]);
        let inner = slices.begin(&mut storage, 20, track, None, Some(y), &[]);
        assert_eq!(slices.open_depth(track), 2);

        let first_closed = slices.end(&mut storage, 30, track, None, None, &[]);
        assert_eq!(first_closed, inner);
        let second_closed = slices.end(&mut storage, 40, track, None, None, &[]);
        assert_eq!(second_closed, outer);
        assert_eq!(slices.open_depth(track), 0);

        let inner_row = storage.slice(inner);
        assert_eq!((inner_row.ts, inner_row.dur, inner_row.depth), (20, 10, 1));
        let outer_row = storage.slice(outer);
        assert_eq!((outer_row.ts, outer_row.dur, outer_row.depth), (10, 30, 0));
    }

    #[test]
    fn end_without_begin_is_counted_and_kept() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut slices = SliceTracker::new();
        let track = registry.intern_thread(&mut storage, Utid(1));
        let name = storage.intern("orphan");

        let id = slices.end(&mut storage, 55, track, None, Some(name), &[]);
        assert_eq!(storage.stats.get(Stat::SLICE_END_WITHOUT_BEGIN), 1);
        let row = storage.slice(id);
        assert_eq!((row.ts, row.dur, row.depth), (55, 0, 0));
        assert_eq!(row.name, Some(name));
    }

    #[test]
    fn end_args_attach_to_the_opened_slice() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut slices = SliceTracker::new();
        let track = registry.intern_thread(&mut storage, Utid(1));
        let name = storage.intern("work");
        let key = storage.intern("ret");

        let id = slices.begin(&mut storage, 1, track, None, Some(name), &[]);
        slices.end(&mut storage, 2, track, None, None, &[(key, ArgValue::Int(0))]);
        let arg_set = storage.slice(id).arg_set;
        let args: Vec<_> = storage.args_for(arg_set).collect();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].key, key);
        assert_eq!(args[0].value, ArgValue::Int(0));
    }

    #[test]
    fn scoped_slices_sit_at_current_depth() {
        let mut storage = TraceStorage::new();
        let mut registry = TrackRegistry::new();
        let mut slices = SliceTracker::new();
        let track = registry.intern_thread(&mut storage, Utid(1));
        let outer = storage.intern("outer");
        let instant = storage.intern("instant");

        slices.begin(&mut storage, 5, track, None, Some(outer), &[]);
        let id = slices.scoped(&mut storage, 7, 0, track, None, Some(instant), &[]);
        let row = storage.slice(id);
        assert_eq!((row.dur, row.depth), (0, 1));
        // Scoped slices never join the open stack.
        assert_eq!(slices.open_depth(track), 1);
    }
}
