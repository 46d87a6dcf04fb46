use std::collections::HashMap;

use crate::classification::TrackClassification;
use crate::process::Utid;
use crate::stats::{Stat, StatsStore};

/// Identifies an interned string. Stable for the lifetime of the storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringId(pub u32);

/// Identifies a row in the track table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub u32);

/// Identifies a row in the slice table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceRowId(pub u32);

/// Identifies a row in the counter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterRowId(pub u32);

/// Identifies a row in the raw event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawRowId(pub u32);

/// Identifies a group of argument rows attached to one slice, counter or raw
/// event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgSetId(pub u32);

/// A typed argument value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Uint(u64),
    Str(StringId),
    Bool(bool),
    Double(f64),
}

#[derive(Debug, Clone)]
pub struct TrackRow {
    pub classification: TrackClassification,
    /// Display name. Presentation only; identity is held by the registry.
    pub name: Option<StringId>,
}

#[derive(Debug, Clone)]
pub struct SliceRow {
    pub ts: i64,
    /// -1 while the slice is still open.
    pub dur: i64,
    pub track: TrackId,
    pub category: Option<StringId>,
    pub name: Option<StringId>,
    pub depth: u32,
    pub arg_set: ArgSetId,
}

#[derive(Debug, Clone)]
pub struct CounterRow {
    pub ts: i64,
    pub track: TrackId,
    pub value: f64,
    pub arg_set: Option<ArgSetId>,
}

/// A generically-decoded event, kept for introspection next to whatever the
/// specialized handlers produced.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub ts: i64,
    pub name: StringId,
    pub cpu: u32,
    pub utid: Utid,
    pub arg_set: ArgSetId,
}

#[derive(Debug, Clone)]
pub struct ArgRow {
    pub set: ArgSetId,
    pub key: StringId,
    pub value: ArgValue,
}

/// Keys of the session metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    TracingStartedNs,
    AllDataSourcesStartedNs,
    FtraceLatestDataStartNs,
    UniqueSessionName,
    FtraceSetupErrors,
    AtraceErrors,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Int(i64),
    Str(String),
}

/// The backing tables produced by the import: tracks, slices, counters, raw
/// events, args, metadata and stats. All tables are append-only; rows are
/// written once and never deleted.
#[derive(Debug, Default)]
pub struct TraceStorage {
    strings: Vec<String>,
    string_ids: HashMap<String, StringId>,
    tracks: Vec<TrackRow>,
    slices: Vec<SliceRow>,
    counters: Vec<CounterRow>,
    raw_events: Vec<RawRow>,
    args: Vec<ArgRow>,
    metadata: Vec<(MetadataKey, MetadataValue)>,
    next_arg_set: u32,
    pub stats: StatsStore,
}

impl TraceStorage {
    pub fn new() -> Self {
        let mut storage = Self::default();
        // Id 0 is always the empty string.
        storage.intern("");
        storage
    }

    /// Intern a string; the same text always yields the same id.
    pub fn intern(&mut self, text: &str) -> StringId {
        if let Some(&id) = self.string_ids.get(text) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(text.to_owned());
        self.string_ids.insert(text.to_owned(), id);
        id
    }

    /// Intern raw bytes, replacing invalid utf-8 lossily.
    pub fn intern_bytes(&mut self, bytes: &[u8]) -> StringId {
        match std::str::from_utf8(bytes) {
            Ok(s) => self.intern(s),
            Err(_) => {
                let lossy = String::from_utf8_lossy(bytes).into_owned();
                self.intern(&lossy)
            }
        }
    }

    pub fn string(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub(crate) fn new_track(
        &mut self,
        classification: TrackClassification,
        name: Option<StringId>,
    ) -> TrackId {
        let id = TrackId(self.tracks.len() as u32);
        self.tracks.push(TrackRow {
            classification,
            name,
        });
        id
    }

    pub fn tracks(&self) -> &[TrackRow] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> &TrackRow {
        &self.tracks[id.0 as usize]
    }

    pub(crate) fn push_slice(
        &mut self,
        ts: i64,
        dur: i64,
        track: TrackId,
        category: Option<StringId>,
        name: Option<StringId>,
        depth: u32,
        arg_set: ArgSetId,
    ) -> SliceRowId {
        let id = SliceRowId(self.slices.len() as u32);
        self.slices.push(SliceRow {
            ts,
            dur,
            track,
            category,
            name,
            depth,
            arg_set,
        });
        id
    }

    /// Close an open slice. The duration saturates at zero so that a closed
    /// slice never ends before it begins.
    pub(crate) fn close_slice(&mut self, id: SliceRowId, end_ts: i64) {
        let row = &mut self.slices[id.0 as usize];
        row.dur = (end_ts - row.ts).max(0);
    }

    pub fn slices(&self) -> &[SliceRow] {
        &self.slices
    }

    pub fn slice(&self, id: SliceRowId) -> &SliceRow {
        &self.slices[id.0 as usize]
    }

    pub(crate) fn push_counter(&mut self, ts: i64, track: TrackId, value: f64) -> CounterRowId {
        let id = CounterRowId(self.counters.len() as u32);
        self.counters.push(CounterRow {
            ts,
            track,
            value,
            arg_set: None,
        });
        id
    }

    pub(crate) fn push_counter_with_args(
        &mut self,
        ts: i64,
        track: TrackId,
        value: f64,
        args: &[(StringId, ArgValue)],
    ) -> CounterRowId {
        let arg_set = self.new_arg_set();
        self.add_args(arg_set, args);
        let id = CounterRowId(self.counters.len() as u32);
        self.counters.push(CounterRow {
            ts,
            track,
            value,
            arg_set: Some(arg_set),
        });
        id
    }

    pub fn counters(&self) -> &[CounterRow] {
        &self.counters
    }

    pub(crate) fn push_raw(
        &mut self,
        ts: i64,
        name: StringId,
        cpu: u32,
        utid: Utid,
    ) -> (RawRowId, ArgSetId) {
        let arg_set = self.new_arg_set();
        let id = RawRowId(self.raw_events.len() as u32);
        self.raw_events.push(RawRow {
            ts,
            name,
            cpu,
            utid,
            arg_set,
        });
        (id, arg_set)
    }

    pub fn raw_events(&self) -> &[RawRow] {
        &self.raw_events
    }

    pub(crate) fn new_arg_set(&mut self) -> ArgSetId {
        let id = ArgSetId(self.next_arg_set);
        self.next_arg_set += 1;
        id
    }

    pub(crate) fn add_arg(&mut self, set: ArgSetId, key: StringId, value: ArgValue) {
        self.args.push(ArgRow { set, key, value });
    }

    pub(crate) fn add_args(&mut self, set: ArgSetId, args: &[(StringId, ArgValue)]) {
        for &(key, value) in args {
            self.add_arg(set, key, value);
        }
    }

    pub fn args(&self) -> &[ArgRow] {
        &self.args
    }

    /// The arguments of one arg set, in insertion order.
    pub fn args_for(&self, set: ArgSetId) -> impl Iterator<Item = &ArgRow> {
        self.args.iter().filter(move |row| row.set == set)
    }

    pub fn set_metadata(&mut self, key: MetadataKey, value: MetadataValue) {
        self.metadata.push((key, value));
    }

    /// Append a string row under `key`. Multiple rows per key are allowed.
    pub fn append_metadata_str(&mut self, key: MetadataKey, value: &str) {
        self.metadata.push((key, MetadataValue::Str(value.to_owned())));
    }

    pub fn metadata(&self) -> &[(MetadataKey, MetadataValue)] {
        &self.metadata
    }

    /// The most recently written integer value for `key`, if any.
    pub fn metadata_int(&self, key: MetadataKey) -> Option<i64> {
        self.metadata.iter().rev().find_map(|(k, v)| match v {
            MetadataValue::Int(value) if *k == key => Some(*value),
            _ => None,
        })
    }

    /// The most recently written string value for `key`, if any.
    pub fn metadata_str(&self, key: MetadataKey) -> Option<&str> {
        self.metadata.iter().rev().find_map(|(k, v)| match v {
            MetadataValue::Str(value) if *k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn increment_stat(&mut self, stat: Stat) {
        self.stats.add(stat, 1);
    }
}

#[cfg(test)]
mod test {
    use super::{MetadataKey, MetadataValue, TraceStorage};

    #[test]
    fn interning_is_idempotent() {
        let mut storage = TraceStorage::new();
        let a = storage.intern("irq/31-dwc3");
        let b = storage.intern("irq/31-dwc3");
        assert_eq!(a, b);
        assert_eq!(storage.string(a), "irq/31-dwc3");
        let c = storage.intern("irq/32-dwc3");
        assert_ne!(a, c);
    }

    #[test]
    fn metadata_last_write_wins_for_reads() {
        let mut storage = TraceStorage::new();
        assert_eq!(storage.metadata_int(MetadataKey::TracingStartedNs), None);
        storage.set_metadata(MetadataKey::TracingStartedNs, MetadataValue::Int(100));
        storage.set_metadata(MetadataKey::TracingStartedNs, MetadataValue::Int(200));
        assert_eq!(storage.metadata_int(MetadataKey::TracingStartedNs), Some(200));
        // Rows are kept, not replaced.
        assert_eq!(storage.metadata().len(), 2);
    }
}
