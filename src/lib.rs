//! An ingest engine for kernel ftrace events.
//!
//! The input is a stream of self-describing binary envelopes, one per kernel
//! event. Each envelope carries a timestamp, the emitting pid and one payload
//! field whose field number identifies the event type. [`FtraceParser`]
//! consumes the stream in timestamp order and fills the columnar tables of a
//! [`TraceStorage`]: named tracks, nested begin/end slices, counter samples,
//! a generic raw-event table and per-cpu tracer statistics.
//!
//! Typed handlers cover the scheduler, interrupt, memory, network and power
//! management subsystems. Every other known event still lands in the raw
//! table, decoded through its static field descriptor; events that describe
//! their own schema inline go through the [`generic`] layout. A drop window
//! resolved from session metadata cuts off events recorded before the
//! tracing session was fully up.
//!
//! # Example
//!
//! ```
//! use ftrace_ingest::{Config, EventId, FtraceParser, MessageBuilder};
//!
//! # fn main() -> Result<(), ftrace_ingest::Error> {
//! let mut parser = FtraceParser::new(Config::default());
//!
//! // One cpu_frequency event at 88ms, emitted by pid 4 on cpu 0.
//! let mut freq = MessageBuilder::new();
//! freq.varint(1, 1_804_800).varint(2, 0);
//! let mut envelope = MessageBuilder::new();
//! envelope
//!     .varint(1, 88_000_000)
//!     .varint(2, 4)
//!     .message(EventId::CPU_FREQUENCY.0, &freq);
//! parser.parse_event(0, 88_000_000, &envelope.build(), 1)?;
//!
//! let storage = parser.into_storage();
//! for counter in storage.counters() {
//!     let track = storage.track(counter.track);
//!     println!("{:?} = {}", track.classification, counter.value);
//! }
//! # Ok(())
//! # }
//! ```

mod classification;
mod config;
mod context;
mod drop_window;
mod error;
mod event;
mod handlers;
mod interner;
mod parser;
mod process;
mod slice;
mod stats;
mod storage;
mod track;
mod track_set;
mod wire;

pub use classification::TrackClassification;
pub use config::{Config, DropPolicy, SoftDropPolicy, LIGHTWEIGHT_BATTERY_SESSION};
pub use drop_window::DropWindow;
pub use error::{Error, ReadError};
pub use event::generic;
pub use event::{
    descriptor, EventDescriptor, EventId, FieldDescriptor, FieldType, PID_FIELD, TIMESTAMP_FIELD,
};
pub use parser::FtraceParser;
pub use process::{
    ProcessRow, ProcessTracker, ThreadNamePriority, ThreadRow, Ucpu, Upid, Utid,
};
pub use stats::{Stat, StatsPhase, StatsStore};
pub use storage::{
    ArgRow, ArgSetId, ArgValue, CounterRow, CounterRowId, MetadataKey, MetadataValue, RawRow,
    RawRowId, SliceRow, SliceRowId, StringId, TraceStorage, TrackId, TrackRow,
};
pub use wire::{FieldIter, FieldValue, MessageBuilder};
