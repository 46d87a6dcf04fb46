/// When timestamps before the trace's start marker should be discarded
/// outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Keep everything, even events recorded before tracing started.
    NoDrop,
    /// Drop before the moment every data source reported started.
    AllDataSourcesStarted,
    /// Drop before the moment the tracing session itself started.
    #[default]
    TracingStarted,
}

/// When events should be kept out of the reconstructed timeline but still
/// written to the raw table for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftDropPolicy {
    NoDrop,
    /// Suppress timeline output until every per-cpu ring buffer has valid
    /// data, so that cross-cpu state machines don't see a lopsided prefix.
    #[default]
    AllCpuBuffersValid,
}

/// Ingestion knobs. [`Config::default`] matches what the interactive UI
/// uses.
#[derive(Debug, Clone)]
pub struct Config {
    pub drop_before: DropPolicy,
    pub soft_drop_before: SoftDropPolicy,
    /// Write every decoded event into the raw table, on top of whatever the
    /// typed handlers produce.
    pub ingest_raw_events: bool,
    /// The trace was recorded in ring-buffer mode and old data is expected;
    /// disables hard dropping entirely.
    pub preserve_ring_buffer: bool,
    /// Downgrade kernel ABI decode errors from fatal to a counted stat.
    pub ignore_abi_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drop_before: DropPolicy::default(),
            soft_drop_before: SoftDropPolicy::default(),
            ingest_raw_events: true,
            preserve_ring_buffer: false,
            ignore_abi_errors: false,
        }
    }
}

/// Session name that opts out of soft dropping: its battery counters are
/// emitted before the cpu buffers fill and would otherwise be lost.
pub const LIGHTWEIGHT_BATTERY_SESSION: &str = "session_with_lightweight_battery_tracing";
