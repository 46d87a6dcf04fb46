use std::collections::HashMap;

/// A named health counter.
///
/// Scalar stats count pipeline-wide conditions; the `FTRACE_CPU_*` stats are
/// indexed by cpu and additionally split into a begin and an end phase
/// snapshot, with a delta recorded between them where both exist.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stat(pub u16);

impl Stat {
    pub const FTRACE_PACKET_BEFORE_TRACING_START: Self = Self(0);
    pub const FTRACE_ABI_ERRORS_SKIPPED_ZERO_DATA_LENGTH: Self = Self(1);
    pub const FTRACE_ABI_ERRORS_SKIPPED: Self = Self(2);
    pub const FTRACE_BAD_FIELD_TYPE: Self = Self(3);
    pub const FTRACE_UNKNOWN_EVENT_FIELD: Self = Self(4);
    pub const FTRACE_MALFORMED_EVENT: Self = Self(5);
    pub const KERNEL_SYMBOL_FALLBACK: Self = Self(6);
    pub const SLICE_END_WITHOUT_BEGIN: Self = Self(7);
    pub const MM_EVENT_UNKNOWN_TYPE: Self = Self(8);
    pub const SOFTIRQ_UNKNOWN_ACTION: Self = Self(9);
    pub const INET_SOCK_STATE_UNSUPPORTED: Self = Self(10);
    pub const GPU_MEM_NO_PROCESS: Self = Self(11);
    pub const FTRACE_KERNEL_SYMBOLS_PARSED: Self = Self(12);
    pub const FTRACE_KERNEL_SYMBOLS_MEM_KB: Self = Self(13);

    pub const FTRACE_CPU_ENTRIES_BEGIN: Self = Self(14);
    pub const FTRACE_CPU_ENTRIES_END: Self = Self(15);
    pub const FTRACE_CPU_ENTRIES_DELTA: Self = Self(16);
    pub const FTRACE_CPU_OVERRUN_BEGIN: Self = Self(17);
    pub const FTRACE_CPU_OVERRUN_END: Self = Self(18);
    pub const FTRACE_CPU_OVERRUN_DELTA: Self = Self(19);
    pub const FTRACE_CPU_COMMIT_OVERRUN_BEGIN: Self = Self(20);
    pub const FTRACE_CPU_COMMIT_OVERRUN_END: Self = Self(21);
    pub const FTRACE_CPU_COMMIT_OVERRUN_DELTA: Self = Self(22);
    pub const FTRACE_CPU_BYTES_READ_BEGIN: Self = Self(23);
    pub const FTRACE_CPU_BYTES_READ_END: Self = Self(24);
    pub const FTRACE_CPU_BYTES_READ_DELTA: Self = Self(25);
    pub const FTRACE_CPU_DROPPED_EVENTS_BEGIN: Self = Self(26);
    pub const FTRACE_CPU_DROPPED_EVENTS_END: Self = Self(27);
    pub const FTRACE_CPU_DROPPED_EVENTS_DELTA: Self = Self(28);
    pub const FTRACE_CPU_READ_EVENTS_BEGIN: Self = Self(29);
    pub const FTRACE_CPU_READ_EVENTS_END: Self = Self(30);
    pub const FTRACE_CPU_READ_EVENTS_DELTA: Self = Self(31);
    pub const FTRACE_CPU_OLDEST_EVENT_TS_BEGIN: Self = Self(32);
    pub const FTRACE_CPU_OLDEST_EVENT_TS_END: Self = Self(33);
    pub const FTRACE_CPU_NOW_TS_BEGIN: Self = Self(34);
    pub const FTRACE_CPU_NOW_TS_END: Self = Self(35);

    pub const FTRACE_SETUP_ERRORS: Self = Self(36);

    pub fn name(self) -> &'static str {
        match self {
            Self::FTRACE_PACKET_BEFORE_TRACING_START => "ftrace_packet_before_tracing_start",
            Self::FTRACE_ABI_ERRORS_SKIPPED_ZERO_DATA_LENGTH => {
                "ftrace_abi_errors_skipped_zero_data_length"
            }
            Self::FTRACE_ABI_ERRORS_SKIPPED => "ftrace_abi_errors_skipped",
            Self::FTRACE_BAD_FIELD_TYPE => "ftrace_bad_field_type",
            Self::FTRACE_UNKNOWN_EVENT_FIELD => "ftrace_unknown_event_field",
            Self::FTRACE_MALFORMED_EVENT => "ftrace_malformed_event",
            Self::KERNEL_SYMBOL_FALLBACK => "kernel_symbol_fallback",
            Self::SLICE_END_WITHOUT_BEGIN => "slice_end_without_begin",
            Self::MM_EVENT_UNKNOWN_TYPE => "mm_event_unknown_type",
            Self::SOFTIRQ_UNKNOWN_ACTION => "softirq_unknown_action",
            Self::INET_SOCK_STATE_UNSUPPORTED => "inet_sock_state_unsupported",
            Self::GPU_MEM_NO_PROCESS => "gpu_mem_no_process",
            Self::FTRACE_KERNEL_SYMBOLS_PARSED => "ftrace_kernel_symbols_parsed",
            Self::FTRACE_KERNEL_SYMBOLS_MEM_KB => "ftrace_kernel_symbols_mem_kb",
            Self::FTRACE_CPU_ENTRIES_BEGIN => "ftrace_cpu_entries_begin",
            Self::FTRACE_CPU_ENTRIES_END => "ftrace_cpu_entries_end",
            Self::FTRACE_CPU_ENTRIES_DELTA => "ftrace_cpu_entries_delta",
            Self::FTRACE_CPU_OVERRUN_BEGIN => "ftrace_cpu_overrun_begin",
            Self::FTRACE_CPU_OVERRUN_END => "ftrace_cpu_overrun_end",
            Self::FTRACE_CPU_OVERRUN_DELTA => "ftrace_cpu_overrun_delta",
            Self::FTRACE_CPU_COMMIT_OVERRUN_BEGIN => "ftrace_cpu_commit_overrun_begin",
            Self::FTRACE_CPU_COMMIT_OVERRUN_END => "ftrace_cpu_commit_overrun_end",
            Self::FTRACE_CPU_COMMIT_OVERRUN_DELTA => "ftrace_cpu_commit_overrun_delta",
            Self::FTRACE_CPU_BYTES_READ_BEGIN => "ftrace_cpu_bytes_read_begin",
            Self::FTRACE_CPU_BYTES_READ_END => "ftrace_cpu_bytes_read_end",
            Self::FTRACE_CPU_BYTES_READ_DELTA => "ftrace_cpu_bytes_read_delta",
            Self::FTRACE_CPU_DROPPED_EVENTS_BEGIN => "ftrace_cpu_dropped_events_begin",
            Self::FTRACE_CPU_DROPPED_EVENTS_END => "ftrace_cpu_dropped_events_end",
            Self::FTRACE_CPU_DROPPED_EVENTS_DELTA => "ftrace_cpu_dropped_events_delta",
            Self::FTRACE_CPU_READ_EVENTS_BEGIN => "ftrace_cpu_read_events_begin",
            Self::FTRACE_CPU_READ_EVENTS_END => "ftrace_cpu_read_events_end",
            Self::FTRACE_CPU_READ_EVENTS_DELTA => "ftrace_cpu_read_events_delta",
            Self::FTRACE_CPU_OLDEST_EVENT_TS_BEGIN => "ftrace_cpu_oldest_event_ts_begin",
            Self::FTRACE_CPU_OLDEST_EVENT_TS_END => "ftrace_cpu_oldest_event_ts_end",
            Self::FTRACE_CPU_NOW_TS_BEGIN => "ftrace_cpu_now_ts_begin",
            Self::FTRACE_CPU_NOW_TS_END => "ftrace_cpu_now_ts_end",
            Self::FTRACE_SETUP_ERRORS => "ftrace_setup_errors",
            _ => "unknown",
        }
    }
}

impl std::fmt::Debug for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name();
        if name == "unknown" {
            f.write_fmt(format_args!("Unknown Stat {}", self.0))
        } else {
            name.fmt(f)
        }
    }
}

/// The phase an ftrace stats snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPhase {
    Start,
    End,
}

impl StatsPhase {
    /// Decode the wire value. Zero is "unspecified" and anything else we
    /// don't recognize; both are rejected.
    pub fn from_int(value: u64) -> Option<Self> {
        match value {
            1 => Some(StatsPhase::Start),
            2 => Some(StatsPhase::End),
            _ => None,
        }
    }
}

/// Scalar and (stat, cpu)-indexed counters.
#[derive(Debug, Default)]
pub struct StatsStore {
    scalar: HashMap<Stat, i64>,
    indexed: HashMap<(Stat, u32), i64>,
}

impl StatsStore {
    pub fn add(&mut self, stat: Stat, delta: i64) {
        *self.scalar.entry(stat).or_insert(0) += delta;
    }

    pub fn set(&mut self, stat: Stat, value: i64) {
        self.scalar.insert(stat, value);
    }

    /// The scalar value, zero if never touched.
    pub fn get(&self, stat: Stat) -> i64 {
        self.scalar.get(&stat).copied().unwrap_or(0)
    }

    pub fn set_indexed(&mut self, stat: Stat, cpu: u32, value: i64) {
        self.indexed.insert((stat, cpu), value);
    }

    /// The per-cpu value. `None` means the value was never recorded, which
    /// callers must treat differently from zero.
    pub fn get_indexed(&self, stat: Stat, cpu: u32) -> Option<i64> {
        self.indexed.get(&(stat, cpu)).copied()
    }
}

#[cfg(test)]
mod test {
    use super::{Stat, StatsPhase, StatsStore};

    #[test]
    fn indexed_absence_is_not_zero() {
        let mut stats = StatsStore::default();
        stats.set_indexed(Stat::FTRACE_CPU_ENTRIES_BEGIN, 2, 100);
        assert_eq!(stats.get_indexed(Stat::FTRACE_CPU_ENTRIES_BEGIN, 2), Some(100));
        assert_eq!(stats.get_indexed(Stat::FTRACE_CPU_ENTRIES_BEGIN, 3), None);
    }

    #[test]
    fn phase_decoding() {
        assert_eq!(StatsPhase::from_int(1), Some(StatsPhase::Start));
        assert_eq!(StatsPhase::from_int(2), Some(StatsPhase::End));
        assert_eq!(StatsPhase::from_int(0), None);
        assert_eq!(StatsPhase::from_int(7), None);
    }
}
