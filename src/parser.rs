//! The envelope dispatcher.
//!
//! [`FtraceParser`] consumes one trace's event stream in timestamp order.
//! Each envelope carries a timestamp field, the emitting pid and one event
//! payload whose field number identifies the event type. Payloads run
//! through two independent paths: a generic pass into the raw debug table,
//! and a typed pass through the per-family handlers that build tracks,
//! slices and counters. A drop window resolved once from session metadata
//! gates both paths.
//!
//! Decode problems inside a payload are counted, never fatal; only a broken
//! envelope, a missing pid or the conditions listed on [`Error`] abort.

use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::context::Context;
use crate::drop_window::DropWindow;
use crate::error::{Error, ReadError};
use crate::event::{descriptor, generic, EventId, FieldType, PID_FIELD, TIMESTAMP_FIELD};
use crate::handlers;
use crate::handlers::net::NetState;
use crate::handlers::power::PowerState;
use crate::interner::{kernel_symbol_or_fallback, SequenceState};
use crate::process::ProcessTracker;
use crate::stats::{Stat, StatsPhase};
use crate::storage::{ArgValue, MetadataKey, TraceStorage};
use crate::wire::FieldIter;

/// Sub-kind of ABI error that is prevalent in the wild (zero-padded ring
/// buffer pages) and does not affect the payload; always downgraded.
const ABI_ZERO_DATA_LENGTH: u64 = 4;

fn abi_error_name(code: u64) -> &'static str {
    match code {
        1 => "abi_short_read",
        2 => "abi_invalid_page_header",
        3 => "abi_invalid_event",
        4 => "abi_zero_data_length",
        5 => "abi_invalid_data_length",
        6 => "abi_end_overflow",
        7 => "compact_sched_switch_corrupt",
        _ => "unknown",
    }
}

/// Decodes kernel trace event envelopes into the storage tables.
pub struct FtraceParser {
    ctx: Context,
    /// Resolved from metadata when the first event arrives, `None` before.
    window: Option<DropWindow>,
    sequences: HashMap<u32, SequenceState>,
    /// Sequences whose setup errors were already recorded.
    seen_error_sequences: HashSet<u32>,
    net: NetState,
    power: PowerState,
}

impl FtraceParser {
    pub fn new(config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            window: None,
            sequences: HashMap::new(),
            seen_error_sequences: HashSet::new(),
            net: NetState::new(),
            power: PowerState::new(),
        }
    }

    /// The tables built so far.
    pub fn storage(&self) -> &TraceStorage {
        &self.ctx.storage
    }

    /// Mutable table access, mainly for writing the session metadata the
    /// drop window is resolved from. Metadata written after the first event
    /// no longer affects the window.
    pub fn storage_mut(&mut self) -> &mut TraceStorage {
        &mut self.ctx.storage
    }

    pub fn into_storage(self) -> TraceStorage {
        self.ctx.storage
    }

    /// The thread and process registry built from task lifecycle events.
    pub fn processes(&self) -> &ProcessTracker {
        &self.ctx.processes
    }

    /// Registers a kernel symbol in `sequence_id`'s interning table. Symbol
    /// ids are only meaningful within that sequence's current generation.
    pub fn add_kernel_symbol(&mut self, sequence_id: u32, iid: u64, name: &str) {
        self.sequences
            .entry(sequence_id)
            .or_default()
            .add_kernel_symbol(iid, name.to_owned());
    }

    /// Drops `sequence_id`'s interned state. Symbol ids seen afterwards
    /// belong to a new generation and resolve against a fresh table.
    pub fn clear_incremental_state(&mut self, sequence_id: u32) {
        if let Some(sequence) = self.sequences.get_mut(&sequence_id) {
            sequence.clear_incremental_state();
        }
    }

    /// Decode and dispatch one event envelope.
    ///
    /// `ts` was already extracted by the outer packet reader; the timestamp
    /// field inside `data` is not re-read. The first call freezes the drop
    /// window from whatever metadata is present at that point.
    pub fn parse_event(
        &mut self,
        cpu: u32,
        ts: i64,
        data: &[u8],
        sequence_id: u32,
    ) -> Result<(), Error> {
        let window = match self.window {
            Some(window) => window,
            None => {
                let window = DropWindow::from_metadata(&self.ctx.config, &self.ctx.storage);
                self.window = Some(window);
                window
            }
        };
        if window.is_hard_dropped(ts) {
            self.ctx
                .storage
                .increment_stat(Stat::FTRACE_PACKET_BEFORE_TRACING_START);
            return Ok(());
        }

        let pid_field = FieldIter::new(data).find(PID_FIELD);
        let no_pid = pid_field.is_none();
        let pid = pid_field.and_then(|v| v.as_u64()).unwrap_or(0) as u32 as i64;

        let sequence = self.sequences.entry(sequence_id).or_default();
        let ctx = &mut self.ctx;

        for field in FieldIter::new(data) {
            let (field_number, value) = field?;
            if field_number == TIMESTAMP_FIELD || field_number == PID_FIELD {
                continue;
            }
            let event = EventId(field_number);
            if no_pid && !event.is_pidless() {
                return Err(Error::MissingPidField);
            }
            let Some(payload) = value.as_bytes() else {
                ctx.storage.increment_stat(Stat::FTRACE_MALFORMED_EVENT);
                continue;
            };

            if event == EventId::GENERIC {
                if parse_generic(ctx, ts, cpu, pid, payload).is_err() {
                    ctx.storage.increment_stat(Stat::FTRACE_MALFORMED_EVENT);
                }
                continue;
            }
            if ctx.config.ingest_raw_events
                && typed_to_raw(ctx, sequence, event, ts, cpu, pid, payload).is_err()
            {
                ctx.storage.increment_stat(Stat::FTRACE_MALFORMED_EVENT);
            }

            // Below the soft cutoff only the raw table is fed. The handler
            // state machines must not see begins whose matching ends sit in
            // per-cpu buffers that were not yet recording.
            if window.is_soft_dropped(ts) {
                continue;
            }

            let handled = match event {
                EventId::SCHED_WAKEUP => handlers::sched::sched_wakeup(ctx, ts, pid, payload),
                EventId::SCHED_WAKING => handlers::sched::sched_waking(ctx, ts, pid, payload),
                EventId::SCHED_BLOCKED_REASON => {
                    handlers::sched::sched_blocked_reason(ctx, sequence, ts, payload)
                }
                EventId::TASK_NEWTASK => handlers::sched::task_newtask(ctx, pid, payload),
                EventId::TASK_RENAME => handlers::sched::task_rename(ctx, payload),
                EventId::SIGNAL_GENERATE => handlers::sched::signal_generate(ctx, ts, payload),
                EventId::SIGNAL_DELIVER => {
                    handlers::sched::signal_deliver(ctx, ts, pid, payload)
                }
                EventId::SCM_CALL_START => {
                    handlers::sched::scm_call_start(ctx, ts, pid, payload)
                }
                EventId::SCM_CALL_END => handlers::sched::scm_call_end(ctx, ts, pid),
                EventId::KPROBE => handlers::sched::kprobe(ctx, ts, pid, payload),

                EventId::CPU_FREQUENCY => handlers::cpu::cpu_frequency(ctx, ts, payload),
                EventId::CPU_FREQUENCY_LIMITS => {
                    handlers::cpu::cpu_frequency_limits(ctx, ts, payload)
                }
                EventId::CPU_IDLE => handlers::cpu::cpu_idle(ctx, ts, payload),
                EventId::SCHED_CPU_UTIL_CFS => {
                    handlers::cpu::sched_cpu_util_cfs(ctx, ts, payload)
                }
                EventId::GPU_FREQUENCY => handlers::cpu::gpu_frequency(ctx, ts, payload),
                EventId::KGSL_GPU_FREQUENCY => {
                    handlers::cpu::kgsl_gpu_frequency(ctx, ts, payload)
                }
                EventId::FUNCGRAPH_ENTRY => {
                    handlers::cpu::funcgraph_entry(ctx, sequence, ts, pid, cpu, payload)
                }
                EventId::FUNCGRAPH_EXIT => {
                    handlers::cpu::funcgraph_exit(ctx, sequence, ts, pid, cpu, payload)
                }

                EventId::IRQ_HANDLER_ENTRY => {
                    handlers::irq::irq_handler_entry(ctx, ts, cpu, payload)
                }
                EventId::IRQ_HANDLER_EXIT => {
                    handlers::irq::irq_handler_exit(ctx, ts, cpu, payload)
                }
                EventId::SOFTIRQ_ENTRY => handlers::irq::softirq_entry(ctx, ts, cpu, payload),
                EventId::SOFTIRQ_EXIT => handlers::irq::softirq_exit(ctx, ts, cpu, payload),
                EventId::WORKQUEUE_EXECUTE_START => {
                    handlers::irq::workqueue_execute_start(ctx, sequence, ts, pid, cpu, payload)
                }
                EventId::WORKQUEUE_EXECUTE_END => {
                    handlers::irq::workqueue_execute_end(ctx, ts, pid)
                }
                EventId::WORKQUEUE_QUEUE_WORK => {
                    handlers::irq::workqueue_queue_work(ctx, sequence, ts, pid, payload)
                }

                EventId::OOM_SCORE_ADJ_UPDATE => {
                    handlers::mem::oom_score_adj_update(ctx, ts, payload)
                }
                EventId::MARK_VICTIM => handlers::mem::mark_victim(ctx, ts, payload),
                EventId::MM_EVENT_RECORD => {
                    handlers::mem::mm_event_record(ctx, ts, pid, payload)
                }
                EventId::ION_HEAP_GROW => {
                    handlers::mem::ion_heap_change(ctx, ts, pid, payload, true)
                }
                EventId::ION_HEAP_SHRINK => {
                    handlers::mem::ion_heap_change(ctx, ts, pid, payload, false)
                }
                EventId::ION_STAT => handlers::mem::ion_stat(ctx, ts, pid, payload),
                EventId::DMA_HEAP_STAT => handlers::mem::dma_heap_stat(ctx, ts, pid, payload),
                EventId::GPU_MEM_TOTAL => handlers::mem::gpu_mem_total(ctx, ts, payload),
                EventId::MM_VMSCAN_DIRECT_RECLAIM_BEGIN => {
                    handlers::mem::direct_reclaim_begin(ctx, ts, pid, payload)
                }
                EventId::MM_VMSCAN_DIRECT_RECLAIM_END => {
                    handlers::mem::direct_reclaim_end(ctx, ts, pid, payload)
                }
                EventId::MM_SHRINK_SLAB_START => {
                    handlers::mem::shrink_slab_start(ctx, sequence, ts, pid, payload)
                }
                EventId::MM_SHRINK_SLAB_END => {
                    handlers::mem::shrink_slab_end(ctx, ts, pid, payload)
                }

                EventId::NETIF_RECEIVE_SKB => {
                    handlers::net::netif_receive_skb(ctx, &mut self.net, ts, cpu, payload)
                }
                EventId::NET_DEV_XMIT => {
                    handlers::net::net_dev_xmit(ctx, &mut self.net, ts, cpu, payload)
                }
                EventId::INET_SOCK_SET_STATE => {
                    handlers::net::inet_sock_set_state(ctx, &mut self.net, ts, pid, payload)
                }
                EventId::TCP_RETRANSMIT_SKB => {
                    handlers::net::tcp_retransmit_skb(ctx, ts, payload)
                }
                EventId::NAPI_GRO_RECEIVE_ENTRY => {
                    handlers::net::napi_gro_receive_entry(ctx, ts, cpu, payload)
                }
                EventId::NAPI_GRO_RECEIVE_EXIT => {
                    handlers::net::napi_gro_receive_exit(ctx, ts, cpu, payload)
                }
                EventId::KFREE_SKB => {
                    handlers::net::kfree_skb(ctx, &mut self.net, ts, payload)
                }

                EventId::CLOCK_SET_RATE => handlers::power::clock_set_rate(ctx, ts, payload),
                EventId::CLOCK_ENABLE => handlers::power::clock_enable(ctx, ts, payload),
                EventId::CLOCK_DISABLE => handlers::power::clock_disable(ctx, ts, payload),
                EventId::SUSPEND_RESUME => {
                    handlers::power::suspend_resume(ctx, &mut self.power, ts, pid, cpu, payload)
                }
                EventId::SUSPEND_RESUME_MINIMAL => {
                    handlers::power::suspend_resume_minimal(ctx, ts, payload)
                }
                EventId::WAKEUP_SOURCE_ACTIVATE => {
                    handlers::power::wakeup_source_activate(ctx, &mut self.power, ts, payload)
                }
                EventId::WAKEUP_SOURCE_DEACTIVATE => {
                    handlers::power::wakeup_source_deactivate(ctx, &mut self.power, ts, payload)
                }
                EventId::RPM_STATUS => {
                    handlers::power::rpm_status(ctx, &mut self.power, ts, payload)
                }
                EventId::DEVICE_PM_CALLBACK_START => handlers::power::device_pm_callback_start(
                    ctx,
                    &mut self.power,
                    ts,
                    pid,
                    cpu,
                    payload,
                ),
                EventId::DEVICE_PM_CALLBACK_END => {
                    handlers::power::device_pm_callback_end(ctx, &mut self.power, ts, payload)
                }
                EventId::DEVFREQ_FREQUENCY => {
                    handlers::power::devfreq_frequency(ctx, ts, payload)
                }
                EventId::BCL_IRQ_TRIGGER => handlers::power::bcl_irq_trigger(ctx, ts, payload),
                EventId::CROS_EC_SENSORHUB_DATA => {
                    handlers::power::cros_ec_sensorhub_data(ctx, ts, payload)
                }
                EventId::UFSHCD_CLK_GATING => {
                    handlers::power::ufshcd_clk_gating(ctx, ts, payload)
                }
                EventId::UFSHCD_COMMAND => handlers::power::ufshcd_command(ctx, ts, payload),

                // Everything else only feeds the raw table: print markers,
                // context switches, softirq raises, the hypervisor pair and
                // any tag this build does not know.
                _ => Ok(()),
            };
            if handled.is_err() {
                ctx.storage.increment_stat(Stat::FTRACE_MALFORMED_EVENT);
            }
        }
        Ok(())
    }

    /// Decode one per-trace stats bundle.
    ///
    /// The bundle carries a phase marker (start or end of trace), one
    /// per-cpu ring buffer snapshot per cpu, tracer setup errors and the
    /// kernel reader's own parse status codes.
    pub fn parse_ftrace_stats(&mut self, sequence_id: u32, data: &[u8]) -> Result<(), Error> {
        let phase_raw = FieldIter::new(data)
            .find(1)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let phase =
            StatsPhase::from_int(phase_raw).ok_or(Error::UnknownStatsPhase(phase_raw))?;

        let mut failed_events: Vec<&[u8]> = Vec::new();
        let mut unknown_events: Vec<&[u8]> = Vec::new();
        let mut atrace_errors: Option<&[u8]> = None;
        let mut preserve_buffer = false;
        let mut parse_errors: Vec<u64> = Vec::new();

        for field in FieldIter::new(data) {
            match field? {
                (2, value) => {
                    if let Some(fields) = value.as_message() {
                        if per_cpu_stats(&mut self.ctx.storage, phase, fields).is_err() {
                            self.ctx
                                .storage
                                .increment_stat(Stat::FTRACE_MALFORMED_EVENT);
                        }
                    }
                }
                (3, value) => {
                    let parsed = value.as_u64().unwrap_or(0) as i64;
                    self.ctx
                        .storage
                        .stats
                        .set(Stat::FTRACE_KERNEL_SYMBOLS_PARSED, parsed);
                }
                (4, value) => {
                    let mem_kb = value.as_u64().unwrap_or(0) as i64;
                    self.ctx
                        .storage
                        .stats
                        .set(Stat::FTRACE_KERNEL_SYMBOLS_MEM_KB, mem_kb);
                }
                (5, value) => atrace_errors = value.as_bytes(),
                (6, value) => {
                    if let Some(name) = value.as_bytes() {
                        unknown_events.push(name);
                    }
                }
                (7, value) => {
                    if let Some(name) = value.as_bytes() {
                        failed_events.push(name);
                    }
                }
                (8, value) => preserve_buffer = value.as_bool().unwrap_or(false),
                (9, value) => {
                    if let Some(code) = value.as_u64() {
                        parse_errors.push(code);
                    }
                }
                _ => {}
            }
        }

        if phase == StatsPhase::Start {
            // Setup errors repeat identically in every start bundle of a
            // sequence; record them once.
            if !self.seen_error_sequences.contains(&sequence_id) {
                let mut errors = String::new();
                for name in &failed_events {
                    self.ctx.storage.increment_stat(Stat::FTRACE_SETUP_ERRORS);
                    errors.push_str("Ftrace event failed: ");
                    errors.push_str(&String::from_utf8_lossy(name));
                    errors.push('\n');
                }
                for name in &unknown_events {
                    self.ctx.storage.increment_stat(Stat::FTRACE_SETUP_ERRORS);
                    errors.push_str("Ftrace event unknown: ");
                    errors.push_str(&String::from_utf8_lossy(name));
                    errors.push('\n');
                }
                if let Some(atrace) = atrace_errors.filter(|e| !e.is_empty()) {
                    self.ctx.storage.increment_stat(Stat::FTRACE_SETUP_ERRORS);
                    let atrace = String::from_utf8_lossy(atrace);
                    errors.push_str("Atrace failures: ");
                    errors.push_str(&atrace);
                    self.ctx
                        .storage
                        .append_metadata_str(MetadataKey::AtraceErrors, &atrace);
                }
                if !errors.is_empty() {
                    self.ctx
                        .storage
                        .append_metadata_str(MetadataKey::FtraceSetupErrors, &errors);
                    self.seen_error_sequences.insert(sequence_id);
                }
            }
            if preserve_buffer {
                self.ctx.config.preserve_ring_buffer = true;
            }
        }

        for code in parse_errors {
            if code == ABI_ZERO_DATA_LENGTH {
                self.ctx
                    .storage
                    .increment_stat(Stat::FTRACE_ABI_ERRORS_SKIPPED_ZERO_DATA_LENGTH);
                continue;
            }
            let name = abi_error_name(code);
            if self.ctx.config.ignore_abi_errors {
                tracing::warn!(error = name, "downgrading kernel ring buffer ABI error");
                self.ctx
                    .storage
                    .increment_stat(Stat::FTRACE_ABI_ERRORS_SKIPPED);
                continue;
            }
            return Err(Error::AbiError { name });
        }

        Ok(())
    }
}

/// One per-cpu ring buffer snapshot from a stats bundle: the cpu number,
/// six monotonic counters and two seconds-as-double timestamps.
fn per_cpu_stats(
    storage: &mut TraceStorage,
    phase: StatsPhase,
    fields: FieldIter<'_>,
) -> Result<(), ReadError> {
    let mut cpu = 0u32;
    let mut entries = 0i64;
    let mut overrun = 0i64;
    let mut commit_overrun = 0i64;
    let mut bytes_read = 0i64;
    let mut oldest_event_ts = 0f64;
    let mut now_ts = 0f64;
    let mut dropped_events = 0i64;
    let mut read_events = 0i64;
    for field in fields {
        match field? {
            (1, v) => cpu = v.as_u32().unwrap_or(0),
            (2, v) => entries = v.as_u64().unwrap_or(0) as i64,
            (3, v) => overrun = v.as_u64().unwrap_or(0) as i64,
            (4, v) => commit_overrun = v.as_u64().unwrap_or(0) as i64,
            (5, v) => bytes_read = v.as_u64().unwrap_or(0) as i64,
            (6, v) => oldest_event_ts = v.as_f64().unwrap_or(0.0),
            (7, v) => now_ts = v.as_f64().unwrap_or(0.0),
            (8, v) => dropped_events = v.as_u64().unwrap_or(0) as i64,
            (9, v) => read_events = v.as_u64().unwrap_or(0) as i64,
            _ => {}
        }
    }

    let counters = [
        (Stat::FTRACE_CPU_ENTRIES_BEGIN, entries),
        (Stat::FTRACE_CPU_OVERRUN_BEGIN, overrun),
        (Stat::FTRACE_CPU_COMMIT_OVERRUN_BEGIN, commit_overrun),
        (Stat::FTRACE_CPU_BYTES_READ_BEGIN, bytes_read),
        (Stat::FTRACE_CPU_DROPPED_EVENTS_BEGIN, dropped_events),
        (Stat::FTRACE_CPU_READ_EVENTS_BEGIN, read_events),
    ];
    for (base, value) in counters {
        storage.stats.set_indexed(snapshot(base, phase), cpu, value);
        if phase == StatsPhase::End {
            // A missing begin snapshot means no delta, not a zero delta.
            if let Some(begin) = storage.stats.get_indexed(base, cpu) {
                storage
                    .stats
                    .set_indexed(Stat(base.0 + 2), cpu, value - begin);
            }
        }
    }
    storage.stats.set_indexed(
        snapshot(Stat::FTRACE_CPU_OLDEST_EVENT_TS_BEGIN, phase),
        cpu,
        seconds_to_ns_saturating(oldest_event_ts),
    );
    storage.stats.set_indexed(
        snapshot(Stat::FTRACE_CPU_NOW_TS_BEGIN, phase),
        cpu,
        seconds_to_ns_saturating(now_ts),
    );
    Ok(())
}

/// Relies on each `_END` stat id sitting right after its `_BEGIN`
/// counterpart, with `_DELTA` right after that.
fn snapshot(base: Stat, phase: StatsPhase) -> Stat {
    match phase {
        StatsPhase::Start => base,
        StatsPhase::End => Stat(base.0 + 1),
    }
}

/// Seconds-as-double to nanoseconds, pinned to the representable range.
/// `i64::MAX as f64` rounds up to 2^63, so `>=` is the correct comparison.
fn seconds_to_ns_saturating(seconds: f64) -> i64 {
    let ns = seconds * 1e9;
    if ns >= i64::MAX as f64 {
        return i64::MAX;
    }
    if ns <= i64::MIN as f64 {
        return i64::MIN;
    }
    ns as i64
}

/// Write one event generically into the raw table, with the payload decoded
/// per the event's static field descriptor. Kernel function pointer fields
/// resolve through the sequence's symbol table and are stored as strings.
fn typed_to_raw(
    ctx: &mut Context,
    sequence: &SequenceState,
    event: EventId,
    ts: i64,
    cpu: u32,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let Some(desc) = descriptor(event) else {
        // A tag from a newer schema than this build. Skipped, not an error.
        tracing::debug!(event = event.0, "no descriptor for event tag");
        return Ok(());
    };
    let name = ctx.storage.intern(desc.name);
    let utid = ctx.processes.get_or_create_thread(pid);
    let (_, arg_set) = ctx.storage.push_raw(ts, name, cpu, utid);

    for field in FieldIter::new(data) {
        let (field_number, value) = field?;
        let Some(field_desc) = desc.field(field_number) else {
            ctx.storage.increment_stat(Stat::FTRACE_UNKNOWN_EVENT_FIELD);
            continue;
        };
        let key = ctx.storage.intern(field_desc.name);
        let arg = match field_desc.typ {
            // Bools join the integers here; only handler args are typed
            // booleans.
            FieldType::Int | FieldType::Bool => value.as_i64().map(ArgValue::Int),
            FieldType::Uint => value.as_u64().map(ArgValue::Uint),
            FieldType::Sint => value.as_sint64().map(ArgValue::Int),
            FieldType::Str => value
                .as_str_bytes()
                .map(|bytes| ArgValue::Str(ctx.storage.intern_bytes(bytes))),
            FieldType::Double => value.as_f64().map(ArgValue::Double),
            FieldType::Float => value.as_f32().map(|v| ArgValue::Double(f64::from(v))),
            FieldType::KernelSymbol => value.as_u64().map(|iid| {
                ArgValue::Str(kernel_symbol_or_fallback(&mut ctx.storage, sequence, iid))
            }),
        };
        match arg {
            Some(arg) => ctx.storage.add_arg(arg_set, key, arg),
            None => ctx.storage.increment_stat(Stat::FTRACE_BAD_FIELD_TYPE),
        }
    }
    Ok(())
}

/// Write a self-describing event into the raw table: the payload carries its
/// own event name and a list of (name, value) fields.
fn parse_generic(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let name = match FieldIter::new(data).find(generic::EVENT_NAME) {
        Some(value) => value.as_str_bytes().unwrap_or(b""),
        None => b"",
    };
    let name = ctx.storage.intern_bytes(name);
    let utid = ctx.processes.get_or_create_thread(pid);
    let (_, arg_set) = ctx.storage.push_raw(ts, name, cpu, utid);

    for field in FieldIter::new(data) {
        let (field_number, value) = field?;
        if field_number != generic::FIELD {
            continue;
        }
        let Some(entry) = value.as_message() else {
            continue;
        };
        let mut field_name: &[u8] = b"";
        let mut str_value: Option<&[u8]> = None;
        let mut int_value: Option<i64> = None;
        let mut uint_value: Option<u64> = None;
        for entry_field in entry {
            match entry_field? {
                (generic::FIELD_NAME, v) => field_name = v.as_str_bytes().unwrap_or(b""),
                (generic::FIELD_STR_VALUE, v) => str_value = v.as_str_bytes(),
                (generic::FIELD_INT_VALUE, v) => int_value = v.as_i64(),
                (generic::FIELD_UINT_VALUE, v) => uint_value = v.as_u64(),
                _ => {}
            }
        }
        let key = ctx.storage.intern_bytes(field_name);
        if let Some(v) = int_value {
            ctx.storage.add_arg(arg_set, key, ArgValue::Int(v));
        } else if let Some(v) = uint_value {
            // The debug table stores one integer flavor.
            ctx.storage.add_arg(arg_set, key, ArgValue::Int(v as i64));
        } else if let Some(v) = str_value {
            let v = ctx.storage.intern_bytes(v);
            ctx.storage.add_arg(arg_set, key, ArgValue::Str(v));
        }
    }
    Ok(())
}
