use crate::config::Config;
use crate::process::{CpuTracker, ProcessTracker};
use crate::slice::SliceTracker;
use crate::storage::{StringId, TraceStorage};
use crate::track::TrackRegistry;
use crate::track_set::TrackSetRegistry;

/// Shared mutable state threaded through every event handler: the storage
/// tables plus the trackers that give rows their identity.
pub(crate) struct Context {
    pub(crate) storage: TraceStorage,
    pub(crate) tracks: TrackRegistry,
    pub(crate) track_sets: TrackSetRegistry,
    pub(crate) slices: SliceTracker,
    pub(crate) processes: ProcessTracker,
    pub(crate) cpus: CpuTracker,
    pub(crate) config: Config,
    pub(crate) strings: CommonStrings,
}

impl Context {
    pub(crate) fn new(config: Config) -> Self {
        let mut storage = TraceStorage::new();
        let strings = CommonStrings::new(&mut storage);
        Self {
            storage,
            tracks: TrackRegistry::new(),
            track_sets: TrackSetRegistry::new(),
            slices: SliceTracker::new(),
            processes: ProcessTracker::new(),
            cpus: CpuTracker::new(),
            config,
            strings,
        }
    }
}

/// Names and arg keys the handlers emit over and over, interned once so the
/// per-event path never hashes a literal.
pub(crate) struct CommonStrings {
    // Slice categories.
    pub(crate) cat_irq: StringId,
    pub(crate) cat_workqueue: StringId,
    pub(crate) cat_napi_gro: StringId,
    pub(crate) cat_tcp_state: StringId,
    pub(crate) cat_tcp_event: StringId,

    // Arg keys.
    pub(crate) arg_cpu: StringId,
    pub(crate) arg_ucpu: StringId,
    pub(crate) arg_utid: StringId,
    pub(crate) arg_len: StringId,
    pub(crate) arg_ret: StringId,
    pub(crate) arg_vec: StringId,
    pub(crate) arg_protocol: StringId,
    pub(crate) arg_inode: StringId,
    pub(crate) arg_io_wait: StringId,
    pub(crate) arg_function: StringId,
    pub(crate) arg_waker_utid: StringId,
    pub(crate) arg_signal: StringId,
    pub(crate) arg_replica_slice: StringId,
    pub(crate) arg_device_name: StringId,
    pub(crate) arg_driver_name: StringId,
    pub(crate) arg_callback_phase: StringId,
    pub(crate) arg_event_type: StringId,
    pub(crate) arg_ec_num: StringId,
    pub(crate) arg_ec_delta: StringId,
    pub(crate) arg_sample_ts: StringId,
    pub(crate) arg_shrink_name: StringId,
    pub(crate) arg_total_scan: StringId,
    pub(crate) arg_freed: StringId,
    pub(crate) arg_priority: StringId,
    pub(crate) arg_reclaim_order: StringId,
    pub(crate) arg_reclaim_may_writepage: StringId,
    pub(crate) arg_reclaim_gfp_flags: StringId,
    pub(crate) arg_reclaim_nr_reclaimed: StringId,

    // Slice, counter and track-set names.
    pub(crate) sched_wakeup: StringId,
    pub(crate) sched_waking: StringId,
    pub(crate) sched_blocked_reason: StringId,
    pub(crate) signal_generate: StringId,
    pub(crate) signal_deliver: StringId,
    pub(crate) workqueue_scheduled: StringId,
    pub(crate) oom_score_adj: StringId,
    pub(crate) oom_kill: StringId,
    pub(crate) gpu_memory: StringId,
    pub(crate) ion_total: StringId,
    pub(crate) ion_change: StringId,
    pub(crate) ion_buffer: StringId,
    pub(crate) ion_total_unknown: StringId,
    pub(crate) ion_change_unknown: StringId,
    pub(crate) dma_heap_total: StringId,
    pub(crate) dma_heap_change: StringId,
    pub(crate) dma_buffer: StringId,
    pub(crate) kfree_skb: StringId,
    pub(crate) tcp_retransmit: StringId,
    pub(crate) suspend_resume: StringId,
    pub(crate) suspend_resume_minimal: StringId,
    pub(crate) suspended: StringId,
    pub(crate) main_suspend_event: StringId,
    pub(crate) device_suspend_event: StringId,
    pub(crate) rpm_active: StringId,
    pub(crate) rpm_resuming: StringId,
    pub(crate) rpm_suspending: StringId,
    pub(crate) rpm_invalid: StringId,
    pub(crate) ufs_command_count: StringId,
    pub(crate) ufs_clkgating: StringId,
    pub(crate) direct_reclaim: StringId,
    pub(crate) shrink_slab: StringId,

    /// Counter names per mm_event type, indexed by the wire type number.
    pub(crate) mm_event: [MmEventNames; MM_EVENT_TYPES.len()],
}

#[derive(Clone, Copy)]
pub(crate) struct MmEventNames {
    pub(crate) count: StringId,
    pub(crate) max_lat: StringId,
    pub(crate) avg_lat: StringId,
}

pub(crate) const MM_EVENT_TYPES: [&str; 7] = [
    "min_flt",
    "maj_flt",
    "read_io",
    "compaction",
    "reclaim",
    "swp_flt",
    "kern_alloc",
];

impl CommonStrings {
    fn new(storage: &mut TraceStorage) -> Self {
        let mm_event = MM_EVENT_TYPES.map(|ty| MmEventNames {
            count: storage.intern(&format!("mem.mm.{ty}.count")),
            max_lat: storage.intern(&format!("mem.mm.{ty}.max_lat")),
            avg_lat: storage.intern(&format!("mem.mm.{ty}.avg_lat")),
        });
        Self {
            cat_irq: storage.intern("irq"),
            cat_workqueue: storage.intern("workqueue"),
            cat_napi_gro: storage.intern("napi_gro"),
            cat_tcp_state: storage.intern("tcp_state"),
            cat_tcp_event: storage.intern("tcp_event"),
            arg_cpu: storage.intern("cpu"),
            arg_ucpu: storage.intern("ucpu"),
            arg_utid: storage.intern("utid"),
            arg_len: storage.intern("len"),
            arg_ret: storage.intern("ret"),
            arg_vec: storage.intern("vec"),
            arg_protocol: storage.intern("protocol"),
            arg_inode: storage.intern("inode"),
            arg_io_wait: storage.intern("io_wait"),
            arg_function: storage.intern("function"),
            arg_waker_utid: storage.intern("waker_utid"),
            arg_signal: storage.intern("signal.sig"),
            arg_replica_slice: storage.intern("replica_slice"),
            arg_device_name: storage.intern("device_name"),
            arg_driver_name: storage.intern("driver_name"),
            arg_callback_phase: storage.intern("callback_phase"),
            arg_event_type: storage.intern("event_type"),
            arg_ec_num: storage.intern("ec_num"),
            arg_ec_delta: storage.intern("ec_delta"),
            arg_sample_ts: storage.intern("sample_ts"),
            arg_shrink_name: storage.intern("shrink_name"),
            arg_total_scan: storage.intern("total_scan"),
            arg_freed: storage.intern("freed"),
            arg_priority: storage.intern("priority"),
            arg_reclaim_order: storage.intern("direct_reclaim_order"),
            arg_reclaim_may_writepage: storage.intern("direct_reclaim_may_writepage"),
            arg_reclaim_gfp_flags: storage.intern("direct_reclaim_gfp_flags"),
            arg_reclaim_nr_reclaimed: storage.intern("direct_reclaim_nr_reclaimed"),
            sched_wakeup: storage.intern("sched_wakeup"),
            sched_waking: storage.intern("sched_waking"),
            sched_blocked_reason: storage.intern("sched_blocked_reason"),
            signal_generate: storage.intern("signal_generate"),
            signal_deliver: storage.intern("signal_deliver"),
            workqueue_scheduled: storage.intern("scheduled"),
            oom_score_adj: storage.intern("oom_score_adj"),
            oom_kill: storage.intern("mem.oom_kill"),
            gpu_memory: storage.intern("GPU Memory"),
            ion_total: storage.intern("mem.ion"),
            ion_change: storage.intern("mem.ion_change"),
            ion_buffer: storage.intern("mem.ion_buffer"),
            ion_total_unknown: storage.intern("mem.ion.unknown"),
            ion_change_unknown: storage.intern("mem.ion_change.unknown"),
            dma_heap_total: storage.intern("mem.dma_heap"),
            dma_heap_change: storage.intern("mem.dma_heap_change"),
            dma_buffer: storage.intern("mem.dma_buffer"),
            kfree_skb: storage.intern("Kfree Skb IP Prot"),
            tcp_retransmit: storage.intern("TCP Retransmit Skb"),
            suspend_resume: storage.intern("Suspend/Resume Latency"),
            suspend_resume_minimal: storage.intern("Suspend/Resume Minimal"),
            suspended: storage.intern("Suspended"),
            main_suspend_event: storage.intern("Main Kernel Suspend Event"),
            device_suspend_event: storage.intern("Device PM Suspend Event"),
            rpm_active: storage.intern("Active"),
            rpm_resuming: storage.intern("Resuming"),
            rpm_suspending: storage.intern("Suspending"),
            rpm_invalid: storage.intern("Invalid State"),
            ufs_command_count: storage.intern("io.ufs.command.count"),
            ufs_clkgating: storage.intern("io.ufs.clkgating (OFF:0/REQ_OFF/REQ_ON/ON:3)"),
            direct_reclaim: storage.intern("mm_vmscan_direct_reclaim"),
            shrink_slab: storage.intern("mm_vmscan_shrink_slab"),
            mm_event,
        }
    }
}
