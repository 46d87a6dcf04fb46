use std::fmt;

/// Field number of the nanosecond timestamp in the event envelope.
pub const TIMESTAMP_FIELD: u32 = 1;
/// Field number of the emitting pid in the event envelope.
pub const PID_FIELD: u32 = 2;

/// Field number of an event payload inside the event envelope. Each kernel
/// event type has its own envelope field carrying a nested message.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u32);

impl EventId {
    pub const PRINT: Self = Self(3);
    pub const SCHED_SWITCH: Self = Self(4);
    pub const CPU_FREQUENCY: Self = Self(11);
    pub const CPU_FREQUENCY_LIMITS: Self = Self(12);
    pub const CPU_IDLE: Self = Self(13);
    pub const CLOCK_ENABLE: Self = Self(14);
    pub const CLOCK_DISABLE: Self = Self(15);
    pub const CLOCK_SET_RATE: Self = Self(16);
    pub const SCHED_WAKEUP: Self = Self(17);
    pub const SCHED_BLOCKED_REASON: Self = Self(18);
    pub const SCHED_WAKING: Self = Self(20);
    pub const SOFTIRQ_ENTRY: Self = Self(24);
    pub const SOFTIRQ_EXIT: Self = Self(25);
    pub const SOFTIRQ_RAISE: Self = Self(26);
    pub const IRQ_HANDLER_ENTRY: Self = Self(36);
    pub const IRQ_HANDLER_EXIT: Self = Self(37);
    pub const MM_VMSCAN_DIRECT_RECLAIM_BEGIN: Self = Self(40);
    pub const MM_VMSCAN_DIRECT_RECLAIM_END: Self = Self(41);
    pub const MM_SHRINK_SLAB_START: Self = Self(42);
    pub const MM_SHRINK_SLAB_END: Self = Self(43);
    pub const WORKQUEUE_EXECUTE_END: Self = Self(53);
    pub const WORKQUEUE_EXECUTE_START: Self = Self(54);
    pub const WORKQUEUE_QUEUE_WORK: Self = Self(55);
    pub const TASK_NEWTASK: Self = Self(60);
    pub const TASK_RENAME: Self = Self(61);
    pub const OOM_SCORE_ADJ_UPDATE: Self = Self(70);
    pub const MARK_VICTIM: Self = Self(71);
    pub const MM_EVENT_RECORD: Self = Self(72);
    pub const ION_HEAP_GROW: Self = Self(75);
    pub const ION_HEAP_SHRINK: Self = Self(76);
    pub const ION_STAT: Self = Self(77);
    pub const DMA_HEAP_STAT: Self = Self(78);
    pub const GPU_MEM_TOTAL: Self = Self(79);
    pub const SIGNAL_GENERATE: Self = Self(80);
    pub const SIGNAL_DELIVER: Self = Self(81);
    pub const NETIF_RECEIVE_SKB: Self = Self(85);
    pub const NET_DEV_XMIT: Self = Self(86);
    pub const INET_SOCK_SET_STATE: Self = Self(87);
    pub const TCP_RETRANSMIT_SKB: Self = Self(88);
    pub const NAPI_GRO_RECEIVE_ENTRY: Self = Self(89);
    pub const NAPI_GRO_RECEIVE_EXIT: Self = Self(90);
    pub const KFREE_SKB: Self = Self(91);
    pub const SUSPEND_RESUME: Self = Self(95);
    pub const SUSPEND_RESUME_MINIMAL: Self = Self(96);
    pub const WAKEUP_SOURCE_ACTIVATE: Self = Self(97);
    pub const WAKEUP_SOURCE_DEACTIVATE: Self = Self(98);
    pub const RPM_STATUS: Self = Self(99);
    pub const DEVICE_PM_CALLBACK_START: Self = Self(100);
    pub const DEVICE_PM_CALLBACK_END: Self = Self(101);
    pub const DEVFREQ_FREQUENCY: Self = Self(102);
    pub const BCL_IRQ_TRIGGER: Self = Self(105);
    pub const CROS_EC_SENSORHUB_DATA: Self = Self(106);
    pub const UFSHCD_CLK_GATING: Self = Self(107);
    pub const UFSHCD_COMMAND: Self = Self(108);
    pub const FUNCGRAPH_ENTRY: Self = Self(110);
    pub const FUNCGRAPH_EXIT: Self = Self(111);
    pub const SCHED_CPU_UTIL_CFS: Self = Self(115);
    pub const GPU_FREQUENCY: Self = Self(116);
    pub const KGSL_GPU_FREQUENCY: Self = Self(117);
    pub const SCM_CALL_START: Self = Self(120);
    pub const SCM_CALL_END: Self = Self(121);
    pub const KPROBE: Self = Self(125);
    /// Schema-on-the-wire escape hatch: carries its own event name and
    /// field list instead of a fixed shape.
    pub const GENERIC: Self = Self(130);
    pub const HYP_ENTER: Self = Self(140);
    pub const HYP_EXIT: Self = Self(141);

    /// Hypervisor events are emitted outside any task context and carry no
    /// pid; every other event must have one.
    pub fn is_pidless(self) -> bool {
        matches!(self, Self::HYP_ENTER | Self::HYP_EXIT)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::GENERIC {
            return f.write_str("generic");
        }
        match descriptor(*self) {
            Some(desc) => f.write_str(desc.name),
            None => write!(f, "Unknown EventId {}", self.0),
        }
    }
}

/// How a field's wire value is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Uint,
    Int,
    Sint,
    Bool,
    Str,
    Double,
    Float,
    /// A varint symbol id, resolved against the packet sequence's interned
    /// kernel symbol table.
    KernelSymbol,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub typ: FieldType,
}

#[derive(Debug, Clone, Copy)]
pub struct EventDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl EventDescriptor {
    pub fn field(&self, id: u32) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// The static shape of a typed event, `None` for unknown envelope fields and
/// for [`EventId::GENERIC`], which describes itself.
pub fn descriptor(event: EventId) -> Option<&'static EventDescriptor> {
    use FieldType::*;
    Some(match event {
        EventId::PRINT => &EventDescriptor {
            name: "print",
            fields: &[
                FieldDescriptor { id: 1, name: "ip", typ: Uint },
                FieldDescriptor { id: 2, name: "buf", typ: Str },
            ],
        },
        EventId::SCHED_SWITCH => &EventDescriptor {
            name: "sched_switch",
            fields: &[
                FieldDescriptor { id: 1, name: "prev_comm", typ: Str },
                FieldDescriptor { id: 2, name: "prev_pid", typ: Int },
                FieldDescriptor { id: 3, name: "prev_prio", typ: Int },
                FieldDescriptor { id: 4, name: "prev_state", typ: Int },
                FieldDescriptor { id: 5, name: "next_comm", typ: Str },
                FieldDescriptor { id: 6, name: "next_pid", typ: Int },
                FieldDescriptor { id: 7, name: "next_prio", typ: Int },
            ],
        },
        EventId::CPU_FREQUENCY => &EventDescriptor {
            name: "cpu_frequency",
            fields: &[
                FieldDescriptor { id: 1, name: "state", typ: Uint },
                FieldDescriptor { id: 2, name: "cpu_id", typ: Uint },
            ],
        },
        EventId::CPU_FREQUENCY_LIMITS => &EventDescriptor {
            name: "cpu_frequency_limits",
            fields: &[
                FieldDescriptor { id: 1, name: "min_freq", typ: Uint },
                FieldDescriptor { id: 2, name: "max_freq", typ: Uint },
                FieldDescriptor { id: 3, name: "cpu_id", typ: Uint },
            ],
        },
        EventId::CPU_IDLE => &EventDescriptor {
            name: "cpu_idle",
            fields: &[
                FieldDescriptor { id: 1, name: "state", typ: Uint },
                FieldDescriptor { id: 2, name: "cpu_id", typ: Uint },
            ],
        },
        EventId::CLOCK_ENABLE => &EventDescriptor {
            name: "clock_enable",
            fields: CLOCK_FIELDS,
        },
        EventId::CLOCK_DISABLE => &EventDescriptor {
            name: "clock_disable",
            fields: CLOCK_FIELDS,
        },
        EventId::CLOCK_SET_RATE => &EventDescriptor {
            name: "clock_set_rate",
            fields: CLOCK_FIELDS,
        },
        EventId::SCHED_WAKEUP => &EventDescriptor {
            name: "sched_wakeup",
            fields: WAKEUP_FIELDS,
        },
        EventId::SCHED_BLOCKED_REASON => &EventDescriptor {
            name: "sched_blocked_reason",
            fields: &[
                FieldDescriptor { id: 1, name: "pid", typ: Int },
                FieldDescriptor { id: 2, name: "caller", typ: KernelSymbol },
                FieldDescriptor { id: 3, name: "io_wait", typ: Bool },
            ],
        },
        EventId::SCHED_WAKING => &EventDescriptor {
            name: "sched_waking",
            fields: WAKEUP_FIELDS,
        },
        EventId::SOFTIRQ_ENTRY => &EventDescriptor {
            name: "softirq_entry",
            fields: SOFTIRQ_FIELDS,
        },
        EventId::SOFTIRQ_EXIT => &EventDescriptor {
            name: "softirq_exit",
            fields: SOFTIRQ_FIELDS,
        },
        EventId::SOFTIRQ_RAISE => &EventDescriptor {
            name: "softirq_raise",
            fields: SOFTIRQ_FIELDS,
        },
        EventId::IRQ_HANDLER_ENTRY => &EventDescriptor {
            name: "irq_handler_entry",
            fields: &[
                FieldDescriptor { id: 1, name: "irq", typ: Int },
                FieldDescriptor { id: 2, name: "name", typ: Str },
            ],
        },
        EventId::IRQ_HANDLER_EXIT => &EventDescriptor {
            name: "irq_handler_exit",
            fields: &[
                FieldDescriptor { id: 1, name: "irq", typ: Int },
                FieldDescriptor { id: 2, name: "ret", typ: Int },
            ],
        },
        EventId::MM_VMSCAN_DIRECT_RECLAIM_BEGIN => &EventDescriptor {
            name: "mm_vmscan_direct_reclaim_begin",
            fields: &[
                FieldDescriptor { id: 1, name: "order", typ: Int },
                FieldDescriptor { id: 2, name: "may_writepage", typ: Int },
                FieldDescriptor { id: 3, name: "gfp_flags", typ: Uint },
            ],
        },
        EventId::MM_VMSCAN_DIRECT_RECLAIM_END => &EventDescriptor {
            name: "mm_vmscan_direct_reclaim_end",
            fields: &[FieldDescriptor { id: 1, name: "nr_reclaimed", typ: Uint }],
        },
        EventId::MM_SHRINK_SLAB_START => &EventDescriptor {
            name: "mm_shrink_slab_start",
            fields: &[
                FieldDescriptor { id: 1, name: "shrink", typ: KernelSymbol },
                FieldDescriptor { id: 2, name: "total_scan", typ: Uint },
                FieldDescriptor { id: 3, name: "priority", typ: Int },
            ],
        },
        EventId::MM_SHRINK_SLAB_END => &EventDescriptor {
            name: "mm_shrink_slab_end",
            fields: &[
                FieldDescriptor { id: 1, name: "shrink", typ: KernelSymbol },
                FieldDescriptor { id: 2, name: "retval", typ: Int },
            ],
        },
        EventId::WORKQUEUE_EXECUTE_END => &EventDescriptor {
            name: "workqueue_execute_end",
            fields: WORKQUEUE_EXECUTE_FIELDS,
        },
        EventId::WORKQUEUE_EXECUTE_START => &EventDescriptor {
            name: "workqueue_execute_start",
            fields: WORKQUEUE_EXECUTE_FIELDS,
        },
        EventId::WORKQUEUE_QUEUE_WORK => &EventDescriptor {
            name: "workqueue_queue_work",
            fields: &[
                FieldDescriptor { id: 1, name: "work", typ: Uint },
                FieldDescriptor { id: 2, name: "function", typ: KernelSymbol },
                FieldDescriptor { id: 3, name: "req_cpu", typ: Uint },
            ],
        },
        EventId::TASK_NEWTASK => &EventDescriptor {
            name: "task_newtask",
            fields: &[
                FieldDescriptor { id: 1, name: "pid", typ: Int },
                FieldDescriptor { id: 2, name: "comm", typ: Str },
                FieldDescriptor { id: 3, name: "clone_flags", typ: Uint },
                FieldDescriptor { id: 4, name: "oom_score_adj", typ: Int },
            ],
        },
        EventId::TASK_RENAME => &EventDescriptor {
            name: "task_rename",
            fields: &[
                FieldDescriptor { id: 1, name: "pid", typ: Int },
                FieldDescriptor { id: 2, name: "oldcomm", typ: Str },
                FieldDescriptor { id: 3, name: "newcomm", typ: Str },
                FieldDescriptor { id: 4, name: "oom_score_adj", typ: Int },
            ],
        },
        EventId::OOM_SCORE_ADJ_UPDATE => &EventDescriptor {
            name: "oom_score_adj_update",
            fields: &[
                FieldDescriptor { id: 1, name: "comm", typ: Str },
                FieldDescriptor { id: 2, name: "pid", typ: Int },
                FieldDescriptor { id: 3, name: "oom_score_adj", typ: Int },
            ],
        },
        EventId::MARK_VICTIM => &EventDescriptor {
            name: "mark_victim",
            fields: &[FieldDescriptor { id: 1, name: "pid", typ: Int }],
        },
        EventId::MM_EVENT_RECORD => &EventDescriptor {
            name: "mm_event_record",
            fields: &[
                FieldDescriptor { id: 1, name: "avg_lat", typ: Uint },
                FieldDescriptor { id: 2, name: "count", typ: Uint },
                FieldDescriptor { id: 3, name: "max_lat", typ: Uint },
                FieldDescriptor { id: 4, name: "type", typ: Uint },
            ],
        },
        EventId::ION_HEAP_GROW => &EventDescriptor {
            name: "ion_heap_grow",
            fields: ION_HEAP_FIELDS,
        },
        EventId::ION_HEAP_SHRINK => &EventDescriptor {
            name: "ion_heap_shrink",
            fields: ION_HEAP_FIELDS,
        },
        EventId::ION_STAT => &EventDescriptor {
            name: "ion_stat",
            fields: &[
                FieldDescriptor { id: 1, name: "buffer_id", typ: Uint },
                FieldDescriptor { id: 2, name: "len", typ: Int },
                FieldDescriptor { id: 3, name: "total_allocated", typ: Uint },
            ],
        },
        EventId::DMA_HEAP_STAT => &EventDescriptor {
            name: "dma_heap_stat",
            fields: &[
                FieldDescriptor { id: 1, name: "inode", typ: Uint },
                FieldDescriptor { id: 2, name: "len", typ: Int },
                FieldDescriptor { id: 3, name: "total_allocated", typ: Uint },
            ],
        },
        EventId::GPU_MEM_TOTAL => &EventDescriptor {
            name: "gpu_mem_total",
            fields: &[
                FieldDescriptor { id: 1, name: "gpu_id", typ: Uint },
                FieldDescriptor { id: 2, name: "pid", typ: Uint },
                FieldDescriptor { id: 3, name: "size", typ: Uint },
            ],
        },
        EventId::SIGNAL_GENERATE => &EventDescriptor {
            name: "signal_generate",
            fields: &[
                FieldDescriptor { id: 1, name: "code", typ: Int },
                FieldDescriptor { id: 2, name: "comm", typ: Str },
                FieldDescriptor { id: 3, name: "pid", typ: Int },
                FieldDescriptor { id: 4, name: "sig", typ: Int },
            ],
        },
        EventId::SIGNAL_DELIVER => &EventDescriptor {
            name: "signal_deliver",
            fields: &[
                FieldDescriptor { id: 1, name: "code", typ: Int },
                FieldDescriptor { id: 2, name: "sa_handler", typ: Uint },
                FieldDescriptor { id: 3, name: "sig", typ: Int },
            ],
        },
        EventId::NETIF_RECEIVE_SKB => &EventDescriptor {
            name: "netif_receive_skb",
            fields: SKB_FIELDS,
        },
        EventId::NET_DEV_XMIT => &EventDescriptor {
            name: "net_dev_xmit",
            fields: &[
                FieldDescriptor { id: 1, name: "name", typ: Str },
                FieldDescriptor { id: 2, name: "skbaddr", typ: Uint },
                FieldDescriptor { id: 3, name: "len", typ: Uint },
                FieldDescriptor { id: 4, name: "rc", typ: Int },
            ],
        },
        EventId::INET_SOCK_SET_STATE => &EventDescriptor {
            name: "inet_sock_set_state",
            fields: &[
                FieldDescriptor { id: 1, name: "daddr", typ: Uint },
                FieldDescriptor { id: 2, name: "dport", typ: Uint },
                FieldDescriptor { id: 3, name: "family", typ: Uint },
                FieldDescriptor { id: 4, name: "newstate", typ: Int },
                FieldDescriptor { id: 5, name: "oldstate", typ: Int },
                FieldDescriptor { id: 6, name: "protocol", typ: Uint },
                FieldDescriptor { id: 7, name: "saddr", typ: Uint },
                FieldDescriptor { id: 8, name: "skaddr", typ: Uint },
                FieldDescriptor { id: 9, name: "sport", typ: Uint },
            ],
        },
        EventId::TCP_RETRANSMIT_SKB => &EventDescriptor {
            name: "tcp_retransmit_skb",
            fields: &[
                FieldDescriptor { id: 1, name: "daddr", typ: Uint },
                FieldDescriptor { id: 2, name: "saddr", typ: Uint },
                FieldDescriptor { id: 3, name: "skaddr", typ: Uint },
                FieldDescriptor { id: 4, name: "sport", typ: Uint },
                FieldDescriptor { id: 5, name: "dport", typ: Uint },
            ],
        },
        EventId::NAPI_GRO_RECEIVE_ENTRY => &EventDescriptor {
            name: "napi_gro_receive_entry",
            fields: &[
                FieldDescriptor { id: 1, name: "name", typ: Str },
                FieldDescriptor { id: 2, name: "len", typ: Int },
            ],
        },
        EventId::NAPI_GRO_RECEIVE_EXIT => &EventDescriptor {
            name: "napi_gro_receive_exit",
            fields: &[FieldDescriptor { id: 1, name: "ret", typ: Int }],
        },
        EventId::KFREE_SKB => &EventDescriptor {
            name: "kfree_skb",
            fields: &[FieldDescriptor { id: 1, name: "protocol", typ: Uint }],
        },
        EventId::SUSPEND_RESUME => &EventDescriptor {
            name: "suspend_resume",
            fields: &[
                FieldDescriptor { id: 1, name: "action", typ: Str },
                FieldDescriptor { id: 2, name: "val", typ: Int },
                FieldDescriptor { id: 3, name: "start", typ: Uint },
            ],
        },
        EventId::SUSPEND_RESUME_MINIMAL => &EventDescriptor {
            name: "suspend_resume_minimal",
            fields: &[FieldDescriptor { id: 1, name: "start", typ: Uint }],
        },
        EventId::WAKEUP_SOURCE_ACTIVATE => &EventDescriptor {
            name: "wakeup_source_activate",
            fields: WAKEUP_SOURCE_FIELDS,
        },
        EventId::WAKEUP_SOURCE_DEACTIVATE => &EventDescriptor {
            name: "wakeup_source_deactivate",
            fields: WAKEUP_SOURCE_FIELDS,
        },
        EventId::RPM_STATUS => &EventDescriptor {
            name: "rpm_status",
            fields: &[
                FieldDescriptor { id: 1, name: "name", typ: Str },
                FieldDescriptor { id: 2, name: "status", typ: Int },
            ],
        },
        EventId::DEVICE_PM_CALLBACK_START => &EventDescriptor {
            name: "device_pm_callback_start",
            fields: &[
                FieldDescriptor { id: 1, name: "device", typ: Str },
                FieldDescriptor { id: 2, name: "driver", typ: Str },
                FieldDescriptor { id: 3, name: "pm_ops", typ: Str },
                FieldDescriptor { id: 4, name: "event", typ: Int },
            ],
        },
        EventId::DEVICE_PM_CALLBACK_END => &EventDescriptor {
            name: "device_pm_callback_end",
            fields: &[
                FieldDescriptor { id: 1, name: "device", typ: Str },
                FieldDescriptor { id: 2, name: "driver", typ: Str },
                FieldDescriptor { id: 3, name: "error", typ: Int },
            ],
        },
        EventId::DEVFREQ_FREQUENCY => &EventDescriptor {
            name: "devfreq_frequency",
            fields: &[
                FieldDescriptor { id: 1, name: "dev_name", typ: Str },
                FieldDescriptor { id: 2, name: "freq", typ: Uint },
            ],
        },
        EventId::BCL_IRQ_TRIGGER => &EventDescriptor {
            name: "bcl_irq_trigger",
            fields: &[
                FieldDescriptor { id: 1, name: "id", typ: Int },
                FieldDescriptor { id: 2, name: "throttle", typ: Int },
                FieldDescriptor { id: 3, name: "cpu0_limit", typ: Int },
                FieldDescriptor { id: 4, name: "cpu1_limit", typ: Int },
                FieldDescriptor { id: 5, name: "cpu2_limit", typ: Int },
                FieldDescriptor { id: 6, name: "tpu_limit", typ: Int },
                FieldDescriptor { id: 7, name: "gpu_limit", typ: Int },
                FieldDescriptor { id: 8, name: "voltage", typ: Int },
                FieldDescriptor { id: 9, name: "capacity", typ: Int },
            ],
        },
        EventId::CROS_EC_SENSORHUB_DATA => &EventDescriptor {
            name: "cros_ec_sensorhub_data",
            fields: &[
                FieldDescriptor { id: 1, name: "ec_sensor_num", typ: Uint },
                FieldDescriptor { id: 2, name: "fifo_timestamp", typ: Uint },
                FieldDescriptor { id: 3, name: "current_timestamp", typ: Int },
                FieldDescriptor { id: 4, name: "current_time", typ: Int },
                FieldDescriptor { id: 5, name: "delta", typ: Int },
            ],
        },
        EventId::UFSHCD_CLK_GATING => &EventDescriptor {
            name: "ufshcd_clk_gating",
            fields: &[
                FieldDescriptor { id: 1, name: "dev_name", typ: Str },
                FieldDescriptor { id: 2, name: "state", typ: Int },
            ],
        },
        EventId::UFSHCD_COMMAND => &EventDescriptor {
            name: "ufshcd_command",
            fields: &[
                FieldDescriptor { id: 1, name: "dev_name", typ: Str },
                FieldDescriptor { id: 2, name: "doorbell", typ: Uint },
                FieldDescriptor { id: 3, name: "opcode", typ: Uint },
                FieldDescriptor { id: 4, name: "tag", typ: Uint },
                FieldDescriptor { id: 5, name: "transfer_len", typ: Uint },
                FieldDescriptor { id: 6, name: "group_id", typ: Uint },
                FieldDescriptor { id: 7, name: "str_t", typ: Uint },
            ],
        },
        EventId::FUNCGRAPH_ENTRY => &EventDescriptor {
            name: "funcgraph_entry",
            fields: FUNCGRAPH_FIELDS,
        },
        EventId::FUNCGRAPH_EXIT => &EventDescriptor {
            name: "funcgraph_exit",
            fields: FUNCGRAPH_FIELDS,
        },
        EventId::SCHED_CPU_UTIL_CFS => &EventDescriptor {
            name: "sched_cpu_util_cfs",
            fields: &[
                FieldDescriptor { id: 1, name: "cpu", typ: Uint },
                FieldDescriptor { id: 2, name: "cpu_util", typ: Uint },
                FieldDescriptor { id: 3, name: "capacity", typ: Uint },
                FieldDescriptor { id: 4, name: "nr_running", typ: Uint },
            ],
        },
        EventId::GPU_FREQUENCY => &EventDescriptor {
            name: "gpu_frequency",
            fields: &[
                FieldDescriptor { id: 1, name: "gpu_id", typ: Uint },
                FieldDescriptor { id: 2, name: "state", typ: Uint },
            ],
        },
        EventId::KGSL_GPU_FREQUENCY => &EventDescriptor {
            name: "kgsl_gpu_frequency",
            fields: &[
                FieldDescriptor { id: 1, name: "gpu_id", typ: Uint },
                FieldDescriptor { id: 2, name: "gpu_freq", typ: Uint },
            ],
        },
        EventId::SCM_CALL_START => &EventDescriptor {
            name: "scm_call_start",
            fields: &[FieldDescriptor { id: 1, name: "arg0", typ: Uint }],
        },
        EventId::SCM_CALL_END => &EventDescriptor {
            name: "scm_call_end",
            fields: &[],
        },
        EventId::KPROBE => &EventDescriptor {
            name: "kprobe",
            fields: &[
                FieldDescriptor { id: 1, name: "name", typ: Str },
                FieldDescriptor { id: 2, name: "type", typ: Uint },
            ],
        },
        EventId::HYP_ENTER => &EventDescriptor {
            name: "hyp_enter",
            fields: &[],
        },
        EventId::HYP_EXIT => &EventDescriptor {
            name: "hyp_exit",
            fields: &[],
        },
        _ => return None,
    })
}

const CLOCK_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "name", typ: FieldType::Str },
    FieldDescriptor { id: 2, name: "state", typ: FieldType::Uint },
    FieldDescriptor { id: 3, name: "cpu_id", typ: FieldType::Uint },
];

const WAKEUP_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "comm", typ: FieldType::Str },
    FieldDescriptor { id: 2, name: "pid", typ: FieldType::Int },
    FieldDescriptor { id: 3, name: "prio", typ: FieldType::Int },
    FieldDescriptor { id: 4, name: "target_cpu", typ: FieldType::Int },
];

const SOFTIRQ_FIELDS: &[FieldDescriptor] =
    &[FieldDescriptor { id: 1, name: "vec", typ: FieldType::Uint }];

const WORKQUEUE_EXECUTE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "work", typ: FieldType::Uint },
    FieldDescriptor { id: 2, name: "function", typ: FieldType::KernelSymbol },
];

const ION_HEAP_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "heap_name", typ: FieldType::Str },
    FieldDescriptor { id: 2, name: "len", typ: FieldType::Int },
    FieldDescriptor { id: 3, name: "total_allocated", typ: FieldType::Uint },
];

const SKB_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "name", typ: FieldType::Str },
    FieldDescriptor { id: 2, name: "skbaddr", typ: FieldType::Uint },
    FieldDescriptor { id: 3, name: "len", typ: FieldType::Uint },
];

const WAKEUP_SOURCE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "name", typ: FieldType::Str },
    FieldDescriptor { id: 2, name: "state", typ: FieldType::Uint },
];

const FUNCGRAPH_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { id: 1, name: "depth", typ: FieldType::Int },
    FieldDescriptor { id: 2, name: "func", typ: FieldType::KernelSymbol },
];

/// Field numbers inside a [`EventId::GENERIC`] payload.
pub mod generic {
    pub const EVENT_NAME: u32 = 1;
    pub const FIELD: u32 = 2;
    pub const FIELD_NAME: u32 = 1;
    pub const FIELD_STR_VALUE: u32 = 2;
    pub const FIELD_INT_VALUE: u32 = 3;
    pub const FIELD_UINT_VALUE: u32 = 4;
}

#[cfg(test)]
mod test {
    use super::{descriptor, EventId, FieldType};

    #[test]
    fn lookup_by_field_id() {
        let desc = descriptor(EventId::SCHED_SWITCH).unwrap();
        assert_eq!(desc.name, "sched_switch");
        assert_eq!(desc.field(5).unwrap().name, "next_comm");
        assert!(desc.field(8).is_none());
    }

    #[test]
    fn unknown_and_generic_have_no_static_shape() {
        assert!(descriptor(EventId(9999)).is_none());
        assert!(descriptor(EventId::GENERIC).is_none());
    }

    #[test]
    fn symbol_fields_are_marked() {
        let desc = descriptor(EventId::WORKQUEUE_EXECUTE_START).unwrap();
        assert_eq!(desc.field(2).unwrap().typ, FieldType::KernelSymbol);
    }

    #[test]
    fn debug_names_known_events() {
        assert_eq!(format!("{:?}", EventId::CPU_IDLE), "cpu_idle");
        assert_eq!(format!("{:?}", EventId::GENERIC), "generic");
        assert_eq!(format!("{:?}", EventId(9999)), "Unknown EventId 9999");
    }

    #[test]
    fn only_hypervisor_events_are_pidless() {
        assert!(EventId::HYP_ENTER.is_pidless());
        assert!(EventId::HYP_EXIT.is_pidless());
        assert!(!EventId::SCHED_SWITCH.is_pidless());
        assert!(!EventId(9999).is_pidless());
    }
}
