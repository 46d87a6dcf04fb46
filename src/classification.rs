/// The classification of a track indicates the type of data the track
/// contains.
///
/// Every track is uniquely identified by the combination of its class and a
/// set of dimensions: the class picks out a family of tracks with the same
/// kind of data, and the dimensions distinguish tracks within that family.
///
/// The set is closed; variants carry no behavior beyond identity and a
/// display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackClassification {
    // Global tracks, unique per trace.
    Trigger,
    Interconnect,

    // General tracks.
    Thread,
    TrackEvent,

    // Gpu tracks.
    GpuFrequency,

    // Cpu tracks.
    IrqCpu,
    SoftirqCpu,
    NapiGroCpu,
    MaliIrqCpu,
    FuncgraphCpu,
    PkvmHypervisor,

    // Cpu counter tracks.
    CpuFrequency,
    CpuFrequencyThrottle,
    CpuMaxFrequencyLimit,
    CpuMinFrequencyLimit,

    CpuIdle,
    CpuIdleState,
    CpuUtilization,
    CpuCapacity,
    CpuNumberRunning,

    // Time CPU spent in state.
    UserTime,
    NiceUserTime,
    SystemModeTime,
    IoWaitTime,
    IrqTime,
    SoftIrqTime,
    CpuIdleTime,

    // Android.
    AndroidEnergyEstimationBreakdown,
    AndroidEnergyEstimationBreakdownPerUid,
    AndroidGpuWorkPeriod,
    AndroidLmk,

    // Linux.
    IrqCounter,
    SoftirqCounter,
    LinuxRuntimePowerManagement,
    LinuxDeviceFrequency,

    // Not set. Legacy, never use for new tracks. If set, the class can't be
    // used to identify the track; dimensions + name are used instead.
    // Strongly discouraged.
    Unknown,
}

impl TrackClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackClassification::Trigger => "triggers",
            TrackClassification::Interconnect => "interconnect_events",
            TrackClassification::Thread => "thread",
            TrackClassification::TrackEvent => "track_event",
            TrackClassification::GpuFrequency => "gpu_frequency",
            TrackClassification::IrqCpu => "cpu_irq",
            TrackClassification::SoftirqCpu => "cpu_softirq",
            TrackClassification::NapiGroCpu => "cpu_napi_gro",
            TrackClassification::MaliIrqCpu => "cpu_mali_irq",
            TrackClassification::FuncgraphCpu => "cpu_funcgraph",
            TrackClassification::PkvmHypervisor => "pkvm_hypervisor",
            TrackClassification::CpuFrequency => "cpu_frequency",
            TrackClassification::CpuFrequencyThrottle => "cpu_frequency_throttle",
            TrackClassification::CpuMaxFrequencyLimit => "cpu_max_frequency_limit",
            TrackClassification::CpuMinFrequencyLimit => "cpu_min_frequency_limit",
            TrackClassification::CpuIdle => "cpu_idle",
            TrackClassification::CpuIdleState => "cpu_idle_state",
            TrackClassification::CpuUtilization => "cpu_utilization",
            TrackClassification::CpuCapacity => "cpu_capacity",
            TrackClassification::CpuNumberRunning => "cpu_nr_running",
            TrackClassification::UserTime => "cpu_user_time",
            TrackClassification::NiceUserTime => "cpu_nice_user_time",
            TrackClassification::SystemModeTime => "cpu_system_mode_time",
            TrackClassification::IoWaitTime => "cpu_io_wait_time",
            TrackClassification::IrqTime => "cpu_irq_time",
            TrackClassification::SoftIrqTime => "cpu_softirq_time",
            TrackClassification::CpuIdleTime => "cpu_idle_time",
            TrackClassification::AndroidEnergyEstimationBreakdown => {
                "android_energy_estimation_breakdown"
            }
            TrackClassification::AndroidEnergyEstimationBreakdownPerUid => {
                "android_energy_estimation_breakdown_per_uid"
            }
            TrackClassification::AndroidGpuWorkPeriod => "android_gpu_work_period",
            TrackClassification::AndroidLmk => "android_lmk",
            TrackClassification::IrqCounter => "irq_counter",
            TrackClassification::SoftirqCounter => "softirq_counter",
            TrackClassification::LinuxRuntimePowerManagement => "linux_rpm",
            TrackClassification::LinuxDeviceFrequency => "linux_device_frequency",
            TrackClassification::Unknown => "N/A",
        }
    }
}
