//! Power management events. Clock and device frequency counters, the
//! shared suspend/resume latency track set, wakelock slices, runtime pm
//! state per device and UFS command queues.

use std::collections::HashSet;

use linear_map::LinearMap;

use crate::classification::TrackClassification;
use crate::context::Context;
use crate::error::ReadError;
use crate::storage::{ArgValue, StringId};
use crate::wire::FieldIter;

const RPM_ACTIVE: i64 = 0;
const RPM_RESUMING: i64 = 1;
const RPM_SUSPENDED: i64 = 2;
const RPM_SUSPENDING: i64 = 3;

/// Cross-event bookkeeping for the power handlers.
#[derive(Debug, Default)]
pub(crate) struct PowerState {
    /// Cookies in the shared suspend/resume track set. Suspend actions key
    /// by their value, device pm callbacks by device name.
    suspend_cookies: LinearMap<String, i64>,
    /// Suspend actions with an open slice, keyed by "action(val)".
    ongoing_suspend_actions: LinearMap<String, bool>,
    /// Reference counts of currently held wakelocks.
    wakelocks: LinearMap<String, u32>,
    /// Devices with an open runtime pm slice.
    rpm_active: HashSet<StringId>,
}

impl PowerState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cookie for a key in the shared suspend/resume set. New keys take the
    /// next slot in insertion order.
    fn suspend_cookie(&mut self, key: &str) -> i64 {
        if let Some(&cookie) = self.suspend_cookies.get(key) {
            return cookie;
        }
        let cookie = self.suspend_cookies.len() as i64;
        self.suspend_cookies.insert(key.to_owned(), cookie);
        cookie
    }
}

fn clock_counter(ctx: &mut Context, ts: i64, data: &[u8], subtitle: &str) -> Result<(), ReadError> {
    let mut name: &[u8] = b"";
    let mut rate = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => name = v.as_str_bytes().unwrap_or(b""),
            (2, v) => rate = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let counter_name = ctx
        .storage
        .intern(&format!("{} {subtitle}", String::from_utf8_lossy(name)));
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, counter_name);
    ctx.storage.push_counter(ts, track, rate as f64);
    Ok(())
}

pub(crate) fn clock_set_rate(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    clock_counter(ctx, ts, data, "Frequency")
}

pub(crate) fn clock_enable(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    clock_counter(ctx, ts, data, "State")
}

pub(crate) fn clock_disable(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    clock_counter(ctx, ts, data, "State")
}

pub(crate) fn suspend_resume(
    ctx: &mut Context,
    power: &mut PowerState,
    ts: i64,
    pid: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut action: &[u8] = b"";
    let mut val = 0i64;
    let mut start = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => action = v.as_str_bytes().unwrap_or(b""),
            (2, v) => val = v.as_i64().unwrap_or(0),
            (3, v) => start = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let action = String::from_utf8_lossy(action);
    // The value of timekeeping_freeze is the processor id; cores racing into
    // suspend would otherwise split one logical action across cookies.
    let val: u32 = if action == "timekeeping_freeze" {
        0
    } else {
        val as u32
    };
    let cookie = power.suspend_cookie(&val.to_string());
    let current_action = format!("{action}({val})");
    let set = ctx.track_sets.intern_global(ctx.strings.suspend_resume);

    if start == 0 {
        let track = ctx
            .track_sets
            .end(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
        power.ongoing_suspend_actions.insert(current_action, false);
        return Ok(());
    }

    // A begin over a still-open action means its end was lost; close the
    // stale slice and mark it.
    let ongoing = power
        .ongoing_suspend_actions
        .get(&current_action)
        .copied()
        .unwrap_or(false);
    if ongoing {
        let track = ctx
            .track_sets
            .end(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        let args = [(ctx.strings.arg_replica_slice, ArgValue::Bool(true))];
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &args);
    }

    let slice_name = ctx.storage.intern(&current_action);
    let track = ctx
        .track_sets
        .begin(&mut ctx.tracks, &mut ctx.storage, set, cookie);
    let utid = ctx.processes.get_or_create_thread(pid);
    let ucpu = ctx.cpus.get_or_create_cpu(cpu);
    let null = StringId(0);
    let args = [
        (ctx.strings.arg_utid, ArgValue::Uint(utid.0 as u64)),
        (
            ctx.strings.arg_event_type,
            ArgValue::Str(ctx.strings.main_suspend_event),
        ),
        (ctx.strings.arg_ucpu, ArgValue::Uint(ucpu.0 as u64)),
        // Null device fields; only pm callback slices carry these.
        (ctx.strings.arg_device_name, ArgValue::Str(null)),
        (ctx.strings.arg_driver_name, ArgValue::Str(null)),
        (ctx.strings.arg_callback_phase, ArgValue::Str(null)),
    ];
    let category = ctx.strings.suspend_resume;
    ctx.slices.begin(
        &mut ctx.storage,
        ts,
        track,
        Some(category),
        Some(slice_name),
        &args,
    );
    power.ongoing_suspend_actions.insert(current_action, true);
    Ok(())
}

pub(crate) fn suspend_resume_minimal(
    ctx: &mut Context,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut start = 0u64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            start = v.as_u64().unwrap_or(0);
        }
    }
    let set = ctx
        .track_sets
        .intern_global(ctx.strings.suspend_resume_minimal);
    if start != 0 {
        let track = ctx.track_sets.begin(&mut ctx.tracks, &mut ctx.storage, set, 0);
        let category = ctx.strings.suspend_resume_minimal;
        let name = ctx.strings.suspended;
        ctx.slices.begin(
            &mut ctx.storage,
            ts,
            track,
            Some(category),
            Some(name),
            &[],
        );
    } else {
        let track = ctx.track_sets.end(&mut ctx.tracks, &mut ctx.storage, set, 0);
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    }
    Ok(())
}

fn wakeup_source_name(data: &[u8]) -> Result<String, ReadError> {
    let mut name: &[u8] = b"";
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            name = v.as_str_bytes().unwrap_or(b"");
        }
    }
    Ok(String::from_utf8_lossy(name).into_owned())
}

pub(crate) fn wakeup_source_activate(
    ctx: &mut Context,
    power: &mut PowerState,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let name = wakeup_source_name(data)?;
    let count = match power.wakelocks.get_mut(&name) {
        Some(count) => {
            *count += 1;
            *count
        }
        None => {
            power.wakelocks.insert(name.clone(), 1);
            1
        }
    };
    // Nested holds extend the open slice instead of stacking new ones.
    if count > 1 {
        return Ok(());
    }
    let slice_name = ctx.storage.intern(&format!("Wakelock({name})"));
    let set = ctx.track_sets.intern_global(slice_name);
    let track = ctx.track_sets.begin(&mut ctx.tracks, &mut ctx.storage, set, 0);
    ctx.slices
        .begin(&mut ctx.storage, ts, track, None, Some(slice_name), &[]);
    Ok(())
}

pub(crate) fn wakeup_source_deactivate(
    ctx: &mut Context,
    power: &mut PowerState,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let name = wakeup_source_name(data)?;
    let previous = match power.wakelocks.get_mut(&name) {
        Some(count) => {
            let previous = *count;
            *count = count.saturating_sub(1);
            previous
        }
        None => 0,
    };
    if previous != 1 {
        return Ok(());
    }
    let slice_name = ctx.storage.intern(&format!("Wakelock({name})"));
    let set = ctx.track_sets.intern_global(slice_name);
    let track = ctx.track_sets.end(&mut ctx.tracks, &mut ctx.storage, set, 0);
    ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    Ok(())
}

pub(crate) fn rpm_status(
    ctx: &mut Context,
    power: &mut PowerState,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut name: &[u8] = b"";
    let mut status = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => name = v.as_str_bytes().unwrap_or(b""),
            (2, v) => status = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    // Device here is anything managed by a kernel driver.
    let device = ctx.storage.intern_bytes(name);
    let track = ctx.tracks.intern_global(
        &mut ctx.storage,
        TrackClassification::LinuxRuntimePowerManagement,
        Some(device),
    );
    // Any status event implies a potential change of state; the open slice
    // ends either way.
    if power.rpm_active.contains(&device) {
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    }
    // Suspended dominates a device's lifetime and stays blank.
    if status == RPM_SUSPENDED {
        power.rpm_active.remove(&device);
        return Ok(());
    }
    let slice_name = match status {
        RPM_ACTIVE => ctx.strings.rpm_active,
        RPM_RESUMING => ctx.strings.rpm_resuming,
        RPM_SUSPENDING => ctx.strings.rpm_suspending,
        _ => ctx.strings.rpm_invalid,
    };
    ctx.slices
        .begin(&mut ctx.storage, ts, track, None, Some(slice_name), &[]);
    power.rpm_active.insert(device);
    Ok(())
}

/// Names for the event bitmask of a device pm callback, in the kernel's
/// PM_EVENT_* order.
fn dpm_event_name(event: i64) -> &'static str {
    match event {
        0x2 => "suspend",
        0x10 => "resume",
        0x1 => "freeze",
        0x8 => "quiesce",
        0x4 => "hibernate",
        0x20 => "thaw",
        0x40 => "restore",
        0x80 => "recover",
        _ => "(unknown PM event)",
    }
}

/// The kernel leaves `pm_ops` empty in the prepare and complete phases and
/// otherwise prefixes it with the phase modifier.
fn callback_phase_name(pm_ops: &str, event: &str) -> String {
    if pm_ops.is_empty() {
        match event {
            "suspend" => return format!("{event}:prepare"),
            "resume" => return format!("{event}:complete"),
            _ => {}
        }
    }
    for phase in ["early", "late", "noirq"] {
        if pm_ops.starts_with(phase) {
            return format!("{event}:{phase}");
        }
    }
    event.to_owned()
}

pub(crate) fn device_pm_callback_start(
    ctx: &mut Context,
    power: &mut PowerState,
    ts: i64,
    pid: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut device: &[u8] = b"";
    let mut driver: &[u8] = b"";
    let mut pm_ops: &[u8] = b"";
    let mut event = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => device = v.as_str_bytes().unwrap_or(b""),
            (2, v) => driver = v.as_str_bytes().unwrap_or(b""),
            (3, v) => pm_ops = v.as_str_bytes().unwrap_or(b""),
            (4, v) => event = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let device = String::from_utf8_lossy(device).into_owned();
    let driver = String::from_utf8_lossy(driver).into_owned();
    let pm_ops = String::from_utf8_lossy(pm_ops);
    let cookie = power.suspend_cookie(&device);
    let set = ctx.track_sets.intern_global(ctx.strings.suspend_resume);
    let track = ctx
        .track_sets
        .begin(&mut ctx.tracks, &mut ctx.storage, set, cookie);

    let slice_name = ctx.storage.intern(&format!("{device} {driver}"));
    let phase = callback_phase_name(&pm_ops, dpm_event_name(event));
    let utid = ctx.processes.get_or_create_thread(pid);
    let ucpu = ctx.cpus.get_or_create_cpu(cpu);
    let device_id = ctx.storage.intern(&device);
    let driver_id = ctx.storage.intern(&driver);
    let phase_id = ctx.storage.intern(&phase);
    let args = [
        (ctx.strings.arg_utid, ArgValue::Uint(utid.0 as u64)),
        (
            ctx.strings.arg_event_type,
            ArgValue::Str(ctx.strings.device_suspend_event),
        ),
        (ctx.strings.arg_ucpu, ArgValue::Uint(ucpu.0 as u64)),
        (ctx.strings.arg_device_name, ArgValue::Str(device_id)),
        (ctx.strings.arg_driver_name, ArgValue::Str(driver_id)),
        (ctx.strings.arg_callback_phase, ArgValue::Str(phase_id)),
    ];
    let category = ctx.strings.suspend_resume;
    ctx.slices.begin(
        &mut ctx.storage,
        ts,
        track,
        Some(category),
        Some(slice_name),
        &args,
    );
    Ok(())
}

pub(crate) fn device_pm_callback_end(
    ctx: &mut Context,
    power: &mut PowerState,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut device: &[u8] = b"";
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            device = v.as_str_bytes().unwrap_or(b"");
        }
    }
    let device = String::from_utf8_lossy(device);
    // An end for a device that never started claims cookie zero.
    let cookie = match power.suspend_cookies.get(device.as_ref()) {
        Some(&cookie) => cookie,
        None => {
            power.suspend_cookies.insert(device.into_owned(), 0);
            0
        }
    };
    let set = ctx.track_sets.intern_global(ctx.strings.suspend_resume);
    let track = ctx
        .track_sets
        .end(&mut ctx.tracks, &mut ctx.storage, set, cookie);
    ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    Ok(())
}

pub(crate) fn devfreq_frequency(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut dev_name: &[u8] = b"";
    let mut freq = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => dev_name = v.as_str_bytes().unwrap_or(b""),
            (2, v) => freq = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let dev_name = String::from_utf8_lossy(dev_name);
    // Keep the cpufreq/gpufreq naming convention: "devfreq_dsu" shows up
    // as "dsufreq".
    let Some(position) = dev_name.find("devfreq_") else {
        return Ok(());
    };
    let suffix = &dev_name[position + "devfreq_".len()..];
    let name = ctx.storage.intern(&format!("{suffix}freq"));
    let track = ctx.tracks.intern_global(
        &mut ctx.storage,
        TrackClassification::LinuxDeviceFrequency,
        Some(name),
    );
    ctx.storage.push_counter(ts, track, freq as f64);
    Ok(())
}

pub(crate) fn bcl_irq_trigger(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut id = 0i64;
    let mut throttle = 0i64;
    // cpu0, cpu1, cpu2, tpu, gpu
    let mut limits = [0i64; 5];
    let mut voltage = 0i64;
    let mut capacity = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => id = v.as_i64().unwrap_or(0),
            (2, v) => throttle = v.as_i64().unwrap_or(0),
            (n @ 3..=7, v) => limits[(n - 3) as usize] = v.as_i64().unwrap_or(0),
            (8, v) => voltage = v.as_i64().unwrap_or(0),
            (9, v) => capacity = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    // Limits only mean anything while the irq throttles.
    let throttling = throttle != 0;
    let counters = [
        ("bcl_irq_id", if throttling { id } else { -1 }),
        ("bcl_irq_throttle", throttle),
        ("bcl_irq_cpu0", if throttling { limits[0] } else { 0 }),
        ("bcl_irq_cpu1", if throttling { limits[1] } else { 0 }),
        ("bcl_irq_cpu2", if throttling { limits[2] } else { 0 }),
        ("bcl_irq_tpu", if throttling { limits[3] } else { 0 }),
        ("bcl_irq_gpu", if throttling { limits[4] } else { 0 }),
        ("bcl_irq_voltage", voltage),
        ("bcl_irq_capacity", capacity),
    ];
    for (name, value) in counters {
        let name = ctx.storage.intern(name);
        let track = ctx.tracks.intern_legacy_global(&mut ctx.storage, name);
        ctx.storage.push_counter(ts, track, value as f64);
    }
    Ok(())
}

pub(crate) fn cros_ec_sensorhub_data(
    ctx: &mut Context,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut sensor = 0u64;
    let mut fifo_timestamp = 0i64;
    let mut current_timestamp = 0i64;
    let mut current_time = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => sensor = v.as_u64().unwrap_or(0),
            (2, v) => fifo_timestamp = v.as_i64().unwrap_or(0),
            (3, v) => current_timestamp = v.as_i64().unwrap_or(0),
            (4, v) => current_time = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let name = ctx
        .storage
        .intern(&format!("cros_ec.cros_ec_sensorhub_data.{sensor}"));
    let track = ctx.tracks.intern_legacy_global(&mut ctx.storage, name);
    let args = [
        (ctx.strings.arg_ec_num, ArgValue::Int(sensor as i64)),
        (
            ctx.strings.arg_ec_delta,
            ArgValue::Int(fifo_timestamp - current_timestamp),
        ),
        (ctx.strings.arg_sample_ts, ArgValue::Int(current_timestamp)),
    ];
    // The counter is the sensor's end-to-end latency at this sample.
    let latency = (current_time - current_timestamp) as f64;
    ctx.storage.push_counter_with_args(ts, track, latency, &args);
    Ok(())
}

pub(crate) fn ufshcd_clk_gating(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut state = 0i64;
    for field in FieldIter::new(data) {
        if let (2, v) = field? {
            state = v.as_i64().unwrap_or(0);
        }
    }
    // Remap the kernel's gating order onto the monotonic OFF..ON scale the
    // counter name advertises.
    let clk_state = match state {
        1 => 3, // ON
        2 => 1, // REQ_OFF
        3 => 2, // REQ_ON
        _ => 0, // OFF
    };
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, ctx.strings.ufs_clkgating);
    ctx.storage.push_counter(ts, track, clk_state as f64);
    Ok(())
}

/// SCSI opcode names as they appear in a UFS command UPIU.
fn ufs_command_name(opcode: u64, group_id: u64) -> String {
    let name = match opcode {
        4 => "FORMAT UNIT",
        18 => "INQUIRY",
        85 => "MODE SELECT (10)",
        90 => "MODE SENSE (10)",
        52 => "PRE-FETCH (10)",
        144 => "PRE-FETCH (16)",
        8 => "READ (6)",
        40 => "READ (10)",
        136 => "READ (16)",
        60 => "READ BUFFER",
        37 => "READ CAPACITY (10)",
        158 => "READ CAPACITY (16)",
        160 => "REPORT LUNS",
        3 => "REQUEST SENSE",
        162 => "SECURITY PROTOCOL IN",
        181 => "SECURITY PROTOCOL OUT",
        29 => "SEND DIAGNOSTIC",
        27 => "START STOP UNIT",
        53 => "SYNCHRONIZE CACHE (10)",
        145 => "SYNCHRONIZE CACHE (16)",
        0 => "TEST UNIT READY",
        66 => "UNMAP",
        47 => "VERIFY",
        10 => "WRITE (6)",
        42 => "WRITE (10)",
        138 => "WRITE (16)",
        59 => "WRITE BUFFER",
        _ => "UNDEFINED",
    };
    if group_id > 0 {
        format!("{name} (GID={group_id:#x})")
    } else {
        name.to_owned()
    }
}

pub(crate) fn ufshcd_command(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut doorbell = 0u64;
    let mut opcode = 0u64;
    let mut tag = 0u64;
    let mut group_id = 0u64;
    let mut str_t = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (2, v) => doorbell = v.as_u64().unwrap_or(0),
            (3, v) => opcode = v.as_u64().unwrap_or(0),
            (4, v) => tag = v.as_u64().unwrap_or(0),
            (6, v) => group_id = v.as_u64().unwrap_or(0),
            (7, v) => str_t = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    // Queue occupancy: the doorbell register when the controller reports
    // one, otherwise the single command this event is about.
    let occupied = if doorbell > 0 {
        doorbell.count_ones() as f64
    } else if str_t == 1 {
        0.0
    } else {
        1.0
    };
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, ctx.strings.ufs_command_count);
    ctx.storage.push_counter(ts, track, occupied);

    // One track set per tag; str_t zero is the send, one the completion.
    let set_name = ctx.storage.intern(&format!("io.ufs.command.tag[{tag:03}]"));
    let set = ctx.track_sets.intern_global(set_name);
    if str_t == 0 {
        let name = ctx.storage.intern(&ufs_command_name(opcode, group_id));
        let track = ctx.track_sets.begin(&mut ctx.tracks, &mut ctx.storage, set, 0);
        ctx.slices
            .begin(&mut ctx.storage, ts, track, None, Some(name), &[]);
    } else {
        let track = ctx.track_sets.end(&mut ctx.tracks, &mut ctx.storage, set, 0);
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::wire::MessageBuilder;

    fn ctx() -> Context {
        Context::new(Config::default())
    }

    fn suspend_event(action: &str, val: i64, start: u64) -> Vec<u8> {
        let mut event = MessageBuilder::new();
        event.string(1, action).int(2, val).varint(3, start);
        event.build()
    }

    #[test]
    fn suspend_action_opens_and_closes_one_slice() {
        let mut ctx = ctx();
        let mut power = PowerState::new();
        suspend_resume(&mut ctx, &mut power, 100, 1, 0, &suspend_event("suspend_enter", 3, 1))
            .unwrap();
        suspend_resume(&mut ctx, &mut power, 900, 1, 0, &suspend_event("suspend_enter", 3, 0))
            .unwrap();

        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "suspend_enter(3)");
        assert_eq!(
            ctx.storage.string(slice.category.unwrap()),
            "Suspend/Resume Latency"
        );
        assert_eq!(slice.dur, 800);
    }

    #[test]
    fn lost_end_is_replaced_by_a_replica_close() {
        let mut ctx = ctx();
        let mut power = PowerState::new();
        suspend_resume(&mut ctx, &mut power, 100, 1, 0, &suspend_event("machine_suspend", 0, 1))
            .unwrap();
        suspend_resume(&mut ctx, &mut power, 400, 1, 0, &suspend_event("machine_suspend", 0, 1))
            .unwrap();

        let first = &ctx.storage.slices()[0];
        assert_eq!(first.dur, 300);
        let replica = ctx
            .storage
            .args_for(first.arg_set)
            .any(|arg| arg.value == ArgValue::Bool(true));
        assert!(replica);
        let second = &ctx.storage.slices()[1];
        assert_eq!(second.dur, -1);
    }

    #[test]
    fn nested_wakelock_holds_make_one_slice() {
        let mut ctx = ctx();
        let mut power = PowerState::new();
        let mut event = MessageBuilder::new();
        event.string(1, "PowerManager.br").varint(2, 1);
        let event = event.build();
        wakeup_source_activate(&mut ctx, &mut power, 10, &event).unwrap();
        wakeup_source_activate(&mut ctx, &mut power, 20, &event).unwrap();
        wakeup_source_deactivate(&mut ctx, &mut power, 30, &event).unwrap();
        wakeup_source_deactivate(&mut ctx, &mut power, 50, &event).unwrap();

        let slices = ctx.storage.slices();
        assert_eq!(slices.len(), 1);
        assert_eq!(
            ctx.storage.string(slices[0].name.unwrap()),
            "Wakelock(PowerManager.br)"
        );
        assert_eq!((slices[0].ts, slices[0].dur), (10, 40));
    }

    #[test]
    fn rpm_states_chain_and_suspended_stays_blank() {
        let mut ctx = ctx();
        let mut power = PowerState::new();
        for (ts, status) in [(10, RPM_ACTIVE), (30, RPM_SUSPENDING), (70, RPM_SUSPENDED)] {
            let mut event = MessageBuilder::new();
            event.string(1, "1-0020").int(2, status);
            rpm_status(&mut ctx, &mut power, ts, &event.build()).unwrap();
        }

        let slices = ctx.storage.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(ctx.storage.string(slices[0].name.unwrap()), "Active");
        assert_eq!((slices[0].ts, slices[0].dur), (10, 20));
        assert_eq!(ctx.storage.string(slices[1].name.unwrap()), "Suspending");
        assert_eq!((slices[1].ts, slices[1].dur), (30, 40));
        assert!(power.rpm_active.is_empty());
    }

    #[test]
    fn pm_callbacks_share_the_suspend_set_with_their_own_cookie() {
        let mut ctx = ctx();
        let mut power = PowerState::new();
        suspend_resume(&mut ctx, &mut power, 100, 1, 0, &suspend_event("suspend_enter", 0, 1))
            .unwrap();
        let mut start = MessageBuilder::new();
        start
            .string(1, "1.2 glink")
            .string(2, "glink")
            .string(3, "late")
            .int(4, 0x2);
        device_pm_callback_start(&mut ctx, &mut power, 150, 7, 2, &start.build()).unwrap();
        let mut end = MessageBuilder::new();
        end.string(1, "1.2 glink").string(2, "glink").int(3, 0);
        device_pm_callback_end(&mut ctx, &mut power, 180, &end.build()).unwrap();

        let slices = ctx.storage.slices();
        assert_eq!(slices.len(), 2);
        // Sibling tracks, not stacked depths.
        assert_ne!(slices[0].track, slices[1].track);
        assert_eq!(ctx.storage.string(slices[1].name.unwrap()), "1.2 glink glink");
        assert_eq!(slices[1].dur, 30);
        let phase = ctx
            .storage
            .args_for(slices[1].arg_set)
            .filter_map(|arg| match arg.value {
                ArgValue::Str(s) => Some(ctx.storage.string(s)),
                _ => None,
            })
            .any(|s| s == "suspend:late");
        assert!(phase);
    }

    #[test]
    fn prepare_and_complete_phases_come_from_empty_pm_ops() {
        assert_eq!(callback_phase_name("", "suspend"), "suspend:prepare");
        assert_eq!(callback_phase_name("", "resume"), "resume:complete");
        assert_eq!(callback_phase_name("noirq bus", "resume"), "resume:noirq");
        assert_eq!(callback_phase_name("platform", "thaw"), "thaw");
    }

    #[test]
    fn ufs_commands_pair_per_tag_with_opcode_names() {
        let mut ctx = ctx();
        let mut send = MessageBuilder::new();
        send.varint(2, 0b1010)
            .varint(3, 40)
            .varint(4, 7)
            .varint(6, 0)
            .varint(7, 0);
        ufshcd_command(&mut ctx, 10, &send.build()).unwrap();
        let mut done = MessageBuilder::new();
        done.varint(2, 0).varint(4, 7).varint(7, 1);
        ufshcd_command(&mut ctx, 60, &done.build()).unwrap();

        let counts: Vec<f64> = ctx.storage.counters().iter().map(|c| c.value).collect();
        assert_eq!(counts, vec![2.0, 0.0]);
        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "READ (10)");
        assert_eq!(slice.dur, 50);
        let track = ctx.storage.track(slice.track);
        assert_eq!(
            ctx.storage.string(track.name.unwrap()),
            "io.ufs.command.tag[007]"
        );
    }

    #[test]
    fn clock_gating_states_map_to_the_advertised_scale() {
        let mut ctx = ctx();
        for state in [0, 1, 2, 3] {
            let mut event = MessageBuilder::new();
            event.string(1, "ufshcd").int(2, state);
            ufshcd_clk_gating(&mut ctx, state * 10, &event.build()).unwrap();
        }
        let values: Vec<f64> = ctx.storage.counters().iter().map(|c| c.value).collect();
        assert_eq!(values, vec![0.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn devfreq_counters_reuse_the_freq_suffix_convention() {
        let mut ctx = ctx();
        let mut event = MessageBuilder::new();
        event.string(1, "devfreq_dsu").varint(2, 1_248_000);
        devfreq_frequency(&mut ctx, 10, &event.build()).unwrap();
        let mut other = MessageBuilder::new();
        other.string(1, "thermal-cooling").varint(2, 5);
        devfreq_frequency(&mut ctx, 20, &other.build()).unwrap();

        let counters = ctx.storage.counters();
        assert_eq!(counters.len(), 1);
        let track = ctx.storage.track(counters[0].track);
        assert_eq!(ctx.storage.string(track.name.unwrap()), "dsufreq");
    }

    #[test]
    fn bcl_limits_are_gated_by_throttle() {
        let mut ctx = ctx();
        let mut event = MessageBuilder::new();
        event
            .int(1, 4)
            .int(2, 0)
            .int(3, 1800)
            .int(6, 900)
            .int(8, 3600)
            .int(9, 85);
        bcl_irq_trigger(&mut ctx, 10, &event.build()).unwrap();

        let values: Vec<f64> = ctx.storage.counters().iter().map(|c| c.value).collect();
        assert_eq!(
            values,
            vec![-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3600.0, 85.0]
        );
    }
}
