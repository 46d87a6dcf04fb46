//! Cpu and gpu frequency, idle and utilization counters, plus the funcgraph
//! slices that attach to either a thread or an idle cpu.

use crate::classification::TrackClassification;
use crate::context::Context;
use crate::error::ReadError;
use crate::interner::{kernel_symbol_or_fallback, SequenceState};
use crate::storage::TrackId;
use crate::wire::FieldIter;

pub(crate) fn cpu_frequency(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut freq_khz = 0u64;
    let mut cpu = 0u32;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => freq_khz = v.as_u64().unwrap_or(0),
            (2, v) => cpu = v.as_u32().unwrap_or(0),
            _ => {}
        }
    }
    let name = ctx.storage.intern("cpufreq");
    let track = ctx.tracks.intern_cpu_counter(
        &mut ctx.storage,
        TrackClassification::CpuFrequency,
        cpu,
        Some(name),
    );
    ctx.storage.push_counter(ts, track, freq_khz as f64);
    Ok(())
}

pub(crate) fn cpu_idle(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut state = 0u64;
    let mut cpu = 0u32;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => state = v.as_u64().unwrap_or(0),
            (2, v) => cpu = v.as_u32().unwrap_or(0),
            _ => {}
        }
    }
    let name = ctx.storage.intern("cpuidle");
    let track = ctx.tracks.intern_cpu_counter(
        &mut ctx.storage,
        TrackClassification::CpuIdle,
        cpu,
        Some(name),
    );
    ctx.storage.push_counter(ts, track, state as f64);
    Ok(())
}

pub(crate) fn cpu_frequency_limits(
    ctx: &mut Context,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut min_freq = 0u64;
    let mut max_freq = 0u64;
    let mut cpu = 0u32;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => min_freq = v.as_u64().unwrap_or(0),
            (2, v) => max_freq = v.as_u64().unwrap_or(0),
            (3, v) => cpu = v.as_u32().unwrap_or(0),
            _ => {}
        }
    }
    let max_name = ctx.storage.intern(&format!("Cpu {cpu} Max Freq Limit"));
    let max_track = ctx.tracks.intern_cpu_counter(
        &mut ctx.storage,
        TrackClassification::CpuMaxFrequencyLimit,
        cpu,
        Some(max_name),
    );
    ctx.storage.push_counter(ts, max_track, max_freq as f64);

    let min_name = ctx.storage.intern(&format!("Cpu {cpu} Min Freq Limit"));
    let min_track = ctx.tracks.intern_cpu_counter(
        &mut ctx.storage,
        TrackClassification::CpuMinFrequencyLimit,
        cpu,
        Some(min_name),
    );
    ctx.storage.push_counter(ts, min_track, min_freq as f64);
    Ok(())
}

pub(crate) fn sched_cpu_util_cfs(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut cpu = 0u32;
    let mut cpu_util = 0u64;
    let mut capacity = 0u64;
    let mut nr_running = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => cpu = v.as_u32().unwrap_or(0),
            (2, v) => cpu_util = v.as_u64().unwrap_or(0),
            (3, v) => capacity = v.as_u64().unwrap_or(0),
            (4, v) => nr_running = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    for (classification, name, value) in [
        (
            TrackClassification::CpuUtilization,
            format!("Cpu {cpu} Util"),
            cpu_util,
        ),
        (
            TrackClassification::CpuCapacity,
            format!("Cpu {cpu} Cap"),
            capacity,
        ),
        (
            TrackClassification::CpuNumberRunning,
            format!("Cpu {cpu} Nr Running"),
            nr_running,
        ),
    ] {
        let name = ctx.storage.intern(&name);
        let track = ctx
            .tracks
            .intern_cpu_counter(&mut ctx.storage, classification, cpu, Some(name));
        ctx.storage.push_counter(ts, track, value as f64);
    }
    Ok(())
}

pub(crate) fn gpu_frequency(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut gpu = 0u32;
    let mut state = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => gpu = v.as_u32().unwrap_or(0),
            (2, v) => state = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    push_gpu_frequency(ctx, ts, gpu, state as f64);
    Ok(())
}

pub(crate) fn kgsl_gpu_frequency(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut gpu = 0u32;
    let mut gpu_freq = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => gpu = v.as_u32().unwrap_or(0),
            (2, v) => gpu_freq = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    // The source reports kHz.
    push_gpu_frequency(ctx, ts, gpu, gpu_freq as f64 * 1000.0);
    Ok(())
}

fn push_gpu_frequency(ctx: &mut Context, ts: i64, gpu: u32, value: f64) {
    let name = ctx.storage.intern("gpufreq");
    let track = ctx.tracks.intern_gpu_counter(
        &mut ctx.storage,
        TrackClassification::GpuFrequency,
        gpu,
        Some(name),
    );
    ctx.storage.push_counter(ts, track, value);
}

pub(crate) fn funcgraph_entry(
    ctx: &mut Context,
    sequence: &SequenceState,
    ts: i64,
    pid: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let func = funcgraph_func(data)?;
    let name = kernel_symbol_or_fallback(&mut ctx.storage, sequence, func);
    let track = funcgraph_track(ctx, pid, cpu);
    ctx.slices
        .begin(&mut ctx.storage, ts, track, None, Some(name), &[]);
    Ok(())
}

pub(crate) fn funcgraph_exit(
    ctx: &mut Context,
    sequence: &SequenceState,
    ts: i64,
    pid: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let func = funcgraph_func(data)?;
    let name = kernel_symbol_or_fallback(&mut ctx.storage, sequence, func);
    let track = funcgraph_track(ctx, pid, cpu);
    ctx.slices
        .end(&mut ctx.storage, ts, track, None, Some(name), &[]);
    Ok(())
}

fn funcgraph_func(data: &[u8]) -> Result<u64, ReadError> {
    let mut func = 0u64;
    for field in FieldIter::new(data) {
        if let (2, v) = field? {
            func = v.as_u64().unwrap_or(0);
        }
    }
    Ok(func)
}

/// Swapper threads all share tid 0 and can run concurrently on every cpu, so
/// their funcgraph slices live on per-cpu tracks instead of a thread track.
fn funcgraph_track(ctx: &mut Context, pid: i64, cpu: u32) -> TrackId {
    if pid != 0 {
        let utid = ctx.processes.get_or_create_thread(pid);
        return ctx.tracks.intern_thread(&mut ctx.storage, utid);
    }
    let name = ctx.storage.intern(&format!("swapper{cpu} -funcgraph"));
    ctx.tracks.intern_cpu(
        &mut ctx.storage,
        TrackClassification::FuncgraphCpu,
        cpu,
        Some(name),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::wire::MessageBuilder;

    fn ctx() -> Context {
        Context::new(Config::default())
    }

    #[test]
    fn frequency_counter_is_keyed_by_cpu() {
        let mut ctx = ctx();
        let mut msg = MessageBuilder::new();
        msg.varint(1, 1_804_800).varint(2, 3);
        cpu_frequency(&mut ctx, 100, &msg.build()).unwrap();
        cpu_frequency(&mut ctx, 200, &msg.build()).unwrap();

        let counters = ctx.storage.counters();
        assert_eq!(counters.len(), 2);
        assert_eq!(counters[0].track, counters[1].track);
        assert_eq!(counters[0].value, 1_804_800.0);
        let track = ctx.storage.track(counters[0].track);
        assert_eq!(ctx.storage.string(track.name.unwrap()), "cpufreq");
    }

    #[test]
    fn util_cfs_fans_out_to_three_counters() {
        let mut ctx = ctx();
        let mut msg = MessageBuilder::new();
        msg.varint(1, 2).varint(2, 350).varint(3, 1024).varint(4, 5);
        sched_cpu_util_cfs(&mut ctx, 10, &msg.build()).unwrap();

        let names: Vec<&str> = ctx
            .storage
            .counters()
            .iter()
            .map(|c| {
                let track = ctx.storage.track(c.track);
                ctx.storage.string(track.name.unwrap())
            })
            .collect();
        assert_eq!(names, ["Cpu 2 Util", "Cpu 2 Cap", "Cpu 2 Nr Running"]);
    }

    #[test]
    fn swapper_funcgraph_goes_to_a_cpu_track() {
        let mut ctx = ctx();
        let sequence = SequenceState::new();
        let mut msg = MessageBuilder::new();
        msg.int(1, 1).varint(2, 0xffff_aabb);
        funcgraph_entry(&mut ctx, &sequence, 50, 0, 7, &msg.build()).unwrap();

        let slice = &ctx.storage.slices()[0];
        let track = ctx.storage.track(slice.track);
        assert_eq!(
            ctx.storage.string(track.name.unwrap()),
            "swapper7 -funcgraph"
        );
        // Unresolvable function pointers degrade to hex.
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "0xffffaabb");
    }

    #[test]
    fn kgsl_frequency_lands_on_the_gpu_frequency_track() {
        let mut ctx = ctx();
        let mut gpu = MessageBuilder::new();
        gpu.varint(1, 0).varint(2, 305_000_000);
        gpu_frequency(&mut ctx, 10, &gpu.build()).unwrap();
        let mut kgsl = MessageBuilder::new();
        kgsl.varint(1, 0).varint(2, 305_000);
        kgsl_gpu_frequency(&mut ctx, 20, &kgsl.build()).unwrap();

        let counters = ctx.storage.counters();
        assert_eq!(counters[0].track, counters[1].track);
        assert_eq!(counters[1].value, 305_000_000.0);
    }
}
