//! Hard irq, softirq and workqueue slices. Interrupts nest on per-cpu
//! tracks; workqueue items run on the worker thread's own track.

use crate::classification::TrackClassification;
use crate::context::Context;
use crate::error::ReadError;
use crate::interner::{kernel_symbol_or_fallback, SequenceState};
use crate::stats::Stat;
use crate::storage::{ArgValue, TrackId};
use crate::wire::FieldIter;

/// Softirq vector numbers are indexes into the kernel's fixed action table.
const SOFTIRQ_ACTIONS: [&str; 10] = [
    "HI", "TIMER", "NET_TX", "NET_RX", "BLOCK", "IRQ_POLL", "TASKLET", "SCHED", "HRTIMER", "RCU",
];

pub(crate) fn irq_handler_entry(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut name: &[u8] = b"";
    for field in FieldIter::new(data) {
        if let (2, v) = field? {
            name = v.as_str_bytes().unwrap_or(b"");
        }
    }
    let slice_name = ctx
        .storage
        .intern(&format!("IRQ ({})", String::from_utf8_lossy(name)));
    let track = irq_cpu_track(ctx, cpu);
    let category = ctx.strings.cat_irq;
    ctx.slices.begin(
        &mut ctx.storage,
        ts,
        track,
        Some(category),
        Some(slice_name),
        &[],
    );
    Ok(())
}

pub(crate) fn irq_handler_exit(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut ret = 0i64;
    for field in FieldIter::new(data) {
        if let (2, v) = field? {
            ret = v.as_i64().unwrap_or(0);
        }
    }
    let outcome = if ret == 1 { "handled" } else { "unhandled" };
    let outcome = ctx.storage.intern(outcome);
    let track = irq_cpu_track(ctx, cpu);
    let category = ctx.strings.cat_irq;
    let args = [(ctx.strings.arg_ret, ArgValue::Str(outcome))];
    ctx.slices
        .end(&mut ctx.storage, ts, track, Some(category), None, &args);
    Ok(())
}

pub(crate) fn softirq_entry(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let vec = softirq_vec(data)?;
    let Some(action) = SOFTIRQ_ACTIONS.get(vec as usize) else {
        ctx.storage.increment_stat(Stat::SOFTIRQ_UNKNOWN_ACTION);
        return Ok(());
    };
    let slice_name = ctx.storage.intern(action);
    let track = softirq_cpu_track(ctx, cpu);
    let category = ctx.strings.cat_irq;
    ctx.slices.begin(
        &mut ctx.storage,
        ts,
        track,
        Some(category),
        Some(slice_name),
        &[],
    );
    Ok(())
}

pub(crate) fn softirq_exit(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let vec = softirq_vec(data)?;
    let track = softirq_cpu_track(ctx, cpu);
    let category = ctx.strings.cat_irq;
    let args = [(ctx.strings.arg_vec, ArgValue::Int(vec as i64))];
    ctx.slices
        .end(&mut ctx.storage, ts, track, Some(category), None, &args);
    Ok(())
}

fn softirq_vec(data: &[u8]) -> Result<u64, ReadError> {
    let mut vec = 0u64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            vec = v.as_u64().unwrap_or(0);
        }
    }
    Ok(vec)
}

fn irq_cpu_track(ctx: &mut Context, cpu: u32) -> TrackId {
    let name = ctx.storage.intern(&format!("Irq Cpu {cpu}"));
    ctx.tracks
        .intern_cpu(&mut ctx.storage, TrackClassification::IrqCpu, cpu, Some(name))
}

fn softirq_cpu_track(ctx: &mut Context, cpu: u32) -> TrackId {
    let name = ctx.storage.intern(&format!("SoftIrq Cpu {cpu}"));
    ctx.tracks.intern_cpu(
        &mut ctx.storage,
        TrackClassification::SoftirqCpu,
        cpu,
        Some(name),
    )
}

pub(crate) fn workqueue_execute_start(
    ctx: &mut Context,
    sequence: &SequenceState,
    ts: i64,
    pid: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let function = workqueue_function(data)?;
    let name = kernel_symbol_or_fallback(&mut ctx.storage, sequence, function);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let category = ctx.strings.cat_workqueue;
    let args = [(ctx.strings.arg_cpu, ArgValue::Int(cpu as i64))];
    ctx.slices.begin(
        &mut ctx.storage,
        ts,
        track,
        Some(category),
        Some(name),
        &args,
    );
    Ok(())
}

pub(crate) fn workqueue_execute_end(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
) -> Result<(), ReadError> {
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let category = ctx.strings.cat_workqueue;
    ctx.slices
        .end(&mut ctx.storage, ts, track, Some(category), None, &[]);
    Ok(())
}

pub(crate) fn workqueue_queue_work(
    ctx: &mut Context,
    sequence: &SequenceState,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let function = workqueue_function(data)?;
    let symbol = kernel_symbol_or_fallback(&mut ctx.storage, sequence, function);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.workqueue_scheduled;
    let args = [(ctx.strings.arg_function, ArgValue::Str(symbol))];
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &args);
    Ok(())
}

fn workqueue_function(data: &[u8]) -> Result<u64, ReadError> {
    let mut function = 0u64;
    for field in FieldIter::new(data) {
        if let (2, v) = field? {
            function = v.as_u64().unwrap_or(0);
        }
    }
    Ok(function)
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
    fn irq_pair_nests_on_the_cpu_track() {
        let mut ctx = ctx();
        let mut entry = MessageBuilder::new();
        entry.int(1, 30).string(2, "arch_timer");
        irq_handler_entry(&mut ctx, 100, 0, &entry.build()).unwrap();
        let mut exit = MessageBuilder::new();
        exit.int(1, 30).int(2, 1);
        irq_handler_exit(&mut ctx, 140, 0, &exit.build()).unwrap();

        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "IRQ (arch_timer)");
        assert_eq!(slice.dur, 40);
        let ret = ctx.storage.args_for(slice.arg_set).next().unwrap();
        match ret.value {
            ArgValue::Str(s) => assert_eq!(ctx.storage.string(s), "handled"),
            ref other => panic!("unexpected arg {other:?}"),
        }
    }

    #[test]
    fn out_of_range_softirq_vector_is_counted_not_sliced() {
        let mut ctx = ctx();
        let mut entry = MessageBuilder::new();
        entry.varint(1, 99);
        softirq_entry(&mut ctx, 10, 1, &entry.build()).unwrap();

        assert!(ctx.storage.slices().is_empty());
        assert_eq!(ctx.storage.stats.get(Stat::SOFTIRQ_UNKNOWN_ACTION), 1);
    }

    #[test]
    fn workqueue_slice_is_named_by_the_interned_symbol() {
        let mut ctx = ctx();
        let mut sequence = SequenceState::new();
        sequence.add_kernel_symbol(0xbeef, "wb_workfn".to_owned());

        let mut start = MessageBuilder::new();
        start.varint(1, 0xf00).varint(2, 0xbeef);
        workqueue_execute_start(&mut ctx, &sequence, 5, 42, 2, &start.build()).unwrap();
        workqueue_execute_end(&mut ctx, 25, 42).unwrap();

        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "wb_workfn");
        assert_eq!(slice.dur, 20);
        assert_eq!(
            ctx.storage.string(slice.category.unwrap()),
            "workqueue"
        );
    }
}
