//! Memory pressure events. OOM bookkeeping, allocator heap totals with
//! per-thread change counters, and reclaim slices on the reclaiming thread.

use crate::context::Context;
use crate::error::ReadError;
use crate::interner::{kernel_symbol_or_fallback, SequenceState};
use crate::process::Utid;
use crate::stats::Stat;
use crate::storage::{ArgValue, StringId};
use crate::wire::FieldIter;

/// Attributes a named counter to the thread's process when the binding is
/// known, and to the thread itself otherwise.
fn push_process_counter_for_thread(
    ctx: &mut Context,
    ts: i64,
    utid: Utid,
    name: StringId,
    value: f64,
) {
    let track = match ctx.processes.thread(utid).upid {
        Some(upid) => ctx
            .tracks
            .intern_process_counter(&mut ctx.storage, upid, name),
        None => ctx
            .tracks
            .intern_thread_counter(&mut ctx.storage, utid, name),
    };
    ctx.storage.push_counter(ts, track, value);
}

pub(crate) fn oom_score_adj_update(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut pid = 0i64;
    let mut score = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (2, v) => pid = v.as_i64().unwrap_or(0),
            (3, v) => score = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    // Old kernels serialize this signed field through an unsigned encoder;
    // the i16 round trip recovers negative adjustments.
    let score = score as i16;
    let utid = ctx.processes.get_or_create_thread(pid);
    let name = ctx.strings.oom_score_adj;
    push_process_counter_for_thread(ctx, ts, utid, name, score as f64);
    Ok(())
}

pub(crate) fn mark_victim(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut pid = 0i64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            pid = v.as_i64().unwrap_or(0);
        }
    }
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.oom_kill;
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &[]);
    Ok(())
}

pub(crate) fn mm_event_record(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut avg_lat = 0u64;
    let mut count = 0u64;
    let mut max_lat = 0u64;
    let mut kind = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => avg_lat = v.as_u64().unwrap_or(0),
            (2, v) => count = v.as_u64().unwrap_or(0),
            (3, v) => max_lat = v.as_u64().unwrap_or(0),
            (4, v) => kind = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let Some(&names) = ctx.strings.mm_event.get(kind as usize) else {
        ctx.storage.increment_stat(Stat::MM_EVENT_UNKNOWN_TYPE);
        return Ok(());
    };
    let utid = ctx.processes.get_or_create_thread(pid);
    push_process_counter_for_thread(ctx, ts, utid, names.count, count as f64);
    push_process_counter_for_thread(ctx, ts, utid, names.max_lat, max_lat as f64);
    push_process_counter_for_thread(ctx, ts, utid, names.avg_lat, avg_lat as f64);
    Ok(())
}

pub(crate) fn ion_heap_change(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
    grow: bool,
) -> Result<(), ReadError> {
    let mut heap_name: Option<&[u8]> = None;
    let mut len = 0i64;
    let mut total_allocated = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => heap_name = v.as_str_bytes(),
            (2, v) => len = v.as_i64().unwrap_or(0),
            (3, v) => total_allocated = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let change = if grow { len } else { -len };
    // The event reports the total before the change is applied.
    let total = total_allocated + change;
    let (total_name, change_name) = match heap_name {
        Some(heap) => {
            let heap = String::from_utf8_lossy(heap);
            (
                ctx.storage.intern(&format!("mem.ion.{heap}")),
                ctx.storage.intern(&format!("mem.ion_change.{heap}")),
            )
        }
        None => (
            ctx.strings.ion_total_unknown,
            ctx.strings.ion_change_unknown,
        ),
    };
    let track = ctx.tracks.intern_legacy_global(&mut ctx.storage, total_name);
    ctx.storage.push_counter(ts, track, total as f64);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx
        .tracks
        .intern_thread_counter(&mut ctx.storage, utid, change_name);
    ctx.storage.push_counter(ts, track, change as f64);
    Ok(())
}

pub(crate) fn ion_stat(ctx: &mut Context, ts: i64, pid: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut buffer_id = 0u64;
    let mut len = 0i64;
    let mut total_allocated = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => buffer_id = v.as_u64().unwrap_or(0),
            (2, v) => len = v.as_i64().unwrap_or(0),
            (3, v) => total_allocated = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, ctx.strings.ion_total);
    ctx.storage.push_counter(ts, track, total_allocated as f64);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx
        .tracks
        .intern_thread_counter(&mut ctx.storage, utid, ctx.strings.ion_change);
    ctx.storage.push_counter(ts, track, len as f64);

    // One sibling track per live buffer, from allocation to free.
    let set = ctx.track_sets.intern_global(ctx.strings.ion_buffer);
    let cookie = buffer_id as i64;
    if len > 0 {
        let name = ctx.storage.intern(&format!("{} kB", len / 1024));
        let track = ctx
            .track_sets
            .begin(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        ctx.slices
            .begin(&mut ctx.storage, ts, track, None, Some(name), &[]);
    } else {
        let track = ctx
            .track_sets
            .end(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    }
    Ok(())
}

pub(crate) fn dma_heap_stat(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut inode = 0u64;
    let mut len = 0i64;
    let mut total_allocated = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => inode = v.as_u64().unwrap_or(0),
            (2, v) => len = v.as_i64().unwrap_or(0),
            (3, v) => total_allocated = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, ctx.strings.dma_heap_total);
    ctx.storage.push_counter(ts, track, total_allocated as f64);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx
        .tracks
        .intern_thread_counter(&mut ctx.storage, utid, ctx.strings.dma_heap_change);
    let args = [(ctx.strings.arg_inode, ArgValue::Uint(inode))];
    ctx.storage
        .push_counter_with_args(ts, track, len as f64, &args);

    let set = ctx.track_sets.intern_global(ctx.strings.dma_buffer);
    let cookie = inode as i64;
    if len > 0 {
        let name = ctx.storage.intern(&format!("{} kB", len / 1024));
        let track = ctx
            .track_sets
            .begin(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        ctx.slices
            .begin(&mut ctx.storage, ts, track, None, Some(name), &[]);
    } else {
        let track = ctx
            .track_sets
            .end(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    }
    Ok(())
}

pub(crate) fn gpu_mem_total(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut pid = 0i64;
    let mut size = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (2, v) => pid = v.as_i64().unwrap_or(0),
            (3, v) => size = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let name = ctx.strings.gpu_memory;
    if pid == 0 {
        // Pid zero carries the device-wide total.
        let track = ctx.tracks.intern_legacy_global(&mut ctx.storage, name);
        ctx.storage.push_counter(ts, track, size as f64);
        return Ok(());
    }
    // Process-scoped totals can outlive their process; only attribute them
    // to a thread the trace has already seen.
    if ctx.processes.get_thread_or_null(pid).is_none() {
        ctx.storage.increment_stat(Stat::GPU_MEM_NO_PROCESS);
        return Ok(());
    }
    let utid = ctx.processes.update_thread(pid, pid);
    push_process_counter_for_thread(ctx, ts, utid, name, size as f64);
    Ok(())
}

pub(crate) fn direct_reclaim_begin(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut order = 0i64;
    let mut may_writepage = 0i64;
    let mut gfp_flags = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => order = v.as_i64().unwrap_or(0),
            (2, v) => may_writepage = v.as_i64().unwrap_or(0),
            (3, v) => gfp_flags = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.direct_reclaim;
    let args = [
        (ctx.strings.arg_reclaim_order, ArgValue::Int(order)),
        (
            ctx.strings.arg_reclaim_may_writepage,
            ArgValue::Int(may_writepage),
        ),
        (ctx.strings.arg_reclaim_gfp_flags, ArgValue::Uint(gfp_flags)),
    ];
    ctx.slices
        .begin(&mut ctx.storage, ts, track, None, Some(name), &args);
    Ok(())
}

pub(crate) fn direct_reclaim_end(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut nr_reclaimed = 0u64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            nr_reclaimed = v.as_u64().unwrap_or(0);
        }
    }
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let args = [(
        ctx.strings.arg_reclaim_nr_reclaimed,
        ArgValue::Uint(nr_reclaimed),
    )];
    ctx.slices
        .end(&mut ctx.storage, ts, track, None, None, &args);
    Ok(())
}

pub(crate) fn shrink_slab_start(
    ctx: &mut Context,
    sequence: &SequenceState,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut shrink = 0u64;
    let mut total_scan = 0u64;
    let mut priority = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => shrink = v.as_u64().unwrap_or(0),
            (2, v) => total_scan = v.as_u64().unwrap_or(0),
            (3, v) => priority = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let symbol = kernel_symbol_or_fallback(&mut ctx.storage, sequence, shrink);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.shrink_slab;
    let args = [
        (ctx.strings.arg_shrink_name, ArgValue::Str(symbol)),
        (ctx.strings.arg_total_scan, ArgValue::Uint(total_scan)),
        (ctx.strings.arg_priority, ArgValue::Int(priority)),
    ];
    ctx.slices
        .begin(&mut ctx.storage, ts, track, None, Some(name), &args);
    Ok(())
}

pub(crate) fn shrink_slab_end(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut retval = 0i64;
    for field in FieldIter::new(data) {
        if let (2, v) = field? {
            retval = v.as_i64().unwrap_or(0);
        }
    }
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let args = [(ctx.strings.arg_freed, ArgValue::Int(retval))];
    ctx.slices
        .end(&mut ctx.storage, ts, track, None, None, &args);
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

    #[test]
    fn oom_score_survives_the_unsigned_encoder() {
        let mut ctx = ctx();
        let mut event = MessageBuilder::new();
        // -1 written as a full-width unsigned varint.
        event.string(1, "app").int(2, 42).varint(3, 0xffff);
        oom_score_adj_update(&mut ctx, 10, &event.build()).unwrap();

        let counter = &ctx.storage.counters()[0];
        assert_eq!(counter.value, -1.0);
        let track = ctx.storage.track(counter.track);
        assert_eq!(ctx.storage.string(track.name.unwrap()), "oom_score_adj");
    }

    #[test]
    fn unknown_mm_event_type_is_counted_not_recorded() {
        let mut ctx = ctx();
        let mut event = MessageBuilder::new();
        event.varint(1, 5).varint(2, 3).varint(3, 9).varint(4, 7);
        mm_event_record(&mut ctx, 10, 42, &event.build()).unwrap();

        assert!(ctx.storage.counters().is_empty());
        assert_eq!(ctx.storage.stats.get(Stat::MM_EVENT_UNKNOWN_TYPE), 1);
    }

    #[test]
    fn mm_event_fans_out_to_three_named_counters() {
        let mut ctx = ctx();
        let mut event = MessageBuilder::new();
        event.varint(1, 5).varint(2, 3).varint(3, 9).varint(4, 0);
        mm_event_record(&mut ctx, 10, 42, &event.build()).unwrap();

        let names: Vec<_> = ctx
            .storage
            .counters()
            .iter()
            .map(|c| {
                let track = ctx.storage.track(c.track);
                (ctx.storage.string(track.name.unwrap()), c.value)
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("mem.mm.min_flt.count", 3.0),
                ("mem.mm.min_flt.max_lat", 9.0),
                ("mem.mm.min_flt.avg_lat", 5.0),
            ]
        );
    }

    #[test]
    fn ion_buffer_lifecycle_pairs_by_buffer_id() {
        let mut ctx = ctx();
        let mut alloc = MessageBuilder::new();
        alloc.varint(1, 77).int(2, 16384).int(3, 16384);
        ion_stat(&mut ctx, 100, 42, &alloc.build()).unwrap();
        let mut free = MessageBuilder::new();
        free.varint(1, 77).int(2, -16384).int(3, 0);
        ion_stat(&mut ctx, 160, 42, &free.build()).unwrap();

        // Global total, thread change, then the buffer slice.
        let totals: Vec<f64> = ctx.storage.counters().iter().map(|c| c.value).collect();
        assert_eq!(totals, vec![16384.0, 16384.0, 0.0, -16384.0]);
        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "16 kB");
        assert_eq!(slice.dur, 60);
    }

    #[test]
    fn heap_change_reconstructs_the_post_change_total() {
        let mut ctx = ctx();
        let mut shrink = MessageBuilder::new();
        shrink.string(1, "system").int(2, 4096).int(3, 8192);
        ion_heap_change(&mut ctx, 5, 42, &shrink.build(), false).unwrap();

        let total = &ctx.storage.counters()[0];
        let track = ctx.storage.track(total.track);
        assert_eq!(ctx.storage.string(track.name.unwrap()), "mem.ion.system");
        assert_eq!(total.value, 4096.0);
        let change = &ctx.storage.counters()[1];
        assert_eq!(change.value, -4096.0);
    }

    #[test]
    fn gpu_totals_for_unseen_pids_are_dropped() {
        let mut ctx = ctx();
        let mut event = MessageBuilder::new();
        event.varint(1, 0).varint(2, 4242).varint(3, 1 << 20);
        gpu_mem_total(&mut ctx, 10, &event.build()).unwrap();
        assert!(ctx.storage.counters().is_empty());
        assert_eq!(ctx.storage.stats.get(Stat::GPU_MEM_NO_PROCESS), 1);

        // Once the thread exists the counter lands on its process.
        ctx.processes.get_or_create_thread(4242);
        gpu_mem_total(&mut ctx, 20, &event.build()).unwrap();
        assert_eq!(ctx.storage.counters().len(), 1);
    }

    #[test]
    fn reclaim_slice_carries_its_fields_as_args() {
        let mut ctx = ctx();
        let mut begin = MessageBuilder::new();
        begin.int(1, 2).int(2, 1).varint(3, 0x14200ca);
        direct_reclaim_begin(&mut ctx, 100, 42, &begin.build()).unwrap();
        let mut end = MessageBuilder::new();
        end.varint(1, 128);
        direct_reclaim_end(&mut ctx, 400, 42, &end.build()).unwrap();

        let slice = &ctx.storage.slices()[0];
        assert_eq!(
            ctx.storage.string(slice.name.unwrap()),
            "mm_vmscan_direct_reclaim"
        );
        assert_eq!(slice.dur, 300);
        let args: Vec<_> = ctx.storage.args_for(slice.arg_set).collect();
        assert_eq!(args.len(), 4);
        assert_eq!(args[3].value, ArgValue::Uint(128));
    }
}
