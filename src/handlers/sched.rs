//! Scheduler and process-lifecycle events: wakeups, blocked reasons, task
//! creation and renaming, signals, secure-monitor calls and kprobes.

use crate::context::Context;
use crate::error::ReadError;
use crate::interner::{kernel_symbol_or_fallback, SequenceState};
use crate::process::ThreadNamePriority;
use crate::storage::{ArgValue, StringId};
use crate::wire::FieldIter;

/// From the kernel's sched.h; set when clone() creates a thread rather than
/// a forked process.
const CLONE_THREAD: u64 = 0x10000;

pub(crate) fn sched_wakeup(ctx: &mut Context, ts: i64, pid: i64, data: &[u8]) -> Result<(), ReadError> {
    let name = ctx.strings.sched_wakeup;
    waking_instant(ctx, ts, pid, data, name)
}

pub(crate) fn sched_waking(ctx: &mut Context, ts: i64, pid: i64, data: &[u8]) -> Result<(), ReadError> {
    let name = ctx.strings.sched_waking;
    waking_instant(ctx, ts, pid, data, name)
}

/// Renames the wakee from the tracepoint's comm, then marks the wakeup as an
/// instant on the wakee's track with the waker attached as an arg.
fn waking_instant(
    ctx: &mut Context,
    ts: i64,
    waker_pid: i64,
    data: &[u8],
    name: StringId,
) -> Result<(), ReadError> {
    let mut comm: &[u8] = b"";
    let mut wakee_pid = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => comm = v.as_str_bytes().unwrap_or(b""),
            (2, v) => wakee_pid = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let comm = ctx.storage.intern_bytes(comm);
    let wakee = ctx.processes.get_or_create_thread(wakee_pid);
    ctx.processes
        .update_thread_name(wakee, comm, ThreadNamePriority::Ftrace);
    let waker = ctx.processes.get_or_create_thread(waker_pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, wakee);
    let args = [(ctx.strings.arg_waker_utid, ArgValue::Uint(waker.0 as u64))];
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &args);
    Ok(())
}

pub(crate) fn sched_blocked_reason(
    ctx: &mut Context,
    sequence: &SequenceState,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut pid = 0i64;
    let mut caller = 0u64;
    let mut io_wait = false;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => pid = v.as_i64().unwrap_or(0),
            (2, v) => caller = v.as_u64().unwrap_or(0),
            (3, v) => io_wait = v.as_bool().unwrap_or(false),
            _ => {}
        }
    }
    let function = kernel_symbol_or_fallback(&mut ctx.storage, sequence, caller);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.sched_blocked_reason;
    let args = [
        (ctx.strings.arg_io_wait, ArgValue::Bool(io_wait)),
        (ctx.strings.arg_function, ArgValue::Str(function)),
    ];
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &args);
    Ok(())
}

/// task_newtask is raised for both fork() (new process) and
/// clone(CLONE_THREAD) (new thread inside the caller's process).
pub(crate) fn task_newtask(
    ctx: &mut Context,
    source_pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut new_tid = 0i64;
    let mut comm: &[u8] = b"";
    let mut clone_flags = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => new_tid = v.as_i64().unwrap_or(0),
            (2, v) => comm = v.as_str_bytes().unwrap_or(b""),
            (3, v) => clone_flags = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let comm = ctx.storage.intern_bytes(comm);

    if clone_flags & CLONE_THREAD == 0 {
        ctx.processes
            .start_new_process(new_tid, Some(comm), ThreadNamePriority::Ftrace);
        return Ok(());
    }

    let source_utid = ctx.processes.get_or_create_thread(source_pid);
    let new_utid = ctx.processes.start_new_thread(new_tid);
    ctx.processes
        .update_thread_name(new_utid, comm, ThreadNamePriority::Ftrace);
    ctx.processes.associate_threads(source_utid, new_utid);
    Ok(())
}

pub(crate) fn task_rename(ctx: &mut Context, data: &[u8]) -> Result<(), ReadError> {
    let mut tid = 0i64;
    let mut newcomm: &[u8] = b"";
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => tid = v.as_i64().unwrap_or(0),
            (3, v) => newcomm = v.as_str_bytes().unwrap_or(b""),
            _ => {}
        }
    }
    let comm = ctx.storage.intern_bytes(newcomm);
    let utid = ctx.processes.get_or_create_thread(tid);
    ctx.processes
        .update_thread_name_and_process(utid, comm, ThreadNamePriority::Ftrace);
    Ok(())
}

/// The event carries both the sender and the destination; the instant lands
/// on the destination thread.
pub(crate) fn signal_generate(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut dest_pid = 0i64;
    let mut sig = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (3, v) => dest_pid = v.as_i64().unwrap_or(0),
            (4, v) => sig = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let utid = ctx.processes.get_or_create_thread(dest_pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.signal_generate;
    let args = [(ctx.strings.arg_signal, ArgValue::Int(sig))];
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &args);
    Ok(())
}

pub(crate) fn signal_deliver(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut sig = 0i64;
    for field in FieldIter::new(data) {
        if let (3, v) = field? {
            sig = v.as_i64().unwrap_or(0);
        }
    }
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.strings.signal_deliver;
    let args = [(ctx.strings.arg_signal, ArgValue::Int(sig))];
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &args);
    Ok(())
}

pub(crate) fn scm_call_start(
    ctx: &mut Context,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut arg0 = 0u64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            arg0 = v.as_u64().unwrap_or(0);
        }
    }
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    let name = ctx.storage.intern(&format!("scm id={arg0:#x}"));
    ctx.slices
        .begin(&mut ctx.storage, ts, track, None, Some(name), &[]);
    Ok(())
}

pub(crate) fn scm_call_end(ctx: &mut Context, ts: i64, pid: i64) -> Result<(), ReadError> {
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    Ok(())
}

pub(crate) fn kprobe(ctx: &mut Context, ts: i64, pid: i64, data: &[u8]) -> Result<(), ReadError> {
    const KPROBE_TYPE_BEGIN: u64 = 1;
    const KPROBE_TYPE_END: u64 = 2;
    const KPROBE_TYPE_INSTANT: u64 = 3;

    let mut name: &[u8] = b"";
    let mut probe_type = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => name = v.as_str_bytes().unwrap_or(b""),
            (2, v) => probe_type = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let name = ctx.storage.intern_bytes(name);
    let utid = ctx.processes.get_or_create_thread(pid);
    let track = ctx.tracks.intern_thread(&mut ctx.storage, utid);
    match probe_type {
        KPROBE_TYPE_BEGIN => {
            ctx.slices
                .begin(&mut ctx.storage, ts, track, None, Some(name), &[]);
        }
        KPROBE_TYPE_END => {
            ctx.slices
                .end(&mut ctx.storage, ts, track, None, Some(name), &[]);
        }
        KPROBE_TYPE_INSTANT => {
            ctx.slices
                .scoped(&mut ctx.storage, ts, 0, track, None, Some(name), &[]);
        }
        _ => {}
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

    #[test]
    fn fork_starts_a_process_and_clone_starts_a_thread() {
        let mut ctx = ctx();

        let mut fork = MessageBuilder::new();
        fork.int(1, 100).string(2, "worker").varint(3, 0);
        task_newtask(&mut ctx, 1, &fork.build()).unwrap();
        let main = ctx.processes.get_thread_or_null(100).unwrap();
        assert!(ctx.processes.is_main_thread(main));

        let mut clone = MessageBuilder::new();
        clone.int(1, 101).string(2, "worker-io").varint(3, CLONE_THREAD);
        task_newtask(&mut ctx, 100, &clone.build()).unwrap();
        let child = ctx.processes.get_thread_or_null(101).unwrap();
        assert!(!ctx.processes.is_main_thread(child));
        assert_eq!(ctx.processes.thread(child).upid, ctx.processes.thread(main).upid);
    }

    #[test]
    fn rename_of_a_main_thread_renames_the_process() {
        let mut ctx = ctx();
        let mut fork = MessageBuilder::new();
        fork.int(1, 200).string(2, "zygote").varint(3, 0);
        task_newtask(&mut ctx, 1, &fork.build()).unwrap();

        let mut rename = MessageBuilder::new();
        rename.int(1, 200).string(2, "zygote").string(3, "app_process");
        task_rename(&mut ctx, &rename.build()).unwrap();

        let utid = ctx.processes.get_thread_or_null(200).unwrap();
        let upid = ctx.processes.thread(utid).upid.unwrap();
        let name = ctx.processes.process(upid).name.unwrap();
        assert_eq!(ctx.storage.string(name), "app_process");
    }

    #[test]
    fn signal_generate_lands_on_the_destination_thread() {
        let mut ctx = ctx();
        let mut sig = MessageBuilder::new();
        sig.int(1, 0).string(2, "sender").int(3, 55).int(4, 9);
        signal_generate(&mut ctx, 30, &sig.build()).unwrap();

        let dest = ctx.processes.get_thread_or_null(55).unwrap();
        let dest_track = ctx.tracks.intern_thread(&mut ctx.storage, dest);
        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "signal_generate");
        assert_eq!(slice.dur, 0);
        assert_eq!(slice.track, dest_track);
    }

    #[test]
    fn kprobe_pairs_close_on_the_thread_track() {
        let mut ctx = ctx();
        let mut begin = MessageBuilder::new();
        begin.string(1, "tcp_sendmsg").varint(2, 1);
        kprobe(&mut ctx, 100, 7, &begin.build()).unwrap();
        let mut end = MessageBuilder::new();
        end.string(1, "tcp_sendmsg").varint(2, 2);
        kprobe(&mut ctx, 180, 7, &end.build()).unwrap();

        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "tcp_sendmsg");
        assert_eq!(slice.dur, 80);
    }

    #[test]
    fn waking_instant_renames_the_wakee() {
        let mut ctx = ctx();
        let mut msg = MessageBuilder::new();
        msg.string(1, "binder:123_4").int(2, 321).int(3, 120).int(4, 2);
        sched_waking(&mut ctx, 5, 99, &msg.build()).unwrap();

        let wakee = ctx.processes.get_thread_or_null(321).unwrap();
        assert_eq!(
            ctx.processes.thread_name(&ctx.storage, wakee).as_deref(),
            Some("binder:123_4")
        );
        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "sched_waking");
    }
}
