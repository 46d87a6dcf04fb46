//! Network events. Per-device throughput counters, TCP socket state
//! machines on async stream tracks and per-cpu GRO slices.

use std::collections::HashMap;

use crate::classification::TrackClassification;
use crate::context::Context;
use crate::error::ReadError;
use crate::stats::Stat;
use crate::storage::{ArgValue, StringId, TrackId};
use crate::wire::FieldIter;

const IPPROTO_TCP: u64 = 6;
const AF_INET: u64 = 2;
const AF_INET6: u64 = 10;

const ETH_P_IP: u64 = 0x0800;
const ETH_P_IPV6: u64 = 0x86dd;

/// Kernel TCP states, indexed by the wire value. A state at or past the end
/// of this table is malformed.
const TCP_STATE_NAMES: [&str; 13] = [
    "[NULL]",
    "TCP_ESTABLISHED",
    "TCP_SYN_SENT",
    "TCP_SYN_RECV",
    "TCP_FIN_WAIT1",
    "TCP_FIN_WAIT2",
    "TCP_TIME_WAIT",
    "TCP_CLOSE",
    "TCP_CLOSE_WAIT",
    "TCP_LAST_ACK",
    "TCP_LISTEN",
    "TCP_CLOSING",
    "TCP_NEW_SYN_RECV",
];
const TCP_ESTABLISHED: usize = 1;
const TCP_SYN_SENT: usize = 2;

/// Cross-event bookkeeping for the network handlers.
#[derive(Debug, Default)]
pub(crate) struct NetState {
    /// Cumulative per-device byte totals, keyed by counter name.
    received_bytes: HashMap<StringId, u64>,
    transmitted_bytes: HashMap<StringId, u64>,
    /// Socket address to stream number, numbered in first-seen order.
    streams: HashMap<u64, u32>,
    next_stream: u32,
    dropped_skbs: u64,
}

impl NetState {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn netif_receive_skb(
    ctx: &mut Context,
    net: &mut NetState,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut name: &[u8] = b"";
    let mut len = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => name = v.as_str_bytes().unwrap_or(b""),
            (3, v) => len = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let counter_name = ctx
        .storage
        .intern(&format!("{} Received KB", String::from_utf8_lossy(name)));
    let total = net.received_bytes.entry(counter_name).or_insert(0);
    *total += len;
    let kilobytes = *total / 1024;
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, counter_name);
    let args = [
        (ctx.strings.arg_cpu, ArgValue::Uint(cpu as u64)),
        (ctx.strings.arg_len, ArgValue::Uint(len)),
    ];
    ctx.storage
        .push_counter_with_args(ts, track, kilobytes as f64, &args);
    Ok(())
}

pub(crate) fn net_dev_xmit(
    ctx: &mut Context,
    net: &mut NetState,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut name: &[u8] = b"";
    let mut len = 0u64;
    let mut rc = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => name = v.as_str_bytes().unwrap_or(b""),
            (3, v) => len = v.as_u64().unwrap_or(0),
            (4, v) => rc = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    // Only packets the driver accepted count towards throughput.
    if rc != 0 {
        return Ok(());
    }
    let counter_name = ctx
        .storage
        .intern(&format!("{} Transmitted KB", String::from_utf8_lossy(name)));
    let total = net.transmitted_bytes.entry(counter_name).or_insert(0);
    *total += len;
    let kilobytes = *total / 1024;
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, counter_name);
    let args = [
        (ctx.strings.arg_cpu, ArgValue::Uint(cpu as u64)),
        (ctx.strings.arg_len, ArgValue::Uint(len)),
    ];
    ctx.storage
        .push_counter_with_args(ts, track, kilobytes as f64, &args);
    Ok(())
}

pub(crate) fn inet_sock_set_state(
    ctx: &mut Context,
    net: &mut NetState,
    ts: i64,
    pid: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut dport = 0u64;
    let mut family = 0u64;
    let mut newstate = 0i64;
    let mut oldstate = 0i64;
    let mut protocol = 0u64;
    let mut skaddr = 0u64;
    let mut sport = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (2, v) => dport = v.as_u64().unwrap_or(0),
            (3, v) => family = v.as_u64().unwrap_or(0),
            (4, v) => newstate = v.as_i64().unwrap_or(0),
            (5, v) => oldstate = v.as_i64().unwrap_or(0),
            (6, v) => protocol = v.as_u64().unwrap_or(0),
            (8, v) => skaddr = v.as_u64().unwrap_or(0),
            (9, v) => sport = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let states = 0..TCP_STATE_NAMES.len() as i64;
    let supported = protocol == IPPROTO_TCP
        && (family == AF_INET || family == AF_INET6)
        && states.contains(&newstate)
        && states.contains(&oldstate);
    if !supported {
        tracing::debug!(protocol, family, oldstate, newstate, "skipping socket state change");
        ctx.storage.increment_stat(Stat::INET_SOCK_STATE_UNSUPPORTED);
        return Ok(());
    }
    let newstate = newstate as usize;

    let (stream, new_stream) = match net.streams.get(&skaddr) {
        Some(&stream) => (stream, false),
        None => {
            net.next_stream += 1;
            net.streams.insert(skaddr, net.next_stream);
            (net.next_stream, true)
        }
    };
    let slice_name = match newstate {
        TCP_SYN_SENT => format!("{}(pid={pid})", TCP_STATE_NAMES[newstate]),
        TCP_ESTABLISHED => format!(
            "{}(sport={sport},dport={dport})",
            TCP_STATE_NAMES[newstate]
        ),
        _ => TCP_STATE_NAMES[newstate].to_owned(),
    };
    let slice_name = ctx.storage.intern(&slice_name);
    let set_name = ctx.storage.intern(&format!("TCP stream#{stream}"));
    let set = ctx.track_sets.intern_global(set_name);
    let cookie = skaddr as i64;
    // Every transition closes the previous state's slice on the stream.
    if !new_stream {
        let track = ctx
            .track_sets
            .end(&mut ctx.tracks, &mut ctx.storage, set, cookie);
        ctx.slices.end(&mut ctx.storage, ts, track, None, None, &[]);
    }
    let track = ctx
        .track_sets
        .begin(&mut ctx.tracks, &mut ctx.storage, set, cookie);
    let category = ctx.strings.cat_tcp_state;
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

pub(crate) fn tcp_retransmit_skb(ctx: &mut Context, ts: i64, data: &[u8]) -> Result<(), ReadError> {
    let mut sport = 0u64;
    let mut dport = 0u64;
    for field in FieldIter::new(data) {
        match field? {
            (4, v) => sport = v.as_u64().unwrap_or(0),
            (5, v) => dport = v.as_u64().unwrap_or(0),
            _ => {}
        }
    }
    let set = ctx.track_sets.intern_global(ctx.strings.tcp_retransmit);
    let track = ctx
        .track_sets
        .scoped(&mut ctx.tracks, &mut ctx.storage, set, 0);
    let name = ctx.storage.intern(&format!("sport={sport},dport={dport}"));
    let category = ctx.strings.cat_tcp_event;
    ctx.slices
        .scoped(&mut ctx.storage, ts, 0, track, Some(category), Some(name), &[]);
    Ok(())
}

pub(crate) fn napi_gro_receive_entry(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut name: &[u8] = b"";
    let mut len = 0i64;
    for field in FieldIter::new(data) {
        match field? {
            (1, v) => name = v.as_str_bytes().unwrap_or(b""),
            (2, v) => len = v.as_i64().unwrap_or(0),
            _ => {}
        }
    }
    let slice_name = ctx.storage.intern_bytes(name);
    let track = napi_gro_cpu_track(ctx, cpu);
    let category = ctx.strings.cat_napi_gro;
    let args = [(ctx.strings.arg_len, ArgValue::Int(len))];
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

pub(crate) fn napi_gro_receive_exit(
    ctx: &mut Context,
    ts: i64,
    cpu: u32,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut ret = 0i64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            ret = v.as_i64().unwrap_or(0);
        }
    }
    let track = napi_gro_cpu_track(ctx, cpu);
    let category = ctx.strings.cat_napi_gro;
    let args = [(ctx.strings.arg_ret, ArgValue::Int(ret))];
    ctx.slices
        .end(&mut ctx.storage, ts, track, Some(category), None, &args);
    Ok(())
}

fn napi_gro_cpu_track(ctx: &mut Context, cpu: u32) -> TrackId {
    let name = ctx.storage.intern(&format!("Napi Gro Cpu {cpu}"));
    ctx.tracks.intern_cpu(
        &mut ctx.storage,
        TrackClassification::NapiGroCpu,
        cpu,
        Some(name),
    )
}

pub(crate) fn kfree_skb(
    ctx: &mut Context,
    net: &mut NetState,
    ts: i64,
    data: &[u8],
) -> Result<(), ReadError> {
    let mut protocol = 0u64;
    for field in FieldIter::new(data) {
        if let (1, v) = field? {
            protocol = v.as_u64().unwrap_or(0);
        }
    }
    let label = match protocol {
        ETH_P_IP => "IP",
        ETH_P_IPV6 => "IPV6",
        _ => return Ok(()),
    };
    net.dropped_skbs += 1;
    let track = ctx
        .tracks
        .intern_legacy_global(&mut ctx.storage, ctx.strings.kfree_skb);
    let label = ctx.storage.intern(label);
    let args = [(ctx.strings.arg_protocol, ArgValue::Str(label))];
    ctx.storage
        .push_counter_with_args(ts, track, net.dropped_skbs as f64, &args);
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
    fn received_bytes_accumulate_per_device() {
        let mut ctx = ctx();
        let mut net = NetState::new();
        let mut event = MessageBuilder::new();
        event.string(1, "wlan0").varint(3, 600);
        netif_receive_skb(&mut ctx, &mut net, 10, 0, &event.build()).unwrap();
        netif_receive_skb(&mut ctx, &mut net, 20, 1, &event.build()).unwrap();

        let counters = ctx.storage.counters();
        assert_eq!(counters[0].value, 0.0);
        assert_eq!(counters[1].value, 1.0);
        let track = ctx.storage.track(counters[0].track);
        assert_eq!(
            ctx.storage.string(track.name.unwrap()),
            "wlan0 Received KB"
        );
    }

    #[test]
    fn rejected_xmit_is_not_counted() {
        let mut ctx = ctx();
        let mut net = NetState::new();
        let mut event = MessageBuilder::new();
        event.string(1, "rmnet0").varint(3, 2048).int(4, 1);
        net_dev_xmit(&mut ctx, &mut net, 10, 0, &event.build()).unwrap();
        assert!(ctx.storage.counters().is_empty());
    }

    #[test]
    fn tcp_transitions_chain_on_one_stream_track() {
        let mut ctx = ctx();
        let mut net = NetState::new();
        let mut syn = MessageBuilder::new();
        syn.varint(3, AF_INET)
            .int(4, TCP_SYN_SENT as i64)
            .int(5, 7)
            .varint(6, IPPROTO_TCP)
            .varint(8, 0xdead)
            .varint(9, 3040);
        inet_sock_set_state(&mut ctx, &mut net, 100, 42, &syn.build()).unwrap();
        let mut established = MessageBuilder::new();
        established
            .varint(2, 443)
            .varint(3, AF_INET)
            .int(4, TCP_ESTABLISHED as i64)
            .int(5, TCP_SYN_SENT as i64)
            .varint(6, IPPROTO_TCP)
            .varint(8, 0xdead)
            .varint(9, 3040);
        inet_sock_set_state(&mut ctx, &mut net, 250, 42, &established.build()).unwrap();

        let slices = ctx.storage.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(
            ctx.storage.string(slices[0].name.unwrap()),
            "TCP_SYN_SENT(pid=42)"
        );
        assert_eq!(slices[0].dur, 150);
        assert_eq!(
            ctx.storage.string(slices[1].name.unwrap()),
            "TCP_ESTABLISHED(sport=3040,dport=443)"
        );
        assert_eq!(slices[0].track, slices[1].track);
        assert_eq!(
            ctx.storage.string(ctx.storage.track(slices[0].track).name.unwrap()),
            "TCP stream#1"
        );
        assert_eq!(ctx.storage.stats.get(Stat::SLICE_END_WITHOUT_BEGIN), 0);
    }

    #[test]
    fn non_tcp_state_changes_are_counted_and_skipped() {
        let mut ctx = ctx();
        let mut net = NetState::new();
        let mut event = MessageBuilder::new();
        event.varint(3, AF_INET).int(4, 1).int(5, 2).varint(6, 17);
        inet_sock_set_state(&mut ctx, &mut net, 5, 42, &event.build()).unwrap();
        assert!(ctx.storage.slices().is_empty());
        assert_eq!(
            ctx.storage.stats.get(Stat::INET_SOCK_STATE_UNSUPPORTED),
            1
        );
    }

    #[test]
    fn only_ip_drops_feed_the_kfree_counter() {
        let mut ctx = ctx();
        let mut net = NetState::new();
        for protocol in [ETH_P_IP, 0x0003, ETH_P_IPV6] {
            let mut event = MessageBuilder::new();
            event.varint(1, protocol);
            kfree_skb(&mut ctx, &mut net, 10, &event.build()).unwrap();
        }
        let values: Vec<f64> = ctx.storage.counters().iter().map(|c| c.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn gro_slice_is_named_by_the_device() {
        let mut ctx = ctx();
        let mut entry = MessageBuilder::new();
        entry.string(1, "eth0").int(2, 1500);
        napi_gro_receive_entry(&mut ctx, 10, 3, &entry.build()).unwrap();
        let mut exit = MessageBuilder::new();
        exit.int(1, 4);
        napi_gro_receive_exit(&mut ctx, 30, 3, &exit.build()).unwrap();

        let slice = &ctx.storage.slices()[0];
        assert_eq!(ctx.storage.string(slice.name.unwrap()), "eth0");
        assert_eq!(slice.dur, 20);
        let track = ctx.storage.track(slice.track);
        assert_eq!(ctx.storage.string(track.name.unwrap()), "Napi Gro Cpu 3");
    }
}
