//! Specialized per-event handlers, grouped by kernel subsystem.
//!
//! Every handler has the same shape: decode the event payload with a
//! [`FieldIter`](crate::wire::FieldIter) pass into plain locals, resolve the
//! destination track through the registries on the context, then append
//! slice or counter rows. Handlers never fail on missing fields; absent
//! fields keep their zero defaults, the usual proto3 contract. Only
//! structurally broken payloads error out.

pub(crate) mod cpu;
pub(crate) mod irq;
pub(crate) mod mem;
pub(crate) mod net;
pub(crate) mod power;
pub(crate) mod sched;
