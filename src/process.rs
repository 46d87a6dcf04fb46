use std::collections::HashMap;

use crate::storage::{StringId, TraceStorage};

/// Unique thread id, stable within one ingested trace. Distinct from the
/// kernel tid, which the kernel recycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Utid(pub u32);

/// Unique process id, same idea as [`Utid`] but for processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Upid(pub u32);

/// Unique cpu id. Traces can interleave cpus from multiple machines, so raw
/// cpu numbers go through the same indirection as tids and pids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ucpu(pub u32);

/// Where a thread or process name came from. Higher priority sources
/// overwrite lower ones, never the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThreadNamePriority {
    Other,
    Ftrace,
    ProcessTree,
}

#[derive(Debug, Clone)]
pub struct ThreadRow {
    pub tid: i64,
    pub name: Option<StringId>,
    pub name_priority: ThreadNamePriority,
    pub upid: Option<Upid>,
}

#[derive(Debug, Clone)]
pub struct ProcessRow {
    pub pid: i64,
    pub name: Option<StringId>,
}

/// Maps kernel tids and pids onto trace-unique ids and tracks their names.
///
/// The kernel recycles tids, so a tid seen after its thread died must map to
/// a fresh [`Utid`]. We keep only the most recent thread per tid; events are
/// ingested in timestamp order so that is the right one to attribute to.
#[derive(Debug, Default)]
pub struct ProcessTracker {
    threads: Vec<ThreadRow>,
    processes: Vec<ProcessRow>,
    tids: HashMap<i64, Utid>,
    pids: HashMap<i64, Upid>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_thread(&mut self, tid: i64) -> Utid {
        if let Some(&utid) = self.tids.get(&tid) {
            return utid;
        }
        self.insert_thread(tid)
    }

    pub fn get_thread_or_null(&self, tid: i64) -> Option<Utid> {
        self.tids.get(&tid).copied()
    }

    /// Registers a newly spawned thread. Always allocates a fresh utid; the
    /// tid may be recycled from an exited thread.
    pub fn start_new_thread(&mut self, tid: i64) -> Utid {
        self.insert_thread(tid)
    }

    fn insert_thread(&mut self, tid: i64) -> Utid {
        let utid = Utid(self.threads.len() as u32);
        self.threads.push(ThreadRow {
            tid,
            name: None,
            name_priority: ThreadNamePriority::Other,
            upid: None,
        });
        self.tids.insert(tid, utid);
        utid
    }

    pub fn update_thread_name(
        &mut self,
        utid: Utid,
        name: StringId,
        priority: ThreadNamePriority,
    ) {
        let row = &mut self.threads[utid.0 as usize];
        if priority >= row.name_priority {
            row.name = Some(name);
            row.name_priority = priority;
        }
    }

    /// Like [`update_thread_name`](Self::update_thread_name), but if the
    /// thread is the main thread of its process the process name follows.
    pub fn update_thread_name_and_process(
        &mut self,
        utid: Utid,
        name: StringId,
        priority: ThreadNamePriority,
    ) {
        self.update_thread_name(utid, name, priority);
        let row = &self.threads[utid.0 as usize];
        if let Some(upid) = row.upid {
            let process = &mut self.processes[upid.0 as usize];
            if process.pid == row.tid {
                process.name = Some(name);
            }
        }
    }

    /// Registers a newly forked process and its main thread.
    pub fn start_new_process(
        &mut self,
        pid: i64,
        name: Option<StringId>,
        priority: ThreadNamePriority,
    ) -> Upid {
        let upid = Upid(self.processes.len() as u32);
        self.processes.push(ProcessRow { pid, name });
        self.pids.insert(pid, upid);
        let utid = self.insert_thread(pid);
        let row = &mut self.threads[utid.0 as usize];
        row.upid = Some(upid);
        if let Some(name) = name {
            row.name = Some(name);
            row.name_priority = priority;
        }
        upid
    }

    pub fn get_or_create_process(&mut self, pid: i64) -> Upid {
        if let Some(&upid) = self.pids.get(&pid) {
            return upid;
        }
        let upid = Upid(self.processes.len() as u32);
        self.processes.push(ProcessRow { pid, name: None });
        self.pids.insert(pid, upid);
        upid
    }

    /// Binds a thread to a process, creating either as needed.
    pub fn update_thread(&mut self, tid: i64, pid: i64) -> Utid {
        let utid = self.get_or_create_thread(tid);
        let upid = self.get_or_create_process(pid);
        self.threads[utid.0 as usize].upid = Some(upid);
        utid
    }

    /// Marks two tids as belonging to the same process. If either side
    /// already has a process the other inherits it; if neither does, nothing
    /// is recorded yet.
    pub fn associate_threads(&mut self, a: Utid, b: Utid) {
        let upid_a = self.threads[a.0 as usize].upid;
        let upid_b = self.threads[b.0 as usize].upid;
        match (upid_a, upid_b) {
            (Some(upid), None) => self.threads[b.0 as usize].upid = Some(upid),
            (None, Some(upid)) => self.threads[a.0 as usize].upid = Some(upid),
            _ => {}
        }
    }

    pub fn is_main_thread(&self, utid: Utid) -> bool {
        let row = &self.threads[utid.0 as usize];
        match row.upid {
            Some(upid) => self.processes[upid.0 as usize].pid == row.tid,
            None => false,
        }
    }

    pub fn thread(&self, utid: Utid) -> &ThreadRow {
        &self.threads[utid.0 as usize]
    }

    pub fn process(&self, upid: Upid) -> &ProcessRow {
        &self.processes[upid.0 as usize]
    }

    pub fn thread_name(&self, storage: &TraceStorage, utid: Utid) -> Option<String> {
        self.threads[utid.0 as usize]
            .name
            .map(|id| storage.string(id).to_owned())
    }
}

/// Maps raw cpu numbers onto trace-unique cpu ids.
#[derive(Debug, Default)]
pub struct CpuTracker {
    cpus: HashMap<u32, Ucpu>,
    next: u32,
}

impl CpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_cpu(&mut self, cpu: u32) -> Ucpu {
        if let Some(&ucpu) = self.cpus.get(&cpu) {
            return ucpu;
        }
        let ucpu = Ucpu(self.next);
        self.next += 1;
        self.cpus.insert(cpu, ucpu);
        ucpu
    }
}

#[cfg(test)]
mod test {
    use super::{CpuTracker, ProcessTracker, ThreadNamePriority};
    use crate::storage::TraceStorage;

    #[test]
    fn recycled_tid_gets_fresh_utid() {
        let mut tracker = ProcessTracker::new();
        let first = tracker.get_or_create_thread(42);
        let second = tracker.start_new_thread(42);
        assert_ne!(first, second);
        assert_eq!(tracker.get_thread_or_null(42), Some(second));
    }

    #[test]
    fn lower_priority_name_does_not_overwrite() {
        let mut storage = TraceStorage::new();
        let mut tracker = ProcessTracker::new();
        let utid = tracker.get_or_create_thread(7);
        let fancy = storage.intern("surfaceflinger");
        let plain = storage.intern("<...>");
        tracker.update_thread_name(utid, fancy, ThreadNamePriority::ProcessTree);
        tracker.update_thread_name(utid, plain, ThreadNamePriority::Ftrace);
        assert_eq!(tracker.thread(utid).name, Some(fancy));
        tracker.update_thread_name(utid, plain, ThreadNamePriority::ProcessTree);
        assert_eq!(tracker.thread(utid).name, Some(plain));
    }

    #[test]
    fn main_thread_rename_renames_process() {
        let mut storage = TraceStorage::new();
        let mut tracker = ProcessTracker::new();
        let old = storage.intern("zygote");
        let new = storage.intern("com.example.app");
        let upid = tracker.start_new_process(100, Some(old), ThreadNamePriority::Ftrace);
        let utid = tracker.get_thread_or_null(100).unwrap();
        assert!(tracker.is_main_thread(utid));
        tracker.update_thread_name_and_process(utid, new, ThreadNamePriority::Ftrace);
        assert_eq!(tracker.process(upid).name, Some(new));
    }

    #[test]
    fn association_transfers_known_process() {
        let mut tracker = ProcessTracker::new();
        let upid = tracker.start_new_process(10, None, ThreadNamePriority::Other);
        let main = tracker.get_thread_or_null(10).unwrap();
        let worker = tracker.get_or_create_thread(11);
        assert_eq!(tracker.thread(worker).upid, None);
        tracker.associate_threads(main, worker);
        assert_eq!(tracker.thread(worker).upid, Some(upid));
    }

    #[test]
    fn cpu_ids_are_dense() {
        let mut cpus = CpuTracker::new();
        let a = cpus.get_or_create_cpu(5);
        let b = cpus.get_or_create_cpu(0);
        assert_eq!(cpus.get_or_create_cpu(5), a);
        assert_ne!(a, b);
    }
}
