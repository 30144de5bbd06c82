//! Shared registry of live processes.
//!
//! The monitor is a cross-check independent of the per-thread stacks: every
//! dispatched invocation holds a [`MonitorSlot`] for as long as it runs, and the
//! slot releases its entry when dropped, whichever way the invocation ends.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    /// The body has returned; only cleanup remains.
    Finishing,
}

#[derive(Debug, Default)]
pub struct ProcessMonitor {
    live: Mutex<HashMap<Uuid, Liveness>>,
}

impl ProcessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashMap<Uuid, Liveness>> {
        // Entries stay consistent even if a holder panicked mid-update.
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a process as running. Returns `false` if it already was.
    pub fn register(&self, process_id: Uuid) -> bool {
        let fresh = self.live().insert(process_id, Liveness::Running).is_none();
        if !fresh {
            log::warn!("Process {} registered twice with the monitor", process_id);
        }
        fresh
    }

    /// Removes a process. Returns `false` if it was not registered.
    pub fn unregister(&self, process_id: Uuid) -> bool {
        self.live().remove(&process_id).is_some()
    }

    /// Registers `process_id` and returns a slot that unregisters it on drop.
    ///
    /// If the id is already registered, the existing entry belongs to its first
    /// holder: the returned slot leaves it alone.
    pub fn acquire(&self, process_id: Uuid) -> MonitorSlot<'_> {
        let owner = self.register(process_id);
        if !owner {
            log::error!(
                "Process {} is already live; the new slot will not release it",
                process_id
            );
        }
        MonitorSlot {
            monitor: self,
            process_id,
            owner,
        }
    }

    pub fn get_ids(&self) -> HashSet<Uuid> {
        self.live().keys().copied().collect()
    }

    pub fn liveness(&self, process_id: Uuid) -> Option<Liveness> {
        self.live().get(&process_id).copied()
    }

    pub fn is_alive(&self, process_id: Uuid) -> bool {
        self.liveness(process_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live().is_empty()
    }
}

/// A registration held for the duration of one invocation.
#[derive(Debug)]
pub struct MonitorSlot<'a> {
    monitor: &'a ProcessMonitor,
    process_id: Uuid,
    owner: bool,
}

impl MonitorSlot<'_> {
    pub fn process_id(&self) -> Uuid {
        self.process_id
    }

    pub fn mark_finishing(&self) {
        if !self.owner {
            return;
        }
        if let Some(state) = self.monitor.live().get_mut(&self.process_id) {
            *state = Liveness::Finishing;
        }
    }
}

impl Drop for MonitorSlot<'_> {
    fn drop(&mut self) {
        if self.owner && !self.monitor.unregister(self.process_id) {
            log::error!(
                "Process {} was already removed from the monitor",
                self.process_id
            );
        }
    }
}
