//! Blocking counting semaphore with an explicit FIFO wait queue.
//!
//! The count is signed. A negative count is the number of parked waiters, and
//! `count + waiters + holders` always equals the initial count.
//!
//! ## Wake contract
//!
//! [`Semaphore::signal`] never returns a permit to the pool while somebody is
//! queued: it dequeues the head and reports it. The woken process does not
//! re-run its wait; it is considered to have acquired the permit already, and
//! the owner of the process table must advance it past the wait instruction.
//! Handing the permit over inside `signal` means no other process can slip in
//! between the wake and the re-check.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::SyncError;
use crate::primitive::Acquire;
use crate::primitive::PrimitiveKind;
use crate::primitive::PrimitiveSnapshot;
use crate::primitive::Release;
use crate::primitive::SyncPrimitive;
use crate::types::ProcessId;
use crate::verified;
use crate::verified::SignalDecision;
use crate::verified::WaitDecision;

/// Counting semaphore with a FIFO wait queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Semaphore {
    name: String,
    initial: u32,
    count: i64,
    wait_queue: VecDeque<ProcessId>,
    /// Permits currently held. Tracked independently of `count` so the
    /// conservation invariant is an actual check.
    holders: u32,
}

impl Semaphore {
    /// Create a semaphore with `initial` permits.
    pub fn new(name: impl Into<String>, initial: u32) -> Self {
        Self {
            name: name.into(),
            initial,
            count: i64::from(initial),
            wait_queue: VecDeque::new(),
            holders: 0,
        }
    }

    /// Take a permit for `pid`.
    ///
    /// Returns `true` if the permit was granted. Returns `false` if `pid` was
    /// enqueued at the tail of the wait queue; the caller must mark it blocked
    /// and must not advance it.
    pub fn wait(&mut self, pid: ProcessId) -> Result<bool, SyncError> {
        if self.wait_queue.contains(&pid) {
            return Err(SyncError::DuplicateWaiter {
                name: self.name.clone(),
                pid,
            });
        }

        match verified::compute_wait(self.count) {
            WaitDecision::Acquire { new_count } => {
                self.count = new_count;
                self.holders = self.holders.saturating_add(1);
                debug!(name = %self.name, %pid, count = self.count, "semaphore acquired");
                Ok(true)
            }
            WaitDecision::Park { new_count } => {
                self.count = new_count;
                self.wait_queue.push_back(pid);
                debug!(name = %self.name, %pid, count = self.count, waiters = self.wait_queue.len(), "semaphore parked");
                Ok(false)
            }
        }
    }

    /// Return a permit.
    ///
    /// If a process is queued, the permit passes to the head of the queue and
    /// its id is returned (see the module docs for the wake contract).
    pub fn signal(&mut self) -> Result<Option<ProcessId>, SyncError> {
        if self.holders == 0 {
            return Err(SyncError::ReleaseWithoutHolder { name: self.name.clone() });
        }

        match verified::compute_signal(self.count, self.waiter_count()) {
            SignalDecision::WakeHead { new_count } => {
                self.count = new_count;
                // Holder count is unchanged: the permit changes hands.
                let woken = self.wait_queue.pop_front();
                debug!(name = %self.name, woken = ?woken, count = self.count, "semaphore handed off");
                Ok(woken)
            }
            SignalDecision::Release { new_count } => {
                self.count = new_count;
                self.holders -= 1;
                debug!(name = %self.name, count = self.count, "semaphore released");
                Ok(None)
            }
        }
    }

    /// Semaphore name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initial permit count.
    pub fn initial(&self) -> u32 {
        self.initial
    }

    /// Current (signed) count.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Permits currently held.
    pub fn holders(&self) -> u32 {
        self.holders
    }

    /// Queued processes in wake order.
    pub fn waiters(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.wait_queue.iter().copied()
    }

    /// Number of queued processes.
    pub fn waiter_count(&self) -> u32 {
        u32::try_from(self.wait_queue.len()).unwrap_or(u32::MAX)
    }

    /// Whether `count + waiters + holders == initial`.
    pub fn is_conserved(&self) -> bool {
        verified::is_conserved(self.initial, self.count, self.waiter_count(), self.holders)
    }
}

impl SyncPrimitive for Semaphore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Semaphore
    }

    fn try_acquire(&mut self, pid: ProcessId) -> Result<Acquire, SyncError> {
        Ok(if self.wait(pid)? { Acquire::Acquired } else { Acquire::Parked })
    }

    fn release(&mut self) -> Result<Release, SyncError> {
        Ok(match self.signal()? {
            Some(pid) => Release::Woke(pid),
            None => Release::Released,
        })
    }

    fn snapshot(&self) -> PrimitiveSnapshot {
        PrimitiveSnapshot {
            name: self.name.clone(),
            kind: PrimitiveKind::Semaphore,
            capacity: self.initial,
            available: self.count,
            waiters: self.waiters().collect(),
        }
    }

    fn is_at_initial(&self) -> bool {
        self.count == i64::from(self.initial) && self.wait_queue.is_empty() && self.holders == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_grants_until_exhausted() {
        let mut sem = Semaphore::new("admission", 2);
        assert!(sem.wait(ProcessId(0)).unwrap());
        assert!(sem.wait(ProcessId(1)).unwrap());
        assert!(!sem.wait(ProcessId(2)).unwrap());

        assert_eq!(sem.count(), -1);
        assert_eq!(sem.holders(), 2);
        assert_eq!(sem.waiters().collect::<Vec<_>>(), vec![ProcessId(2)]);
        assert!(sem.is_conserved());
    }

    #[test]
    fn test_signal_wakes_in_fifo_order() {
        let mut sem = Semaphore::new("writer_exclusion", 1);
        assert!(sem.wait(ProcessId(0)).unwrap());
        assert!(!sem.wait(ProcessId(1)).unwrap());
        assert!(!sem.wait(ProcessId(2)).unwrap());

        assert_eq!(sem.signal().unwrap(), Some(ProcessId(1)));
        assert_eq!(sem.signal().unwrap(), Some(ProcessId(2)));
        assert_eq!(sem.signal().unwrap(), None);
        assert!(sem.is_at_initial());
    }

    #[test]
    fn test_handoff_keeps_holder_count() {
        let mut sem = Semaphore::new("mutex", 1);
        sem.wait(ProcessId(0)).unwrap();
        sem.wait(ProcessId(1)).unwrap();
        sem.signal().unwrap();

        assert_eq!(sem.holders(), 1);
        assert_eq!(sem.count(), 0);
        assert!(sem.is_conserved());
    }

    #[test]
    fn test_duplicate_waiter_rejected() {
        let mut sem = Semaphore::new("mutex", 0);
        assert!(!sem.wait(ProcessId(4)).unwrap());
        let err = sem.wait(ProcessId(4)).unwrap_err();
        assert_eq!(
            err,
            SyncError::DuplicateWaiter {
                name: "mutex".into(),
                pid: ProcessId(4)
            }
        );
        // Rejected wait must not touch the count.
        assert_eq!(sem.count(), -1);
    }

    #[test]
    fn test_signal_without_holder_rejected() {
        let mut sem = Semaphore::new("mutex", 1);
        let err = sem.signal().unwrap_err();
        assert!(err.to_string().contains("without a holder"), "got: {err}");
        assert!(sem.is_at_initial());
    }

    #[test]
    fn test_zero_capacity_parks_everyone() {
        let mut sem = Semaphore::new("closed", 0);
        for i in 0..3 {
            assert!(!sem.wait(ProcessId(i)).unwrap());
        }
        assert_eq!(sem.count(), -3);
        assert!(sem.is_conserved());
    }

    #[test]
    fn test_conservation_across_interleaving() {
        let mut sem = Semaphore::new("admission", 2);
        let ops: [(bool, u32); 8] =
            [(true, 0), (true, 1), (true, 2), (true, 3), (false, 0), (false, 0), (false, 0), (false, 0)];
        for (is_wait, pid) in ops {
            if is_wait {
                sem.wait(ProcessId(pid)).unwrap();
            } else {
                sem.signal().unwrap();
            }
            assert!(sem.is_conserved(), "conservation broken: {sem:?}");
        }
        assert!(sem.is_at_initial());
    }

    #[test]
    fn test_trait_shape() {
        let mut sem = Semaphore::new("mutex", 1);
        assert_eq!(sem.try_acquire(ProcessId(0)).unwrap(), Acquire::Acquired);
        assert_eq!(sem.try_acquire(ProcessId(1)).unwrap(), Acquire::Parked);

        let snapshot = sem.snapshot();
        assert_eq!(snapshot.available, -1);
        assert_eq!(snapshot.waiters, vec![ProcessId(1)]);

        assert_eq!(sem.release().unwrap(), Release::Woke(ProcessId(1)));
        assert_eq!(sem.release().unwrap(), Release::Released);
    }
}
