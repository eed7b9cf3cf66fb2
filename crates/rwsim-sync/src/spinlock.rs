//! Busy-wait lock built on compare-and-swap.
//!
//! The lock is a bounded counter in a single cell. Capacity 1 is the classic
//! 0/1 flag. There is no wait queue: a failed acquire reports
//! [`Acquire::Busy`] and the caller retries the same instruction on its next
//! turn, spending a scheduler tick per failed attempt. No fairness guarantee.

use tracing::trace;

use crate::error::SyncError;
use crate::primitive::Acquire;
use crate::primitive::PrimitiveKind;
use crate::primitive::PrimitiveSnapshot;
use crate::primitive::Release;
use crate::primitive::SyncPrimitive;
use crate::types::ProcessId;
use crate::verified;

/// Atomically compare `cell` with `expected` and, if equal, store `new_value`.
///
/// Always returns the value read before the (possible) write. Callers treat
/// "returned value equals `expected`" as success.
///
/// # Example
///
/// ```
/// use rwsim_sync::compare_and_swap;
///
/// let mut cell = 0;
/// assert_eq!(compare_and_swap(&mut cell, 0, 1), 0); // success
/// assert_eq!(compare_and_swap(&mut cell, 0, 1), 1); // failure, unchanged
/// assert_eq!(cell, 1);
/// ```
#[inline]
pub fn compare_and_swap(cell: &mut u32, expected: u32, new_value: u32) -> u32 {
    let old = *cell;
    if old == expected {
        *cell = new_value;
    }
    old
}

/// Compare-and-swap spinlock over a bounded counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinLock {
    name: String,
    capacity: u32,
    cell: u32,
}

impl SpinLock {
    /// Create an unlocked spinlock admitting up to `capacity` holders.
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            cell: 0,
        }
    }

    /// Slots currently taken.
    pub fn held(&self) -> u32 {
        self.cell
    }

    /// Configured capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl SyncPrimitive for SpinLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Spinlock
    }

    fn try_acquire(&mut self, pid: ProcessId) -> Result<Acquire, SyncError> {
        let current = self.cell;
        let Some(next) = verified::next_acquire_value(current, self.capacity) else {
            trace!(name = %self.name, %pid, held = current, "spinlock busy");
            return Ok(Acquire::Busy);
        };

        if compare_and_swap(&mut self.cell, current, next) == current {
            trace!(name = %self.name, %pid, held = self.cell, "spinlock acquired");
            Ok(Acquire::Acquired)
        } else {
            Ok(Acquire::Busy)
        }
    }

    fn release(&mut self) -> Result<Release, SyncError> {
        let current = self.cell;
        let next = verified::next_release_value(current).ok_or_else(|| SyncError::ReleaseWithoutHolder {
            name: self.name.clone(),
        })?;

        if compare_and_swap(&mut self.cell, current, next) != current {
            // Single logical thread: the cell cannot move between read and CAS.
            return Err(SyncError::ReleaseWithoutHolder { name: self.name.clone() });
        }
        trace!(name = %self.name, held = self.cell, "spinlock released");
        Ok(Release::Released)
    }

    fn snapshot(&self) -> PrimitiveSnapshot {
        PrimitiveSnapshot {
            name: self.name.clone(),
            kind: PrimitiveKind::Spinlock,
            capacity: self.capacity,
            available: i64::from(self.capacity) - i64::from(self.cell),
            waiters: Vec::new(),
        }
    }

    fn is_at_initial(&self) -> bool {
        self.cell == 0
    }
}
