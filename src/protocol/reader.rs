//! Reader protocol.
//!
//! Readers share the critical section with at most one other reader. The first
//! reader in locks writers out on behalf of the whole group and the last reader
//! out lets them back in; `read_count`, guarded by its own mutex, decides who is
//! first and last.

use rwsim_sync::ProcessId;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Transition;
use super::acquire;
use super::decrement;
use super::release;
use super::successor;
use crate::error::Result;
use crate::process::Role;
use crate::shared::PrimitiveRole;
use crate::shared::SharedState;
use crate::trace::EventKind;

/// Reader program counter. Discriminants are the instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderStep {
    /// 0: take a reader-admission slot.
    AcquireAdmission = 0,
    /// 1: lock `read_count`.
    LockReadCount = 1,
    /// 2: `read_count += 1`.
    IncrementReadCount = 2,
    /// 3: first reader takes writer exclusion; others skip.
    AcquireWriterExclusion = 3,
    /// 4: unlock `read_count`.
    UnlockReadCount = 4,
    /// 5: `active_readers += 1`, then check invariants.
    EnterCritical = 5,
    /// 6: read work.
    Read = 6,
    /// 7: `active_readers -= 1`.
    ExitCritical = 7,
    /// 8: lock `read_count` again.
    RelockReadCount = 8,
    /// 9: `read_count -= 1`.
    DecrementReadCount = 9,
    /// 10: last reader releases writer exclusion; others skip.
    ReleaseWriterExclusion = 10,
    /// 11: unlock `read_count`.
    UnlockReadCountAfterExit = 11,
    /// 12: give back the admission slot.
    ReleaseAdmission = 12,
    /// 13: terminal.
    Terminate = 13,
}

impl ReaderStep {
    /// Every instruction in program order.
    pub const ALL: [ReaderStep; 14] = [
        ReaderStep::AcquireAdmission,
        ReaderStep::LockReadCount,
        ReaderStep::IncrementReadCount,
        ReaderStep::AcquireWriterExclusion,
        ReaderStep::UnlockReadCount,
        ReaderStep::EnterCritical,
        ReaderStep::Read,
        ReaderStep::ExitCritical,
        ReaderStep::RelockReadCount,
        ReaderStep::DecrementReadCount,
        ReaderStep::ReleaseWriterExclusion,
        ReaderStep::UnlockReadCountAfterExit,
        ReaderStep::ReleaseAdmission,
        ReaderStep::Terminate,
    ];

    /// Instruction index.
    pub fn program_counter(self) -> u32 {
        self as u32
    }

    /// Instruction at index `pc`, if in range.
    pub fn from_program_counter(pc: u32) -> Option<Self> {
        Self::ALL.get(pc as usize).copied()
    }

    /// Following instruction; `None` after [`ReaderStep::Terminate`].
    pub fn next(self) -> Option<Self> {
        Self::from_program_counter(self.program_counter() + 1)
    }

    /// Whether a reader at this instruction holds an admission slot.
    pub fn holds_admission(self) -> bool {
        (1..=12).contains(&self.program_counter())
    }

    /// Whether a reader at this instruction is inside the critical section.
    pub fn in_critical_section(self) -> bool {
        matches!(self, ReaderStep::Read | ReaderStep::ExitCritical)
    }
}

/// Execute one reader instruction.
pub fn step(state: ReaderStep, pid: ProcessId, shared: &mut SharedState) -> Result<Transition<ReaderStep>> {
    let next = || successor(pid, Role::Reader, state.program_counter(), state.next());

    match state {
        ReaderStep::AcquireAdmission => acquire(shared, PrimitiveRole::Admission, pid, next()?),
        ReaderStep::LockReadCount | ReaderStep::RelockReadCount => {
            acquire(shared, PrimitiveRole::ReadCountMutex, pid, next()?)
        }
        ReaderStep::IncrementReadCount => {
            let counters = &mut shared.counters;
            counters.read_count = counters.read_count.saturating_add(1);
            Ok(Transition::advance(next()?).event(EventKind::ReadCountChanged {
                value: counters.read_count,
            }))
        }
        ReaderStep::AcquireWriterExclusion => {
            if shared.counters.read_count == 1 {
                acquire(shared, PrimitiveRole::WriterExclusion, pid, next()?)
            } else {
                Ok(Transition::advance(next()?))
            }
        }
        ReaderStep::UnlockReadCount | ReaderStep::UnlockReadCountAfterExit => {
            release(shared, PrimitiveRole::ReadCountMutex, next()?)
        }
        ReaderStep::EnterCritical => {
            shared.counters.active_readers = shared.counters.active_readers.saturating_add(1);
            debug!(%pid, active_readers = shared.counters.active_readers, "reader entered critical section");
            let mut transition = Transition::advance(next()?).event(EventKind::EnterCritical { role: Role::Reader });
            if let Some(violation) = shared.check() {
                transition = transition.event(EventKind::Violation { violation });
            }
            Ok(transition)
        }
        ReaderStep::Read => {
            debug!(%pid, "reading");
            Ok(Transition::advance(next()?).event(EventKind::Working { role: Role::Reader }))
        }
        ReaderStep::ExitCritical => {
            decrement(&mut shared.counters.active_readers, pid, "active_readers")?;
            Ok(Transition::advance(next()?).event(EventKind::ExitCritical { role: Role::Reader }))
        }
        ReaderStep::DecrementReadCount => {
            let value = decrement(&mut shared.counters.read_count, pid, "read_count")?;
            Ok(Transition::advance(next()?).event(EventKind::ReadCountChanged { value }))
        }
        ReaderStep::ReleaseWriterExclusion => {
            if shared.counters.read_count == 0 {
                release(shared, PrimitiveRole::WriterExclusion, next()?)
            } else {
                Ok(Transition::advance(next()?))
            }
        }
        ReaderStep::ReleaseAdmission => release(shared, PrimitiveRole::Admission, next()?),
        ReaderStep::Terminate => {
            debug!(%pid, "reader finished");
            Ok(Transition::finish())
        }
    }
}
