//! Writer protocol.

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

/// Writer program counter. Discriminants are the instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterStep {
    /// 0: take writer exclusion.
    AcquireWriterExclusion = 0,
    /// 1: `active_writers += 1`, then check invariants.
    EnterCritical = 1,
    /// 2: write work.
    Write = 2,
    /// 3: `active_writers -= 1` and release writer exclusion.
    ExitCritical = 3,
    /// 4: terminal.
    Terminate = 4,
}

impl WriterStep {
    /// Every instruction in program order.
    pub const ALL: [WriterStep; 5] = [
        WriterStep::AcquireWriterExclusion,
        WriterStep::EnterCritical,
        WriterStep::Write,
        WriterStep::ExitCritical,
        WriterStep::Terminate,
    ];

    /// Instruction index.
    pub fn program_counter(self) -> u32 {
        self as u32
    }

    /// Instruction at index `pc`, if in range.
    pub fn from_program_counter(pc: u32) -> Option<Self> {
        Self::ALL.get(pc as usize).copied()
    }

    /// Following instruction; `None` after [`WriterStep::Terminate`].
    pub fn next(self) -> Option<Self> {
        Self::from_program_counter(self.program_counter() + 1)
    }

    /// Whether a writer at this instruction holds writer exclusion.
    pub fn holds_writer_exclusion(self) -> bool {
        matches!(self, WriterStep::EnterCritical | WriterStep::Write | WriterStep::ExitCritical)
    }

    /// Whether a writer at this instruction is inside the critical section.
    pub fn in_critical_section(self) -> bool {
        matches!(self, WriterStep::Write | WriterStep::ExitCritical)
    }
}

/// Execute one writer instruction.
pub fn step(state: WriterStep, pid: ProcessId, shared: &mut SharedState) -> Result<Transition<WriterStep>> {
    let next = || successor(pid, Role::Writer, state.program_counter(), state.next());

    match state {
        WriterStep::AcquireWriterExclusion => acquire(shared, PrimitiveRole::WriterExclusion, pid, next()?),
        WriterStep::EnterCritical => {
            shared.counters.active_writers = shared.counters.active_writers.saturating_add(1);
            debug!(%pid, active_writers = shared.counters.active_writers, "writer entered critical section");
            let mut transition = Transition::advance(next()?).event(EventKind::EnterCritical { role: Role::Writer });
            if let Some(violation) = shared.check() {
                transition = transition.event(EventKind::Violation { violation });
            }
            Ok(transition)
        }
        WriterStep::Write => {
            debug!(%pid, "writing");
            Ok(Transition::advance(next()?).event(EventKind::Working { role: Role::Writer }))
        }
        WriterStep::ExitCritical => {
            decrement(&mut shared.counters.active_writers, pid, "active_writers")?;
            Ok(release(shared, PrimitiveRole::WriterExclusion, next()?)?
                .event_first(EventKind::ExitCritical { role: Role::Writer }))
        }
        WriterStep::Terminate => {
            debug!(%pid, "writer finished");
            Ok(Transition::finish())
        }
    }
}
