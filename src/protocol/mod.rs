//! Reader and writer protocol state machines.
//!
//! Each role's program counter is an explicit enum ([`ReaderStep`],
//! [`WriterStep`]). A step is a transition function
//!
//! ```text
//! (state, pid, &mut SharedState) -> Transition { outcome, wake, events }
//! ```
//!
//! that executes exactly one instruction. The process's own state is never
//! mutated here: the scheduler applies [`StepOutcome`] to the PCB and
//! [`Wake`] to whichever process a release handed the resource to. Shared
//! counters and primitives are mutated in place; they are the state the
//! primitives protect.
//!
//! # Outcomes
//!
//! ```text
//! Advance(next)  instruction completed, move to `next`
//! Retry          spinlock busy: same instruction next turn, stay ready
//! Block          parked on a semaphore: same instruction, status -> blocked
//! Finish         terminal instruction executed, status -> finished
//! ```

pub mod reader;
pub mod writer;

pub use reader::ReaderStep;
use rwsim_sync::Acquire;
use rwsim_sync::ProcessId;
use rwsim_sync::Release;
use rwsim_sync::SyncPrimitive;
use serde::Deserialize;
use serde::Serialize;
pub use writer::WriterStep;

use crate::error::Result;
use crate::error::SimulationError;
use crate::process::Role;
use crate::shared::PrimitiveRole;
use crate::shared::SharedState;
use crate::trace::EventKind;

/// Program counter of a process, tagged by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "step", rename_all = "lowercase")]
pub enum ProtocolState {
    /// Reader protocol position.
    Reader(ReaderStep),
    /// Writer protocol position.
    Writer(WriterStep),
}

impl ProtocolState {
    /// First instruction of the role's protocol.
    pub fn initial(role: Role) -> Self {
        match role {
            Role::Reader => ProtocolState::Reader(ReaderStep::AcquireAdmission),
            Role::Writer => ProtocolState::Writer(WriterStep::AcquireWriterExclusion),
        }
    }

    /// Role this state belongs to.
    pub fn role(&self) -> Role {
        match self {
            ProtocolState::Reader(_) => Role::Reader,
            ProtocolState::Writer(_) => Role::Writer,
        }
    }

    /// Integer index of the instruction.
    pub fn program_counter(&self) -> u32 {
        match self {
            ProtocolState::Reader(step) => step.program_counter(),
            ProtocolState::Writer(step) => step.program_counter(),
        }
    }

    /// Following instruction, or `None` at the terminal instruction.
    pub fn next(&self) -> Option<Self> {
        match self {
            ProtocolState::Reader(step) => step.next().map(ProtocolState::Reader),
            ProtocolState::Writer(step) => step.next().map(ProtocolState::Writer),
        }
    }

    /// Whether this is the role's terminal instruction.
    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl std::fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolState::Reader(step) => write!(f, "reader:{}:{:?}", step.program_counter(), step),
            ProtocolState::Writer(step) => write!(f, "writer:{}:{:?}", step.program_counter(), step),
        }
    }
}

/// What the executing process does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome<S> {
    /// Instruction completed; continue at the given state.
    Advance(S),
    /// Resource busy; retry the same instruction next turn.
    Retry,
    /// Parked on a wait queue; retry only after being woken.
    Block,
    /// Terminal instruction executed.
    Finish,
}

impl<S> StepOutcome<S> {
    /// Map the state carried by `Advance`.
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> StepOutcome<T> {
        match self {
            StepOutcome::Advance(s) => StepOutcome::Advance(f(s)),
            StepOutcome::Retry => StepOutcome::Retry,
            StepOutcome::Block => StepOutcome::Block,
            StepOutcome::Finish => StepOutcome::Finish,
        }
    }

    /// Whether the instruction made progress.
    pub fn made_progress(&self) -> bool {
        matches!(self, StepOutcome::Advance(_) | StepOutcome::Finish)
    }
}

/// A process handed a resource by a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wake {
    /// The parked process to wake.
    pub pid: ProcessId,
    /// The primitive it was parked on.
    pub primitive: PrimitiveRole,
}

/// Tagged result of one protocol step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S> {
    /// Effect on the executing process.
    pub outcome: StepOutcome<S>,
    /// Process woken by a release in this step, if any.
    pub wake: Option<Wake>,
    /// Observable events, in execution order, attributed to the executing process.
    pub events: Vec<EventKind>,
}

impl<S> Transition<S> {
    /// Completed instruction moving to `next`.
    pub fn advance(next: S) -> Self {
        Self::with_outcome(StepOutcome::Advance(next))
    }

    /// Busy resource.
    pub fn retry() -> Self {
        Self::with_outcome(StepOutcome::Retry)
    }

    /// Parked on a wait queue.
    pub fn block() -> Self {
        Self::with_outcome(StepOutcome::Block)
    }

    /// Terminal instruction.
    pub fn finish() -> Self {
        Self::with_outcome(StepOutcome::Finish).event(EventKind::Finished)
    }

    fn with_outcome(outcome: StepOutcome<S>) -> Self {
        Self {
            outcome,
            wake: None,
            events: Vec::new(),
        }
    }

    /// Append an event.
    pub fn event(mut self, event: EventKind) -> Self {
        self.events.push(event);
        self
    }

    /// Prepend an event (for instructions that act before touching a primitive).
    pub fn event_first(mut self, event: EventKind) -> Self {
        self.events.insert(0, event);
        self
    }

    /// Map the state carried by the outcome.
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Transition<T> {
        Transition {
            outcome: self.outcome.map(f),
            wake: self.wake,
            events: self.events,
        }
    }
}

/// Execute one instruction for `pid` at `state`.
pub fn step(state: ProtocolState, pid: ProcessId, shared: &mut SharedState) -> Result<Transition<ProtocolState>> {
    match state {
        ProtocolState::Reader(s) => Ok(reader::step(s, pid, shared)?.map(ProtocolState::Reader)),
        ProtocolState::Writer(s) => Ok(writer::step(s, pid, shared)?.map(ProtocolState::Writer)),
    }
}

// ============================================================================
// Instruction helpers shared by both roles
// ============================================================================

/// Wait on `role`'s primitive; advance to `next` only if acquired.
pub(crate) fn acquire<S>(
    shared: &mut SharedState,
    role: PrimitiveRole,
    pid: ProcessId,
    next: S,
) -> Result<Transition<S>> {
    Ok(match shared.primitive_mut(role).try_acquire(pid)? {
        Acquire::Acquired => Transition::advance(next).event(EventKind::Acquired { primitive: role }),
        Acquire::Parked => Transition::block().event(EventKind::Blocked { primitive: role }),
        Acquire::Busy => Transition::retry().event(EventKind::Spin { primitive: role }),
    })
}

/// Signal `role`'s primitive and advance to `next`, carrying any wake.
pub(crate) fn release<S>(shared: &mut SharedState, role: PrimitiveRole, next: S) -> Result<Transition<S>> {
    let mut transition = Transition::advance(next).event(EventKind::Released { primitive: role });
    if let Release::Woke(pid) = shared.primitive_mut(role).release()? {
        transition.wake = Some(Wake { pid, primitive: role });
    }
    Ok(transition)
}

/// Decrement a shared counter, rejecting underflow.
pub(crate) fn decrement(value: &mut u32, pid: ProcessId, counter: &'static str) -> Result<u32> {
    *value = value.checked_sub(1).ok_or(SimulationError::CounterUnderflow { pid, counter })?;
    Ok(*value)
}

/// Follow-on instruction for a non-terminal step.
pub(crate) fn successor<S>(pid: ProcessId, role: Role, pc: u32, next: Option<S>) -> Result<S> {
    next.ok_or(SimulationError::ProgramCounterOutOfRange {
        pid,
        role,
        pc: pc.saturating_add(1),
    })
}

#[cfg(test)]
mod tests {
    use rwsim_sync::PrimitiveKind;

    use super::*;

    #[test]
    fn test_initial_states() {
        assert_eq!(ProtocolState::initial(Role::Reader).program_counter(), 0);
        assert_eq!(ProtocolState::initial(Role::Writer).program_counter(), 0);
        assert_eq!(ProtocolState::initial(Role::Reader).role(), Role::Reader);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProtocolState::Reader(ReaderStep::Terminate).is_terminal());
        assert!(ProtocolState::Writer(WriterStep::Terminate).is_terminal());
        assert!(!ProtocolState::Writer(WriterStep::Write).is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ProtocolState::Writer(WriterStep::Write).to_string(), "writer:2:Write");
    }

    #[test]
    fn test_step_dispatches_by_role() {
        let mut shared = SharedState::new(PrimitiveKind::Semaphore, 2, 1);
        let t = step(ProtocolState::initial(Role::Writer), ProcessId(1), &mut shared).unwrap();
        assert_eq!(t.outcome, StepOutcome::Advance(ProtocolState::Writer(WriterStep::EnterCritical)));

        let t = step(ProtocolState::initial(Role::Reader), ProcessId(0), &mut shared).unwrap();
        assert_eq!(t.outcome, StepOutcome::Advance(ProtocolState::Reader(ReaderStep::LockReadCount)));
    }

    #[test]
    fn test_decrement_underflow() {
        let mut v = 1;
        assert_eq!(decrement(&mut v, ProcessId(0), "read_count").unwrap(), 0);
        let err = decrement(&mut v, ProcessId(0), "read_count").unwrap_err();
        assert!(matches!(err, SimulationError::CounterUnderflow { counter: "read_count", .. }));
        assert_eq!(v, 0);
    }

    #[test]
    fn test_outcome_progress() {
        assert!(StepOutcome::Advance(()).made_progress());
        assert!(StepOutcome::<()>::Finish.made_progress());
        assert!(!StepOutcome::<()>::Retry.made_progress());
        assert!(!StepOutcome::<()>::Block.made_progress());
    }

    #[test]
    fn test_release_reports_wake() {
        let mut shared = SharedState::new(PrimitiveKind::Semaphore, 2, 1);
        acquire(&mut shared, PrimitiveRole::WriterExclusion, ProcessId(3), ()).unwrap();
        let parked = acquire(&mut shared, PrimitiveRole::WriterExclusion, ProcessId(4), ()).unwrap();
        assert_eq!(parked.outcome, StepOutcome::Block);

        let t = release(&mut shared, PrimitiveRole::WriterExclusion, ()).unwrap();
        assert_eq!(
            t.wake,
            Some(Wake {
                pid: ProcessId(4),
                primitive: PrimitiveRole::WriterExclusion
            })
        );
    }
}
