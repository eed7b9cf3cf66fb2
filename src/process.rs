//! Process control blocks.
//!
//! A [`Process`] is pure data: identity, current protocol state (the program
//! counter) and lifecycle status. The scheduler owns the table and is the only
//! thing that mutates it, by applying the tagged results of protocol steps.

use serde::Deserialize;
use serde::Serialize;

pub use rwsim_sync::ProcessId;

use crate::error::Result;
use crate::error::SimulationError;
use crate::protocol::ProtocolState;
use crate::protocol::StepOutcome;

/// Which protocol a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Shared access; up to the admission capacity at once.
    Reader,
    /// Exclusive access.
    Writer,
}

impl Role {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Writer => "writer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status.
///
/// `Finished` is terminal. `Blocked` only ever means "parked on a semaphore
/// wait queue"; it is never used to hide finished processes from the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Eligible to execute its next instruction.
    Ready,
    /// Parked until a signal wakes it.
    Blocked,
    /// Executed its terminal instruction.
    Finished,
}

impl Status {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ready => "ready",
            Status::Blocked => "blocked",
            Status::Finished => "finished",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process control block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    id: ProcessId,
    state: ProtocolState,
    status: Status,
}

impl Process {
    /// Create a ready process at the first instruction of its role's protocol.
    pub fn new(id: ProcessId, role: Role) -> Self {
        Self {
            id,
            state: ProtocolState::initial(role),
            status: Status::Ready,
        }
    }

    /// Process identifier.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Protocol this process runs.
    pub fn role(&self) -> Role {
        self.state.role()
    }

    /// Next instruction to execute.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Integer index of the next instruction.
    pub fn program_counter(&self) -> u32 {
        self.state.program_counter()
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the scheduler may execute a step for this process.
    pub fn is_ready(&self) -> bool {
        self.status == Status::Ready
    }

    /// Whether the process has terminated.
    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }

    /// Apply the outcome of this process's own protocol step.
    pub(crate) fn apply(&mut self, outcome: StepOutcome<ProtocolState>) {
        debug_assert!(self.is_ready(), "PROCESS: only a ready process executes steps");
        match outcome {
            StepOutcome::Advance(next) => self.state = next,
            StepOutcome::Retry => {}
            StepOutcome::Block => self.status = Status::Blocked,
            StepOutcome::Finish => self.status = Status::Finished,
        }
    }

    /// Wake a parked process: it becomes ready and moves past the wait it was
    /// parked on, since the waker handed it the resource.
    pub(crate) fn wake(&mut self) -> Result<()> {
        if self.status != Status::Blocked {
            return Err(SimulationError::WakeTargetNotBlocked {
                pid: self.id,
                status: self.status,
            });
        }
        let next = self.state.next().ok_or_else(|| SimulationError::ProgramCounterOutOfRange {
            pid: self.id,
            role: self.role(),
            pc: self.program_counter().saturating_add(1),
        })?;
        self.state = next;
        self.status = Status::Ready;
        Ok(())
    }
}

/// Build the initial process table.
///
/// The first `count / 2` processes are readers, the rest writers.
pub fn assign_roles(count: u32) -> Vec<Process> {
    let readers = count / 2;
    (0..count)
        .map(|i| {
            let role = if i < readers { Role::Reader } else { Role::Writer };
            Process::new(ProcessId(i), role)
        })
        .collect()
}
