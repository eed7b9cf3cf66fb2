//! The scheduler.
//!
//! Owns the process table and the shared state. Each tick draws one index
//! from the full table; a ready process executes exactly one instruction, a
//! blocked or finished one is skipped. The scheduler is the only place a
//! step's tagged result is applied to a process control block, including the
//! wake of a process some other step's release handed a resource to.
//!
//! Selection is not fair: a process may be drawn repeatedly while others wait.
//! Runs are bounded by `max_ticks` so a starving or deadlocked run ends with a
//! distinct [`RunOutcome`] instead of looping forever.

mod selector;

use rwsim_sync::ProcessId;
use serde::Serialize;
pub use selector::RandomSelector;
pub use selector::ScriptedSelector;
pub use selector::Selector;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::constants::DEFAULT_MAX_TICKS;
use crate::error::Result;
use crate::error::SimulationError;
use crate::process::Process;
use crate::process::Status;
use crate::protocol;
use crate::protocol::StepOutcome;
use crate::shared::SharedState;
use crate::simulation::SimulationMetrics;
use crate::trace::EventKind;
use crate::trace::Trace;

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The drawn process executed one instruction.
    Stepped {
        /// Executing process.
        pid: ProcessId,
        /// False when the instruction spun or parked.
        progressed: bool,
    },
    /// The drawn process was not ready.
    Skipped {
        /// Drawn process.
        pid: ProcessId,
        /// Its status.
        status: Status,
    },
    /// The drawn process executed its terminal instruction.
    Finished {
        /// Finished process.
        pid: ProcessId,
    },
    /// The selector had no more draws. No tick was consumed.
    Exhausted,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every process finished.
    Completed {
        /// Ticks used.
        ticks: u64,
    },
    /// The tick bound was reached with processes still running.
    TickLimitExceeded {
        /// Ticks used.
        ticks: u64,
        /// Processes that had not finished.
        unfinished: Vec<ProcessId>,
    },
    /// No process is ready and not all are finished; nothing can change.
    Deadlocked {
        /// Ticks used.
        ticks: u64,
        /// Processes parked forever.
        blocked: Vec<ProcessId>,
    },
    /// A scripted selector ran out of draws.
    SelectorExhausted {
        /// Ticks used.
        ticks: u64,
    },
}

impl RunOutcome {
    /// Whether every process finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// Ticks the run used.
    pub fn ticks(&self) -> u64 {
        match self {
            RunOutcome::Completed { ticks }
            | RunOutcome::TickLimitExceeded { ticks, .. }
            | RunOutcome::Deadlocked { ticks, .. }
            | RunOutcome::SelectorExhausted { ticks } => *ticks,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Completed { ticks } => write!(f, "completed after {ticks} ticks"),
            RunOutcome::TickLimitExceeded { ticks, unfinished } => {
                write!(f, "tick limit {ticks} exceeded with {} unfinished", unfinished.len())
            }
            RunOutcome::Deadlocked { ticks, blocked } => {
                write!(f, "deadlocked after {ticks} ticks with {} blocked", blocked.len())
            }
            RunOutcome::SelectorExhausted { ticks } => write!(f, "selector exhausted after {ticks} ticks"),
        }
    }
}

/// Drives interleaved execution of the process table.
#[derive(Debug)]
pub struct Scheduler<S: Selector = RandomSelector> {
    processes: Vec<Process>,
    shared: SharedState,
    selector: S,
    trace: Trace,
    ticks: u64,
    max_ticks: u64,
    finished: usize,
    metrics: SimulationMetrics,
}

impl<S: Selector> Scheduler<S> {
    /// Create a scheduler. Process `i` in the table must carry `ProcessId(i)`.
    pub fn new(processes: Vec<Process>, shared: SharedState, selector: S) -> Self {
        debug_assert!(
            processes.iter().enumerate().all(|(i, p)| p.id().index() == i),
            "SCHEDULER: process ids must match table positions"
        );
        let finished = processes.iter().filter(|p| p.is_finished()).count();
        Self {
            processes,
            shared,
            selector,
            trace: Trace::new(),
            ticks: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            finished,
            metrics: SimulationMetrics::default(),
        }
    }

    /// Set the tick bound for [`schedule_until_complete`](Self::schedule_until_complete).
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Replace the trace (for example with [`Trace::violations_only`]).
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = trace;
        self
    }

    /// Process table.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Look up a process.
    pub fn process(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.get(pid.index())
    }

    /// Shared counters and primitives.
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Recorded events.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Counters gathered so far.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tick bound.
    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether every process has finished.
    pub fn all_finished(&self) -> bool {
        self.finished == self.processes.len()
    }

    /// Consume the scheduler, returning its trace and metrics.
    pub fn into_parts(self) -> (Trace, SimulationMetrics) {
        (self.trace, self.metrics)
    }

    /// Draw one process and, if it is ready, execute one instruction for it.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let Some(index) = self.selector.select(self.processes.len()) else {
            return Ok(TickOutcome::Exhausted);
        };
        self.ticks = self.ticks.saturating_add(1);
        self.metrics.ticks = self.ticks;
        let tick = self.ticks;

        let process = self.processes.get(index).ok_or(SimulationError::UnknownProcess {
            pid: ProcessId(index as u32),
        })?;
        let pid = process.id();
        if !process.is_ready() {
            self.metrics.idle_draws += 1;
            return Ok(TickOutcome::Skipped {
                pid,
                status: process.status(),
            });
        }

        let transition = protocol::step(process.state(), pid, &mut self.shared)?;
        self.metrics.steps += 1;
        for event in &transition.events {
            self.observe(tick, pid, *event);
        }

        let outcome = transition.outcome;
        self.processes[index].apply(outcome);

        if let Some(wake) = transition.wake {
            let target = self
                .processes
                .get_mut(wake.pid.index())
                .ok_or(SimulationError::UnknownProcess { pid: wake.pid })?;
            target.wake()?;
            self.observe(tick, wake.pid, EventKind::Woken {
                primitive: wake.primitive,
                by: pid,
            });
        }

        Ok(match outcome {
            StepOutcome::Finish => {
                self.finished += 1;
                TickOutcome::Finished { pid }
            }
            other => TickOutcome::Stepped {
                pid,
                progressed: other.made_progress(),
            },
        })
    }

    /// Tick until every process finishes, nothing can change, the selector
    /// runs out, or `max_ticks` is reached.
    pub fn schedule_until_complete(&mut self) -> Result<RunOutcome> {
        loop {
            if self.all_finished() {
                info!(ticks = self.ticks, processes = self.processes.len(), "all processes finished");
                return Ok(RunOutcome::Completed { ticks: self.ticks });
            }
            if !self.processes.iter().any(Process::is_ready) {
                let blocked = self.pids_with(|p| p.status() == Status::Blocked);
                warn!(ticks = self.ticks, blocked = blocked.len(), "deadlock: no process is ready");
                return Ok(RunOutcome::Deadlocked {
                    ticks: self.ticks,
                    blocked,
                });
            }
            if self.ticks >= self.max_ticks {
                let unfinished = self.pids_with(|p| !p.is_finished());
                warn!(
                    ticks = self.ticks,
                    unfinished = unfinished.len(),
                    "tick limit reached before all processes finished"
                );
                return Ok(RunOutcome::TickLimitExceeded {
                    ticks: self.ticks,
                    unfinished,
                });
            }
            if self.tick()? == TickOutcome::Exhausted {
                debug!(ticks = self.ticks, "selector exhausted");
                return Ok(RunOutcome::SelectorExhausted { ticks: self.ticks });
            }
        }
    }

    fn observe(&mut self, tick: u64, pid: ProcessId, event: EventKind) {
        match event {
            EventKind::Spin { .. } => self.metrics.spins += 1,
            EventKind::Blocked { .. } => self.metrics.blocks += 1,
            EventKind::Woken { .. } => self.metrics.wakes += 1,
            EventKind::Violation { .. } => self.metrics.violations += 1,
            EventKind::Finished => self.metrics.finished += 1,
            _ => {}
        }
        self.trace.record(tick, pid, event);
    }

    fn pids_with(&self, pred: impl Fn(&Process) -> bool) -> Vec<ProcessId> {
        self.processes.iter().filter(|p| pred(p)).map(Process::id).collect()
    }
}
