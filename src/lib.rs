//! Deterministic simulator for the bounded readers-writers problem.
//!
//! A fixed set of reader and writer processes share one critical section.
//! Each process is a small state machine advanced one instruction at a time by
//! a seeded random scheduler, so every interleaving is reproducible from its
//! seed. The protocols coordinate through three primitives from
//! [`rwsim_sync`]:
//!
//! - reader admission (capacity 2) - bounds concurrent readers
//! - read-count mutex (capacity 1) - guards `read_count`
//! - writer exclusion (capacity 1) - one writer, or the reader group
//!
//! After every critical-section entry the [`checker`] verifies mutual
//! exclusion; violations land in the [`Trace`] and the run continues.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler --select--> Process --step--> protocol::{reader, writer}
//!     ^                                        |
//!     |                                        v
//!     +---- Transition { outcome, wake } <- SharedState (counters + primitives)
//! ```
//!
//! Protocol steps never touch a process control block. They return a tagged
//! [`protocol::Transition`] and the [`Scheduler`] applies it, including waking
//! a process whose semaphore wait a release satisfied.
//!
//! ## Example
//!
//! ```
//! use rwsim::{SimConfig, Simulation};
//!
//! let report = Simulation::new(SimConfig::named("doc").with_seed(42))?.run()?;
//! assert!(report.is_clean());
//! assert_eq!(report.metrics.finished, 6);
//! # Ok::<(), rwsim::SimulationError>(())
//! ```

pub mod checker;
pub mod config;
pub mod constants;
pub mod error;
pub mod process;
pub mod protocol;
pub mod scheduler;
pub mod shared;
pub mod simulation;
pub mod trace;

// ============================================================================
// Core types
// ============================================================================

pub use checker::InvariantLimits;
pub use checker::Violation;
pub use config::ConfigError;
pub use config::SimConfig;
pub use error::Result;
pub use error::SimulationError;
pub use process::Process;
pub use process::ProcessId;
pub use process::Role;
pub use process::Status;
pub use process::assign_roles;

// ============================================================================
// Protocol and shared state
// ============================================================================

pub use protocol::ProtocolState;
pub use protocol::ReaderStep;
pub use protocol::StepOutcome;
pub use protocol::WriterStep;
pub use shared::Counters;
pub use shared::PrimitiveRole;
pub use shared::SharedState;

// ============================================================================
// Scheduling and reporting
// ============================================================================

pub use scheduler::RandomSelector;
pub use scheduler::RunOutcome;
pub use scheduler::Scheduler;
pub use scheduler::ScriptedSelector;
pub use scheduler::Selector;
pub use scheduler::TickOutcome;
pub use simulation::BatchSummary;
pub use simulation::Simulation;
pub use simulation::SimulationMetrics;
pub use simulation::SimulationReport;
pub use simulation::run_batch;
pub use trace::EventKind;
pub use trace::Trace;
pub use trace::TraceEvent;

pub use rwsim_sync::PrimitiveKind;
