//! Error types for the simulator.
//!
//! Every variant is fatal. Synchronization violations are not errors: they
//! are reported through the trace and the simulation keeps running.

use rwsim_sync::ProcessId;
use rwsim_sync::SyncError;
use snafu::Snafu;

use crate::config::ConfigError;
use crate::process::Role;
use crate::process::Status;

/// Fatal simulation errors (protocol misuse and configuration failures).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SimulationError {
    /// A program counter outside the role's instruction range.
    #[snafu(display("{pid} ({role}) has out-of-range program counter {pc}"))]
    ProgramCounterOutOfRange {
        /// Offending process.
        pid: ProcessId,
        /// Its role.
        role: Role,
        /// The bad counter value.
        pc: u32,
    },

    /// A shared counter would go below zero.
    #[snafu(display("{pid} decremented '{counter}' below zero"))]
    CounterUnderflow {
        /// Process executing the decrement.
        pid: ProcessId,
        /// Counter name.
        counter: &'static str,
    },

    /// A primitive woke a process that was not parked.
    #[snafu(display("wake of {pid} which is {status}, not blocked"))]
    WakeTargetNotBlocked {
        /// The woken process.
        pid: ProcessId,
        /// Its actual status.
        status: Status,
    },

    /// A process id not present in the process table.
    #[snafu(display("unknown process {pid}"))]
    UnknownProcess {
        /// The missing id.
        pid: ProcessId,
    },

    /// A primitive rejected the operation.
    #[snafu(display("primitive misuse: {source}"))]
    Primitive {
        /// The underlying error.
        source: SyncError,
    },

    /// Configuration could not be loaded or is invalid.
    #[snafu(display("configuration error: {source}"))]
    Config {
        /// The underlying error.
        source: ConfigError,
    },
}

impl From<SyncError> for SimulationError {
    fn from(source: SyncError) -> Self {
        SimulationError::Primitive { source }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(source: ConfigError) -> Self {
        SimulationError::Config { source }
    }
}

/// Result alias for simulator operations.
pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
