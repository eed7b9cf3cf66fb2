//! Error types for synchronization primitives.

use snafu::Snafu;

use crate::types::ProcessId;

/// Misuse of a synchronization primitive.
///
/// These are programming errors in the protocol driving the primitive, not
/// contention. Contention is reported through [`crate::Acquire`].
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum SyncError {
    /// A process tried to wait on a semaphore it is already queued on.
    #[snafu(display("{pid} is already waiting on '{name}'"))]
    DuplicateWaiter {
        /// Primitive name.
        name: String,
        /// The process that was already queued.
        pid: ProcessId,
    },

    /// Released a primitive that nobody holds.
    #[snafu(display("release of '{name}' without a holder"))]
    ReleaseWithoutHolder {
        /// Primitive name.
        name: String,
    },
}
