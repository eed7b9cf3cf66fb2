//! Synchronization primitives for the rwsim process simulator.
//!
//! Every primitive in this crate is a plain data structure driven by a single
//! logical thread. "Blocking" is expressed as a tagged result that the caller
//! (the scheduler) applies to its own process table, never as a real park.
//!
//! - [`Semaphore`] - counting semaphore with an explicit FIFO wait queue
//! - [`SpinLock`] - bounded counter acquired via [`compare_and_swap`]; callers busy-wait
//! - [`Unguarded`] - grants every request; models a missing lock
//!
//! All three implement the [`SyncPrimitive`] capability trait, so protocol code
//! never needs to know which one backs a given resource.
//!
//! ## Semaphore Example
//!
//! ```
//! use rwsim_sync::{Acquire, ProcessId, Release, Semaphore, SyncPrimitive};
//!
//! let mut sem = Semaphore::new("writer_exclusion", 1);
//! assert_eq!(sem.try_acquire(ProcessId(0)).unwrap(), Acquire::Acquired);
//! assert_eq!(sem.try_acquire(ProcessId(1)).unwrap(), Acquire::Parked);
//!
//! // Releasing hands the permit straight to the head of the queue.
//! assert_eq!(sem.release().unwrap(), Release::Woke(ProcessId(1)));
//! assert!(sem.is_conserved());
//! ```

mod error;
mod primitive;
mod semaphore;
mod spinlock;
mod types;
mod unguarded;
pub mod verified;

pub use error::SyncError;
pub use primitive::Acquire;
pub use primitive::Primitive;
pub use primitive::PrimitiveKind;
pub use primitive::PrimitiveSnapshot;
pub use primitive::Release;
pub use primitive::SyncPrimitive;
pub use semaphore::Semaphore;
pub use spinlock::SpinLock;
pub use spinlock::compare_and_swap;
pub use types::ProcessId;
pub use unguarded::Unguarded;
