//! Pure decision functions behind the synchronization primitives.
//!
//! The primitives in this crate are thin shells that apply these decisions to
//! their own state. Keeping the arithmetic here makes it testable with explicit
//! inputs and outputs, and lets property tests run without building a
//! primitive at all.
//!
//! # Module Organization
//!
//! - [`semaphore`]: wait/signal counter decisions, conservation check
//! - [`spinlock`]: bounded-counter slot arithmetic
//!
//! # Tiger Style
//!
//! - Saturating arithmetic everywhere; no function panics
//! - Explicit integer types (i64 for semaphore counts, u32 for slots)

pub mod semaphore;
pub mod spinlock;

// ============================================================================
// Re-exports: Semaphore
// ============================================================================

pub use semaphore::SignalDecision;
pub use semaphore::WaitDecision;
pub use semaphore::compute_signal;
pub use semaphore::compute_wait;
pub use semaphore::is_conserved;

// ============================================================================
// Re-exports: Spinlock
// ============================================================================

pub use spinlock::next_acquire_value;
pub use spinlock::next_release_value;
