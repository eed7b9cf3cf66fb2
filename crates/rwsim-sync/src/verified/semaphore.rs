//! Pure semaphore computation functions.
//!
//! A counting semaphore with a wait queue keeps `count` signed: a negative
//! count is the number of parked waiters. These functions compute the next
//! count and what the caller must do with the queue.
//!
//! # Tiger Style
//!
//! - Uses saturating arithmetic for all calculations
//! - Deterministic behavior for testing and verification

/// Result of a `wait` on a semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDecision {
    /// The caller holds a permit and may advance.
    Acquire {
        /// Count after the decrement.
        new_count: i64,
    },
    /// No permit left; the caller must be enqueued and parked.
    Park {
        /// Count after the decrement (negative).
        new_count: i64,
    },
}

/// Result of a `signal` on a semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDecision {
    /// The permit returns to the pool.
    Release {
        /// Count after the increment.
        new_count: i64,
    },
    /// The permit passes directly to the head of the wait queue.
    WakeHead {
        /// Count after the increment.
        new_count: i64,
    },
}

/// Compute the outcome of a `wait`.
///
/// Decrements the count; a negative result means the caller parks.
///
/// # Example
///
/// ```
/// use rwsim_sync::verified::{compute_wait, WaitDecision};
///
/// assert_eq!(compute_wait(1), WaitDecision::Acquire { new_count: 0 });
/// assert_eq!(compute_wait(0), WaitDecision::Park { new_count: -1 });
/// ```
#[inline]
pub fn compute_wait(count: i64) -> WaitDecision {
    let new_count = count.saturating_sub(1);
    if new_count < 0 {
        WaitDecision::Park { new_count }
    } else {
        WaitDecision::Acquire { new_count }
    }
}

/// Compute the outcome of a `signal`.
///
/// Increments the count. When the result is still non-positive and somebody is
/// queued, the head of the queue is woken and inherits the permit. A
/// non-positive count with an empty queue is a transient bookkeeping state and
/// only the counter changes.
///
/// # Arguments
///
/// * `count` - Current count
/// * `queue_len` - Number of parked waiters
#[inline]
pub fn compute_signal(count: i64, queue_len: u32) -> SignalDecision {
    let new_count = count.saturating_add(1);
    if new_count <= 0 && queue_len > 0 {
        SignalDecision::WakeHead { new_count }
    } else {
        SignalDecision::Release { new_count }
    }
}

/// Check the semaphore conservation invariant.
///
/// `count + waiters + holders` must always equal the initial count.
#[inline]
pub fn is_conserved(initial: u32, count: i64, waiters: u32, holders: u32) -> bool {
    count.saturating_add(i64::from(waiters)).saturating_add(i64::from(holders)) == i64::from(initial)
}


#[cfg(all(test, feature = "bolero"))]
mod property_tests {
    use bolero::check;

    use super::*;

    #[test]
    fn prop_wait_then_signal_restores_count() {
        check!().with_type::<i32>().for_each(|count| {
            let count = i64::from(*count);
            let after_wait = match compute_wait(count) {
                WaitDecision::Acquire { new_count } | WaitDecision::Park { new_count } => new_count,
            };
            let after_signal = match compute_signal(after_wait, 1) {
                SignalDecision::Release { new_count } | SignalDecision::WakeHead { new_count } => new_count,
            };
            assert_eq!(after_signal, count);
        });
    }

    #[test]
    fn prop_wait_parks_iff_exhausted() {
        check!().with_type::<i32>().for_each(|count| {
            let parked = matches!(compute_wait(i64::from(*count)), WaitDecision::Park { .. });
            assert_eq!(parked, *count <= 0);
        });
    }

    #[test]
    fn prop_signal_never_wakes_from_empty_queue() {
        check!().with_type::<i32>().for_each(|count| {
            assert!(matches!(compute_signal(i64::from(*count), 0), SignalDecision::Release { .. }));
        });
    }
}
