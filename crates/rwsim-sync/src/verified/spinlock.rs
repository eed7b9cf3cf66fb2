//! Pure spinlock computation functions.
//!
//! A spinlock here is a bounded counter: a plain mutex has capacity 1 (the
//! classic 0/1 flag), a reader-admission slot has capacity 2. These functions
//! compute the value a compare-and-swap should try to install.
//!
//! # Tiger Style
//!
//! - Returns `None` instead of wrapping past a bound

/// Value to CAS into the cell to take one slot, or `None` if the lock is full.
///
/// # Example
///
/// ```
/// use rwsim_sync::verified::next_acquire_value;
///
/// assert_eq!(next_acquire_value(0, 1), Some(1));
/// assert_eq!(next_acquire_value(1, 1), None);
/// ```
#[inline]
pub fn next_acquire_value(current: u32, capacity: u32) -> Option<u32> {
    if current < capacity { current.checked_add(1) } else { None }
}

/// Value to CAS into the cell to give back one slot, or `None` if nothing is held.
#[inline]
pub fn next_release_value(current: u32) -> Option<u32> {
    current.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_flag() {
        assert_eq!(next_acquire_value(0, 1), Some(1));
        assert_eq!(next_acquire_value(1, 1), None);
    }

    #[test]
    fn test_acquire_bounded_counter() {
        assert_eq!(next_acquire_value(0, 2), Some(1));
        assert_eq!(next_acquire_value(1, 2), Some(2));
        assert_eq!(next_acquire_value(2, 2), None);
    }

    #[test]
    fn test_acquire_zero_capacity_never_succeeds() {
        assert_eq!(next_acquire_value(0, 0), None);
    }

    #[test]
    fn test_release() {
        assert_eq!(next_release_value(2), Some(1));
        assert_eq!(next_release_value(0), None);
    }
}
