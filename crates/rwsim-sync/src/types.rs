//! Shared types for synchronization primitives.

use serde::Deserialize;
use serde::Serialize;

/// Identifier of a simulated process.
///
/// Assigned densely from zero at simulation start, so it doubles as the
/// process's index in the scheduler's process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Get the raw identifier value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Index of this process in a densely allocated process table.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId(3).to_string(), "P3");
    }

    #[test]
    fn test_process_id_index() {
        assert_eq!(ProcessId(5).index(), 5);
        assert_eq!(ProcessId(5).value(), 5);
    }

    #[test]
    fn test_process_id_ordering() {
        assert!(ProcessId(1) < ProcessId(2));
    }
}
