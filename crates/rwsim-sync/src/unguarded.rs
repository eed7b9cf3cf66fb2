//! A primitive that does not synchronize.
//!
//! Every acquire succeeds and releases are accepted unconditionally. Running the
//! readers-writers protocols on top of it is the control experiment for the
//! invariant checker.

use tracing::trace;

use crate::error::SyncError;
use crate::primitive::Acquire;
use crate::primitive::PrimitiveKind;
use crate::primitive::PrimitiveSnapshot;
use crate::primitive::Release;
use crate::primitive::SyncPrimitive;
use crate::types::ProcessId;

/// Always-granting primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unguarded {
    name: String,
    capacity: u32,
}

impl Unguarded {
    /// Create an unguarded primitive. `capacity` is kept for reporting only.
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

impl SyncPrimitive for Unguarded {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Unguarded
    }

    fn try_acquire(&mut self, pid: ProcessId) -> Result<Acquire, SyncError> {
        trace!(name = %self.name, %pid, "unguarded acquire");
        Ok(Acquire::Acquired)
    }

    fn release(&mut self) -> Result<Release, SyncError> {
        Ok(Release::Released)
    }

    fn snapshot(&self) -> PrimitiveSnapshot {
        PrimitiveSnapshot {
            name: self.name.clone(),
            kind: PrimitiveKind::Unguarded,
            capacity: self.capacity,
            available: i64::from(self.capacity),
            waiters: Vec::new(),
        }
    }

    fn is_at_initial(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_beyond_capacity() {
        let mut p = Unguarded::new("mutex", 1);
        for i in 0..5 {
            assert_eq!(p.try_acquire(ProcessId(i)).unwrap(), Acquire::Acquired);
        }
    }

    #[test]
    fn test_release_always_accepted() {
        let mut p = Unguarded::new("mutex", 1);
        assert_eq!(p.release().unwrap(), Release::Released);
        assert!(p.is_at_initial());
    }
}
