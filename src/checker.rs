//! Invariant checker.
//!
//! A stateless predicate over the shared counters. It is the oracle the tests
//! rely on: a correct primitive must never trip it under any interleaving the
//! scheduler can produce. Violations are reported, never fatal, so a broken
//! primitive shows every overlap it causes.

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MAX_CONCURRENT_READERS;
use crate::constants::MAX_CONCURRENT_WRITERS;
use crate::shared::Counters;

/// Bounds the critical section must respect.
///
/// Deliberately separate from the primitive capacities: a misconfigured
/// capacity is exactly what the checker should catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvariantLimits {
    /// Most readers allowed in the critical section.
    pub max_readers: u32,
    /// Most writers allowed in the critical section.
    pub max_writers: u32,
}

impl Default for InvariantLimits {
    fn default() -> Self {
        Self {
            max_readers: MAX_CONCURRENT_READERS,
            max_writers: MAX_CONCURRENT_WRITERS,
        }
    }
}

/// A broken mutual-exclusion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// More writers than allowed.
    MultipleWriters {
        /// Writers in the critical section.
        active_writers: u32,
    },
    /// Readers and writers in the critical section together.
    ReaderWriterOverlap {
        /// Readers in the critical section.
        active_readers: u32,
        /// Writers in the critical section.
        active_writers: u32,
    },
    /// More readers than allowed.
    TooManyReaders {
        /// Readers in the critical section.
        active_readers: u32,
        /// The limit.
        max_readers: u32,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MultipleWriters { active_writers } => {
                write!(f, "{} writers in critical section", active_writers)
            }
            Violation::ReaderWriterOverlap {
                active_readers,
                active_writers,
            } => write!(f, "{} readers overlap {} writers", active_readers, active_writers),
            Violation::TooManyReaders {
                active_readers,
                max_readers,
            } => write!(f, "{} readers in critical section (max: {})", active_readers, max_readers),
        }
    }
}

/// Check the counters against the limits.
///
/// When several rules are broken at once the first in this order is reported:
/// multiple writers, reader/writer overlap, too many readers.
#[inline]
pub fn check(counters: &Counters, limits: &InvariantLimits) -> Option<Violation> {
    let Counters {
        active_readers,
        active_writers,
        ..
    } = *counters;

    if active_writers > limits.max_writers {
        return Some(Violation::MultipleWriters { active_writers });
    }
    if active_writers > 0 && active_readers > 0 {
        return Some(Violation::ReaderWriterOverlap {
            active_readers,
            active_writers,
        });
    }
    if active_readers > limits.max_readers {
        return Some(Violation::TooManyReaders {
            active_readers,
            max_readers: limits.max_readers,
        });
    }
    None
}
