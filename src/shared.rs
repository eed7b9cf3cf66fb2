//! State shared by every simulated process.
//!
//! This is the complete set of mutable state the primitives exist to protect:
//! three counters and the three primitives themselves. It is passed by
//! reference to each protocol step rather than living in globals, so a single
//! transition can be tested against a hand-built `SharedState`.

use rwsim_sync::Primitive;
use rwsim_sync::PrimitiveKind;
use rwsim_sync::PrimitiveSnapshot;
use rwsim_sync::SyncPrimitive;
use serde::Deserialize;
use serde::Serialize;

use crate::checker;
use crate::checker::InvariantLimits;
use crate::checker::Violation;
use crate::config::SimConfig;
use crate::constants::READ_COUNT_MUTEX_CAPACITY;

/// The protocol's use of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveRole {
    /// Reader-admission slot; limits concurrent readers.
    Admission,
    /// Mutex guarding `read_count`.
    ReadCountMutex,
    /// Writer exclusion; held by one writer or by the reader group.
    WriterExclusion,
}

impl PrimitiveRole {
    /// All roles, in declaration order.
    pub const ALL: [PrimitiveRole; 3] =
        [PrimitiveRole::Admission, PrimitiveRole::ReadCountMutex, PrimitiveRole::WriterExclusion];

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveRole::Admission => "admission",
            PrimitiveRole::ReadCountMutex => "read_count_mutex",
            PrimitiveRole::WriterExclusion => "writer_exclusion",
        }
    }
}

impl std::fmt::Display for PrimitiveRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared counters read by the invariant checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Readers inside the critical section.
    pub active_readers: u32,
    /// Writers inside the critical section.
    pub active_writers: u32,
    /// Readers between their entry and exit bookkeeping; gates the
    /// first-reader/last-reader writer-exclusion handling.
    pub read_count: u32,
}

impl Counters {
    /// Whether every counter is back to zero.
    pub fn is_zero(&self) -> bool {
        *self == Counters::default()
    }
}

/// Counters plus the three protocol primitives.
#[derive(Debug, Clone)]
pub struct SharedState {
    /// Shared counters. Mutated only by protocol instructions.
    pub counters: Counters,
    admission: Primitive,
    read_count_mutex: Primitive,
    writer_exclusion: Primitive,
    limits: InvariantLimits,
}

impl SharedState {
    /// Build shared state with all three primitives of `kind` and default
    /// invariant limits.
    pub fn new(kind: PrimitiveKind, admission_capacity: u32, writer_exclusion_capacity: u32) -> Self {
        Self {
            counters: Counters::default(),
            admission: Primitive::new(kind, PrimitiveRole::Admission.as_str(), admission_capacity),
            read_count_mutex: Primitive::new(kind, PrimitiveRole::ReadCountMutex.as_str(), READ_COUNT_MUTEX_CAPACITY),
            writer_exclusion: Primitive::new(
                kind,
                PrimitiveRole::WriterExclusion.as_str(),
                writer_exclusion_capacity,
            ),
            limits: InvariantLimits::default(),
        }
    }

    /// Build shared state from a configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.primitive, config.admission_capacity, config.writer_exclusion_capacity)
            .with_limits(config.invariants)
    }

    /// Replace the invariant limits.
    pub fn with_limits(mut self, limits: InvariantLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The primitive playing `role`.
    pub fn primitive(&self, role: PrimitiveRole) -> &Primitive {
        match role {
            PrimitiveRole::Admission => &self.admission,
            PrimitiveRole::ReadCountMutex => &self.read_count_mutex,
            PrimitiveRole::WriterExclusion => &self.writer_exclusion,
        }
    }

    /// The primitive playing `role`, mutably.
    pub fn primitive_mut(&mut self, role: PrimitiveRole) -> &mut Primitive {
        match role {
            PrimitiveRole::Admission => &mut self.admission,
            PrimitiveRole::ReadCountMutex => &mut self.read_count_mutex,
            PrimitiveRole::WriterExclusion => &mut self.writer_exclusion,
        }
    }

    /// Invariant limits in force.
    pub fn limits(&self) -> InvariantLimits {
        self.limits
    }

    /// Run the invariant checker against the current counters.
    pub fn check(&self) -> Option<Violation> {
        checker::check(&self.counters, &self.limits)
    }

    /// Snapshots of all three primitives, keyed by role.
    pub fn snapshots(&self) -> Vec<(PrimitiveRole, PrimitiveSnapshot)> {
        PrimitiveRole::ALL.iter().map(|role| (*role, self.primitive(*role).snapshot())).collect()
    }

    /// Whether counters are zero and every primitive is back at its initial value.
    pub fn is_quiescent(&self) -> bool {
        self.counters.is_zero() && PrimitiveRole::ALL.iter().all(|role| self.primitive(*role).is_at_initial())
    }
}
