//! The capability trait shared by every primitive, and the enum that selects one.

use serde::Deserialize;
use serde::Serialize;

use crate::error::SyncError;
use crate::semaphore::Semaphore;
use crate::spinlock::SpinLock;
use crate::types::ProcessId;
use crate::unguarded::Unguarded;

/// Outcome of an acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquire {
    /// The caller holds the resource and may advance.
    Acquired,
    /// The caller was queued and must be marked blocked until a release wakes it.
    Parked,
    /// The resource is busy; the caller stays runnable and retries next turn.
    Busy,
}

/// Outcome of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Release {
    /// The resource returned to the pool.
    Released,
    /// The resource passed directly to this parked process.
    ///
    /// The woken process is considered to have completed its wait: whoever
    /// owns the process table must mark it runnable and advance it past the
    /// instruction it was parked on.
    Woke(ProcessId),
}

/// Point-in-time view of a primitive, for reports and post-run checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveSnapshot {
    /// Primitive name.
    pub name: String,
    /// Which implementation backs it.
    pub kind: PrimitiveKind,
    /// Configured capacity.
    pub capacity: u32,
    /// Current counter. Semaphore count (negative when processes wait), or
    /// remaining spinlock slots.
    pub available: i64,
    /// Parked processes in wake order.
    pub waiters: Vec<ProcessId>,
}

/// A wait/signal-shaped mutual-exclusion or counting primitive.
///
/// Implementations never block the calling thread. Unavailability is returned
/// as [`Acquire::Parked`] or [`Acquire::Busy`], and a release that hands the
/// resource to a waiter returns [`Release::Woke`].
pub trait SyncPrimitive {
    /// Name used in traces and errors.
    fn name(&self) -> &str;

    /// Which implementation this is.
    fn kind(&self) -> PrimitiveKind;

    /// Try to take one unit of the resource on behalf of `pid`.
    fn try_acquire(&mut self, pid: ProcessId) -> Result<Acquire, SyncError>;

    /// Give back one unit of the resource.
    fn release(&mut self) -> Result<Release, SyncError>;

    /// Current state, for reporting.
    fn snapshot(&self) -> PrimitiveSnapshot;

    /// Whether the primitive is back at its initial value with nobody waiting.
    fn is_at_initial(&self) -> bool;
}

/// Primitive implementation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Blocking counting semaphore with a FIFO wait queue.
    #[default]
    Semaphore,
    /// Busy-wait compare-and-swap lock.
    Spinlock,
    /// No synchronization at all. Exists to exercise the invariant checker.
    Unguarded,
}

impl PrimitiveKind {
    /// All kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 3] = [PrimitiveKind::Semaphore, PrimitiveKind::Spinlock, PrimitiveKind::Unguarded];

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Semaphore => "semaphore",
            PrimitiveKind::Spinlock => "spinlock",
            PrimitiveKind::Unguarded => "unguarded",
        }
    }

    /// Whether a correct protocol on this primitive guarantees mutual exclusion.
    pub fn is_synchronizing(&self) -> bool {
        !matches!(self, PrimitiveKind::Unguarded)
    }
}

impl std::str::FromStr for PrimitiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "semaphore" | "sem" | "blocking" => Ok(PrimitiveKind::Semaphore),
            "spinlock" | "spin" | "cas" => Ok(PrimitiveKind::Spinlock),
            "unguarded" | "none" => Ok(PrimitiveKind::Unguarded),
            _ => Err(format!("Invalid primitive '{}'. Valid options: semaphore, spinlock, unguarded", s)),
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive of any kind.
///
/// Protocol code holds these and talks to them only through [`SyncPrimitive`].
#[derive(Debug, Clone)]
pub enum Primitive {
    /// See [`Semaphore`].
    Semaphore(Semaphore),
    /// See [`SpinLock`].
    Spinlock(SpinLock),
    /// See [`Unguarded`].
    Unguarded(Unguarded),
}

impl Primitive {
    /// Build a primitive of the given kind.
    pub fn new(kind: PrimitiveKind, name: impl Into<String>, capacity: u32) -> Self {
        match kind {
            PrimitiveKind::Semaphore => Primitive::Semaphore(Semaphore::new(name, capacity)),
            PrimitiveKind::Spinlock => Primitive::Spinlock(SpinLock::new(name, capacity)),
            PrimitiveKind::Unguarded => Primitive::Unguarded(Unguarded::new(name, capacity)),
        }
    }

    /// The backing semaphore, if this is one.
    pub fn as_semaphore(&self) -> Option<&Semaphore> {
        match self {
            Primitive::Semaphore(sem) => Some(sem),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn SyncPrimitive {
        match self {
            Primitive::Semaphore(p) => p,
            Primitive::Spinlock(p) => p,
            Primitive::Unguarded(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SyncPrimitive {
        match self {
            Primitive::Semaphore(p) => p,
            Primitive::Spinlock(p) => p,
            Primitive::Unguarded(p) => p,
        }
    }
}

impl SyncPrimitive for Primitive {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> PrimitiveKind {
        self.inner().kind()
    }

    fn try_acquire(&mut self, pid: ProcessId) -> Result<Acquire, SyncError> {
        self.inner_mut().try_acquire(pid)
    }

    fn release(&mut self) -> Result<Release, SyncError> {
        self.inner_mut().release()
    }

    fn snapshot(&self) -> PrimitiveSnapshot {
        self.inner().snapshot()
    }

    fn is_at_initial(&self) -> bool {
        self.inner().is_at_initial()
    }
}
