//! Observable event log.
//!
//! Every step leaves a record of what it did: acquisitions, failed attempts,
//! releases, critical-section transitions and invariant violations. Tests
//! assert against the recorded [`Trace`]; every event is also mirrored to
//! `tracing` so a run can be followed live with `RUST_LOG=debug`.

use rwsim_sync::ProcessId;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::checker::Violation;
use crate::constants::MAX_RECORDED_VIOLATIONS;
use crate::constants::MAX_TRACE_EVENTS;
use crate::process::Role;
use crate::shared::PrimitiveRole;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// Primitive acquired without waiting.
    Acquired {
        /// Which primitive.
        primitive: PrimitiveRole,
    },
    /// Spinlock busy; the instruction will be retried.
    Spin {
        /// Which primitive.
        primitive: PrimitiveRole,
    },
    /// Parked on a semaphore wait queue.
    Blocked {
        /// Which primitive.
        primitive: PrimitiveRole,
    },
    /// Primitive released.
    Released {
        /// Which primitive.
        primitive: PrimitiveRole,
    },
    /// Woken by a release and handed the primitive.
    Woken {
        /// Which primitive.
        primitive: PrimitiveRole,
        /// Process whose release did the wake.
        by: ProcessId,
    },
    /// Entered the critical section.
    EnterCritical {
        /// Role of the entering process.
        role: Role,
    },
    /// Did its work inside the critical section.
    Working {
        /// Role of the working process.
        role: Role,
    },
    /// Left the critical section.
    ExitCritical {
        /// Role of the leaving process.
        role: Role,
    },
    /// `read_count` changed.
    ReadCountChanged {
        /// New value.
        value: u32,
    },
    /// The checker found a broken invariant.
    Violation {
        /// What was broken.
        violation: Violation,
    },
    /// Terminal instruction executed.
    Finished,
}

impl EventKind {
    /// Whether this event records a step that made no progress.
    pub fn is_no_progress(&self) -> bool {
        matches!(self, EventKind::Spin { .. } | EventKind::Blocked { .. })
    }
}

/// One recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Scheduler tick the event happened on.
    pub tick: u64,
    /// Process the event is attributed to.
    pub pid: ProcessId,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:>6}] {} ", self.tick, self.pid)?;
        match self.kind {
            EventKind::Acquired { primitive } => write!(f, "acquired {primitive}"),
            EventKind::Spin { primitive } => write!(f, "spins on {primitive}"),
            EventKind::Blocked { primitive } => write!(f, "blocked on {primitive}"),
            EventKind::Released { primitive } => write!(f, "released {primitive}"),
            EventKind::Woken { primitive, by } => write!(f, "woken on {primitive} by {by}"),
            EventKind::EnterCritical { role } => write!(f, "{role} enters critical section"),
            EventKind::Working { role } => write!(f, "{role} working"),
            EventKind::ExitCritical { role } => write!(f, "{role} exits critical section"),
            EventKind::ReadCountChanged { value } => write!(f, "read_count = {value}"),
            EventKind::Violation { violation } => write!(f, "VIOLATION: {violation}"),
            EventKind::Finished => write!(f, "finished"),
        }
    }
}

/// Append-only event log.
///
/// With recording disabled events are still mirrored to `tracing` but not
/// kept; violations are always kept so they can be reported. Kept events stop
/// at `MAX_TRACE_EVENTS` and kept violations at `MAX_RECORDED_VIOLATIONS`;
/// anything past a cap is counted in [`Trace::dropped`].
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    events: Vec<TraceEvent>,
    violations: Vec<TraceEvent>,
    dropped: u64,
    #[serde(skip)]
    record_all: bool,
    #[serde(skip)]
    max_events: usize,
}

impl Default for Trace {
    fn default() -> Self {
        Self::violations_only()
    }
}

impl Trace {
    /// Create a trace that keeps every event, up to `MAX_TRACE_EVENTS`.
    pub fn new() -> Self {
        Self::with_limit(MAX_TRACE_EVENTS)
    }

    /// Create a trace that keeps at most `max_events` events.
    pub fn with_limit(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            violations: Vec::new(),
            dropped: 0,
            record_all: true,
            max_events,
        }
    }

    /// Create a trace that keeps only violations.
    pub fn violations_only() -> Self {
        Self {
            record_all: false,
            ..Self::with_limit(0)
        }
    }

    /// Whether every event is kept.
    pub fn is_recording(&self) -> bool {
        self.record_all
    }

    /// Events (including violations) not kept because a cap was reached.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Record an event.
    pub fn record(&mut self, tick: u64, pid: ProcessId, kind: EventKind) {
        let event = TraceEvent { tick, pid, kind };
        match kind {
            EventKind::Violation { violation } => {
                warn!(tick, %pid, %violation, "invariant violated");
                if self.violations.len() < MAX_RECORDED_VIOLATIONS {
                    self.violations.push(event);
                } else {
                    self.dropped += 1;
                }
            }
            EventKind::Spin { primitive } => trace!(tick, %pid, %primitive, "spin"),
            EventKind::Blocked { primitive } => debug!(tick, %pid, %primitive, "blocked"),
            EventKind::Woken { primitive, by } => debug!(tick, %pid, %primitive, %by, "woken"),
            EventKind::Finished => debug!(tick, %pid, "finished"),
            _ => trace!(tick, %pid, event = ?kind, "step"),
        }
        if !self.record_all {
            return;
        }
        if self.events.len() < self.max_events {
            self.events.push(event);
        } else {
            self.dropped += 1;
        }
    }

    /// All kept events, in order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Iterate over kept events.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter()
    }

    /// Kept events attributed to `pid`.
    pub fn for_process(&self, pid: ProcessId) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(move |e| e.pid == pid)
    }

    /// Kept events matching a predicate on their kind.
    pub fn filter<'a>(&'a self, pred: impl Fn(&EventKind) -> bool + 'a) -> impl Iterator<Item = &'a TraceEvent> {
        self.events.iter().filter(move |e| pred(&e.kind))
    }

    /// Number of kept events matching a predicate.
    pub fn count(&self, pred: impl Fn(&EventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    /// Every violation recorded, kept regardless of recording mode.
    pub fn violations(&self) -> &[TraceEvent] {
        &self.violations
    }

    /// Whether any violation was recorded.
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Number of kept events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are kept.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take the kept events out of the trace.
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order() {
        let mut trace = Trace::new();
        trace.record(1, ProcessId(0), EventKind::Acquired {
            primitive: PrimitiveRole::Admission,
        });
        trace.record(2, ProcessId(1), EventKind::Finished);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.events()[0].tick, 1);
        assert_eq!(trace.events()[1].kind, EventKind::Finished);
        assert_eq!(trace.for_process(ProcessId(1)).count(), 1);
    }

    #[test]
    fn test_violations_kept_when_not_recording() {
        let mut trace = Trace::violations_only();
        assert!(!trace.is_recording());
        trace.record(3, ProcessId(2), EventKind::Finished);
        trace.record(4, ProcessId(2), EventKind::Violation {
            violation: Violation::MultipleWriters { active_writers: 2 },
        });
        assert!(trace.is_empty());
        assert!(trace.has_violations());
        assert_eq!(trace.violations()[0].tick, 4);
    }

    #[test]
    fn test_kept_events_are_capped() {
        let mut trace = Trace::with_limit(3);
        for tick in 0..5 {
            trace.record(tick, ProcessId(0), EventKind::Finished);
        }
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.dropped(), 2);
        assert_eq!(trace.events()[2].tick, 2);
    }

    #[test]
    fn test_violations_are_capped() {
        let mut trace = Trace::violations_only();
        let violation = EventKind::Violation {
            violation: Violation::MultipleWriters { active_writers: 2 },
        };
        for tick in 0..(MAX_RECORDED_VIOLATIONS as u64 + 4) {
            trace.record(tick, ProcessId(1), violation);
        }
        assert_eq!(trace.violations().len(), MAX_RECORDED_VIOLATIONS);
        assert_eq!(trace.dropped(), 4);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_count_and_filter() {
        let mut trace = Trace::new();
        for tick in 0..3 {
            trace.record(tick, ProcessId(0), EventKind::Spin {
                primitive: PrimitiveRole::WriterExclusion,
            });
        }
        trace.record(3, ProcessId(0), EventKind::Finished);
        assert_eq!(trace.count(EventKind::is_no_progress), 3);
        assert_eq!(trace.filter(|k| *k == EventKind::Finished).count(), 1);
    }

    #[test]
    fn test_display() {
        let event = TraceEvent {
            tick: 12,
            pid: ProcessId(3),
            kind: EventKind::Woken {
                primitive: PrimitiveRole::WriterExclusion,
                by: ProcessId(1),
            },
        };
        assert_eq!(event.to_string(), "[    12] P3 woken on writer_exclusion by P1");
    }

    #[test]
    fn test_event_json_shape() {
        let event = TraceEvent {
            tick: 5,
            pid: ProcessId(0),
            kind: EventKind::ReadCountChanged { value: 1 },
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["event"], "read_count_changed");
        assert_eq!(json["value"], 1);
        assert_eq!(json["pid"], 0);
    }
}
