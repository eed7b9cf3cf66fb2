//! Shared helpers for the integration suites.

#![allow(dead_code)]

use proptest::prelude::*;
use rwsim::PrimitiveKind;
use rwsim::PrimitiveRole;
use rwsim::Process;
use rwsim::ProtocolState;
use rwsim::RandomSelector;
use rwsim::Scheduler;
use rwsim::SharedState;
use rwsim::assign_roles;
use rwsim_sync::SyncPrimitive;

/// Scheduler over an even reader/writer split driven by a seeded random selector.
pub fn random_scheduler(
    kind: PrimitiveKind,
    processes: u32,
    admission: u32,
    writer_exclusion: u32,
    seed: u64,
) -> Scheduler<RandomSelector> {
    Scheduler::new(
        assign_roles(processes),
        SharedState::new(kind, admission, writer_exclusion),
        RandomSelector::new(seed),
    )
}

/// Units of `role` currently held, derived from every process's program counter.
///
/// - admission: readers between acquiring (pc 0) and releasing (pc 12) a slot
/// - read-count mutex: readers at pc 2..=4 or 9..=11
/// - writer exclusion: writers at pc 1..=3, plus one for the reader group
///   while any reader is at pc 4..=10
pub fn holders(processes: &[Process], role: PrimitiveRole) -> u32 {
    let mut held = 0;
    let mut group_holds = false;
    for process in processes {
        match process.state() {
            ProtocolState::Reader(step) => {
                let pc = step.program_counter();
                match role {
                    PrimitiveRole::Admission if step.holds_admission() => held += 1,
                    PrimitiveRole::ReadCountMutex if (2..=4).contains(&pc) || (9..=11).contains(&pc) => held += 1,
                    PrimitiveRole::WriterExclusion if (4..=10).contains(&pc) => group_holds = true,
                    _ => {}
                }
            }
            ProtocolState::Writer(step) => {
                if role == PrimitiveRole::WriterExclusion && step.holds_writer_exclusion() {
                    held += 1;
                }
            }
        }
    }
    held + u32::from(group_holds)
}

/// `available + waiters + holders == capacity` for every primitive.
///
/// For a semaphore `available` is the count; for a spinlock it is the free
/// slots and the waiter list is always empty.
pub fn check_conservation<S: rwsim::Selector>(scheduler: &Scheduler<S>) -> Result<(), String> {
    for (role, snapshot) in scheduler.shared().snapshots() {
        if snapshot.kind == PrimitiveKind::Unguarded {
            continue;
        }
        let held = holders(scheduler.processes(), role);
        let total = snapshot.available + snapshot.waiters.len() as i64 + i64::from(held);
        if total != i64::from(snapshot.capacity) {
            return Err(format!(
                "{role} not conserved at tick {}: available={} waiters={} holders={} capacity={}",
                scheduler.ticks(),
                snapshot.available,
                snapshot.waiters.len(),
                held,
                snapshot.capacity
            ));
        }
        if let Some(sem) = scheduler.shared().primitive(role).as_semaphore() {
            if !sem.is_conserved() || sem.holders() != held {
                return Err(format!("{role}: semaphore tracks {} holders, expected {held}", sem.holders()));
            }
        }
    }
    Ok(())
}

/// Direct check of the mutual-exclusion counters.
pub fn check_exclusion(shared: &SharedState) -> Result<(), String> {
    let c = shared.counters;
    check_counter_values(c.active_readers, c.active_writers)
}

/// The shared counters agree with how many processes sit inside the critical
/// section according to their program counters.
pub fn check_counters_match_processes<S: rwsim::Selector>(scheduler: &Scheduler<S>) -> Result<(), String> {
    let (mut readers, mut writers) = (0, 0);
    for process in scheduler.processes() {
        match process.state() {
            ProtocolState::Reader(step) if step.in_critical_section() => readers += 1,
            ProtocolState::Writer(step) if step.in_critical_section() => writers += 1,
            _ => {}
        }
    }
    let c = scheduler.shared().counters;
    if (c.active_readers, c.active_writers) != (readers, writers) {
        return Err(format!(
            "counters say {} readers / {} writers, processes say {readers} / {writers}",
            c.active_readers, c.active_writers
        ));
    }
    check_counter_values(readers, writers)
}

fn check_counter_values(readers: u32, writers: u32) -> Result<(), String> {
    if writers > 1 {
        return Err(format!("{writers} writers"));
    }
    if writers > 0 && readers > 0 {
        return Err(format!("{readers} readers with {writers} writers"));
    }
    if readers > 2 {
        return Err(format!("{readers} readers"));
    }
    Ok(())
}

/// The primitives that actually synchronize.
pub fn synchronizing_kind() -> impl Strategy<Value = PrimitiveKind> {
    prop_oneof![Just(PrimitiveKind::Semaphore), Just(PrimitiveKind::Spinlock)]
}

/// The snapshot API is only reachable through the capability trait.
pub fn is_at_initial(shared: &SharedState, role: PrimitiveRole) -> bool {
    shared.primitive(role).is_at_initial()
}
