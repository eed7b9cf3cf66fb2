/// Property-based tests for the synchronization invariants.
///
/// Every property is checked after every tick, not only at the end of a run:
/// - Mutual exclusion (at most one writer, never readers with a writer)
/// - Bounded concurrency (at most two readers)
/// - Conservation (available + waiters + holders == capacity)
/// - Progress (random runs terminate well inside the tick bound)
mod common;

use proptest::prelude::*;
use rwsim::PrimitiveKind;
use rwsim::Process;
use rwsim::ProcessId;
use rwsim::Role;
use rwsim::Scheduler;
use rwsim::ScriptedSelector;
use rwsim::SharedState;
use rwsim::SimConfig;
use rwsim::Simulation;
use rwsim::TickOutcome;

const PROGRESS_TICK_BOUND: u64 = 10_000;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]
    #[test]
    fn test_invariants_hold_every_tick(
        kind in common::synchronizing_kind(),
        processes in 1u32..=10,
        seed in any::<u64>(),
    ) {
        let mut scheduler = common::random_scheduler(kind, processes, 2, 1, seed);
        while !scheduler.all_finished() && scheduler.ticks() < PROGRESS_TICK_BOUND {
            scheduler.tick().map_err(|e| TestCaseError::fail(e.to_string()))?;
            common::check_exclusion(scheduler.shared()).map_err(TestCaseError::fail)?;
            common::check_counters_match_processes(&scheduler).map_err(TestCaseError::fail)?;
            common::check_conservation(&scheduler).map_err(TestCaseError::fail)?;
        }
        prop_assert!(scheduler.all_finished(), "did not finish within {} ticks", PROGRESS_TICK_BOUND);
        prop_assert!(!scheduler.trace().has_violations());
        prop_assert!(scheduler.shared().is_quiescent());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]
    #[test]
    fn test_wider_admission_still_excludes_writers(
        kind in common::synchronizing_kind(),
        admission in 1u32..=4,
        seed in any::<u64>(),
    ) {
        // More readers may share the section, but never with a writer.
        let mut scheduler = common::random_scheduler(kind, 8, admission, 1, seed);
        while !scheduler.all_finished() && scheduler.ticks() < PROGRESS_TICK_BOUND {
            scheduler.tick().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let c = scheduler.shared().counters;
            prop_assert!(c.active_writers <= 1);
            prop_assert!(c.active_writers == 0 || c.active_readers == 0);
            prop_assert!(c.active_readers <= admission);
            common::check_conservation(&scheduler).map_err(TestCaseError::fail)?;
        }
        prop_assert!(scheduler.all_finished());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]
    #[test]
    fn test_one_reader_one_writer_never_overlap(
        kind in common::synchronizing_kind(),
        prefix in prop::collection::vec(0usize..2, 0..60),
    ) {
        // Adversarial prefix, then strict alternation to drain both processes.
        let processes = vec![Process::new(ProcessId(0), Role::Reader), Process::new(ProcessId(1), Role::Writer)];
        let script = prefix.into_iter().chain(std::iter::repeat_n([0, 1], 100).flatten());
        let mut scheduler = Scheduler::new(processes, SharedState::new(kind, 2, 1), ScriptedSelector::new(script));

        loop {
            let outcome = scheduler.tick().map_err(|e| TestCaseError::fail(e.to_string()))?;
            common::check_exclusion(scheduler.shared()).map_err(TestCaseError::fail)?;
            common::check_conservation(&scheduler).map_err(TestCaseError::fail)?;
            if scheduler.all_finished() || outcome == TickOutcome::Exhausted {
                break;
            }
        }
        prop_assert!(scheduler.all_finished());
        prop_assert!(!scheduler.trace().has_violations());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]
    #[test]
    fn test_seed_determines_run(seed in any::<u64>(), kind in common::synchronizing_kind()) {
        let config = SimConfig::named("determinism").with_seed(seed).with_primitive(kind).with_record_trace(true);
        let a = Simulation::new(config.clone()).unwrap().run().unwrap();
        let b = Simulation::new(config).unwrap().run().unwrap();
        prop_assert!(a.trace.is_some());
        prop_assert_eq!(a.trace, b.trace);
        prop_assert_eq!(a.metrics, b.metrics);
    }
}

#[test]
fn test_progress_thousand_runs() {
    for kind in [PrimitiveKind::Semaphore, PrimitiveKind::Spinlock] {
        for seed in 0..1000u64 {
            let config = SimConfig::named("progress")
                .with_primitive(kind)
                .with_seed(seed)
                .with_max_ticks(PROGRESS_TICK_BOUND)
                .with_record_trace(false);
            let report = Simulation::new(config).unwrap().run().unwrap();
            assert!(report.is_clean(), "{kind} seed {seed}: {}", report.outcome);
            assert!(report.quiescent, "{kind} seed {seed}");
            assert_eq!(report.metrics.finished, 6);
        }
    }
}
