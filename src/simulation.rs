//! Simulation harness.
//!
//! Builds the process table and shared state from a [`SimConfig`], picks a
//! seed, runs the scheduler to an outcome and packages the result as a
//! serializable [`SimulationReport`].
//!
//! Seed selection, first match wins:
//!
//! 1. `config.seed`
//! 2. the `RWSIM_TEST_SEED` environment variable
//! 3. a hash of `config.name`
//!
//! so a failing run can always be replayed from the seed it logs.

use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ConfigError;
use crate::config::SimConfig;
use crate::constants::MAX_BATCH_RUNS;
use crate::constants::TEST_SEED_ENV;
use crate::error::Result;
use crate::process::assign_roles;
use crate::scheduler::RandomSelector;
use crate::scheduler::RunOutcome;
use crate::scheduler::Scheduler;
use crate::scheduler::Selector;
use crate::shared::SharedState;
use crate::trace::Trace;
use crate::trace::TraceEvent;

/// Counters gathered over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Scheduler draws.
    pub ticks: u64,
    /// Draws that executed an instruction.
    pub steps: u64,
    /// Draws that hit a blocked or finished process.
    pub idle_draws: u64,
    /// Failed spinlock attempts.
    pub spins: u64,
    /// Parks on a semaphore queue.
    pub blocks: u64,
    /// Processes woken by a release.
    pub wakes: u64,
    /// Invariant violations.
    pub violations: u64,
    /// Processes that terminated.
    pub finished: u64,
}

/// Result of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Simulation name.
    pub name: String,
    /// Seed the run used.
    pub seed: u64,
    /// Effective configuration.
    pub config: SimConfig,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Counters.
    pub metrics: SimulationMetrics,
    /// Whether counters and primitives were back at their initial values.
    pub quiescent: bool,
    /// Every violation recorded.
    pub violations: Vec<TraceEvent>,
    /// Events not kept because a trace cap was reached.
    pub dropped_events: u64,
    /// Full event log, when recording was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEvent>>,
}

impl SimulationReport {
    /// Completed with no violations.
    pub fn is_clean(&self) -> bool {
        self.outcome.is_completed() && self.violations.is_empty()
    }
}

/// A configured, seeded simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    seed: u64,
}

impl Simulation {
    /// Validate `config` and pick a seed.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let seed = derive_seed(&config);
        info!(name = %config.name, seed, processes = config.processes, primitive = %config.primitive, "simulation created");
        info!("to reproduce: {TEST_SEED_ENV}={seed}");
        if !config.primitive.is_synchronizing() {
            warn!(primitive = %config.primitive, "primitives do not synchronize; violations are expected");
        }
        Ok(Self { config, seed })
    }

    /// A simulation with an already validated config and a fixed seed.
    fn seeded(config: SimConfig, seed: u64) -> Self {
        debug!(name = %config.name, seed, "simulation created");
        Self { config, seed }
    }

    /// Seed this simulation runs with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Effective configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Build a fresh scheduler driven by `selector`.
    pub fn scheduler_with<S: Selector>(&self, selector: S) -> Scheduler<S> {
        let trace = if self.config.record_trace {
            Trace::new()
        } else {
            Trace::violations_only()
        };
        Scheduler::new(assign_roles(self.config.processes), SharedState::from_config(&self.config), selector)
            .with_max_ticks(self.config.max_ticks)
            .with_trace(trace)
    }

    /// Run to an outcome with the seeded random selector.
    pub fn run(&self) -> Result<SimulationReport> {
        self.run_with(RandomSelector::new(self.seed))
    }

    /// Run to an outcome with the given selector.
    pub fn run_with<S: Selector>(&self, selector: S) -> Result<SimulationReport> {
        let report = self.execute(selector)?;
        if report.metrics.violations > 0 {
            warn!(name = %self.config.name, seed = self.seed, violations = report.metrics.violations, "run had violations");
        }
        info!(name = %self.config.name, seed = self.seed, outcome = %report.outcome, "run finished");
        Ok(report)
    }

    fn execute<S: Selector>(&self, selector: S) -> Result<SimulationReport> {
        let mut scheduler = self.scheduler_with(selector);
        let outcome = scheduler.schedule_until_complete()?;
        let quiescent = scheduler.shared().is_quiescent();
        let (trace, metrics) = scheduler.into_parts();
        debug!(name = %self.config.name, seed = self.seed, %outcome, "run finished");

        let violations = trace.violations().to_vec();
        let dropped_events = trace.dropped();
        let recorded = trace.is_recording().then(|| trace.into_events());
        Ok(SimulationReport {
            name: self.config.name.clone(),
            seed: self.seed,
            config: self.config.clone(),
            outcome,
            metrics,
            quiescent,
            violations,
            dropped_events,
            trace: recorded,
        })
    }
}

/// Pick the seed for `config`.
pub fn derive_seed(config: &SimConfig) -> u64 {
    config.seed.unwrap_or_else(|| {
        std::env::var(TEST_SEED_ENV).ok().and_then(|s| s.parse().ok()).unwrap_or_else(|| {
            let mut hasher = DefaultHasher::new();
            config.name.hash(&mut hasher);
            hasher.finish()
        })
    })
}

/// A run in a batch that did not complete cleanly.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Seed of the failing run.
    pub seed: u64,
    /// How it ended.
    pub outcome: RunOutcome,
    /// Violations it recorded.
    pub violations: u64,
}

/// Aggregate over a batch of runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Simulation name.
    pub name: String,
    /// First seed; run `i` used `base_seed + i`.
    pub base_seed: u64,
    /// Runs executed.
    pub runs: u32,
    /// Runs where every process finished.
    pub completed: u32,
    /// Runs with at least one violation.
    pub violating_runs: u32,
    /// Violations across all runs.
    pub total_violations: u64,
    /// Runs that hit the tick bound.
    pub tick_limit_exceeded: u32,
    /// Runs that deadlocked.
    pub deadlocked: u32,
    /// Most ticks any run used.
    pub max_ticks_used: u64,
    /// Ticks across all runs.
    pub total_ticks: u64,
    /// Runs that did not complete cleanly.
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    /// Every run completed with no violations.
    pub fn is_clean(&self) -> bool {
        self.completed == self.runs && self.violating_runs == 0
    }

    fn add(&mut self, report: &SimulationReport) {
        self.runs += 1;
        self.total_ticks = self.total_ticks.saturating_add(report.metrics.ticks);
        self.max_ticks_used = self.max_ticks_used.max(report.metrics.ticks);
        self.total_violations = self.total_violations.saturating_add(report.metrics.violations);
        match report.outcome {
            RunOutcome::Completed { .. } => self.completed += 1,
            RunOutcome::TickLimitExceeded { .. } => self.tick_limit_exceeded += 1,
            RunOutcome::Deadlocked { .. } => self.deadlocked += 1,
            RunOutcome::SelectorExhausted { .. } => {}
        }
        if !report.violations.is_empty() {
            self.violating_runs += 1;
        }
        if !report.is_clean() {
            self.failures.push(BatchFailure {
                seed: report.seed,
                outcome: report.outcome.clone(),
                violations: report.metrics.violations,
            });
        }
    }
}

/// Run `runs` simulations with consecutive seeds starting at the seed
/// [`derive_seed`] picks for `config`. Traces are not kept.
pub fn run_batch(config: &SimConfig, runs: u32) -> Result<BatchSummary> {
    if runs == 0 || runs > MAX_BATCH_RUNS {
        return Err(ConfigError::invalid("runs", runs, format!("must be between 1 and {MAX_BATCH_RUNS}")).into());
    }
    config.validate()?;

    let base_seed = derive_seed(config);
    let mut summary = BatchSummary {
        name: config.name.clone(),
        base_seed,
        ..BatchSummary::default()
    };
    for i in 0..runs {
        let seed = base_seed.wrapping_add(u64::from(i));
        let run_config = config.clone().with_seed(seed).with_record_trace(false);
        let report = Simulation::seeded(run_config, seed).execute(RandomSelector::new(seed))?;
        summary.add(&report);
    }
    if summary.violating_runs > 0 {
        warn!(
            name = %summary.name,
            violating_runs = summary.violating_runs,
            total_violations = summary.total_violations,
            "batch had violations"
        );
    }
    info!(
        name = %summary.name,
        runs = summary.runs,
        completed = summary.completed,
        violating_runs = summary.violating_runs,
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use rwsim_sync::PrimitiveKind;

    use super::*;
    use crate::config::test_env::EnvVars;
    use crate::scheduler::ScriptedSelector;

    #[test]
    fn test_explicit_seed_wins() {
        let config = SimConfig::named("seeded").with_seed(1234);
        assert_eq!(derive_seed(&config), 1234);
        assert_eq!(Simulation::new(config).unwrap().seed(), 1234);
    }

    #[test]
    fn test_name_hash_is_stable() {
        let _env = EnvVars::lock();
        let a = derive_seed(&SimConfig::named("alpha"));
        assert_eq!(a, derive_seed(&SimConfig::named("alpha")));
        assert_ne!(a, derive_seed(&SimConfig::named("beta")));
    }

    #[test]
    fn test_seed_env_var_beats_name_hash() {
        let mut env = EnvVars::lock();
        env.set(TEST_SEED_ENV, "777");
        assert_eq!(derive_seed(&SimConfig::named("alpha")), 777);
        // An explicit seed still wins.
        assert_eq!(derive_seed(&SimConfig::named("alpha").with_seed(5)), 5);
    }

    #[test]
    fn test_unparsable_seed_env_var_falls_back_to_name_hash() {
        let mut env = EnvVars::lock();
        let hashed = derive_seed(&SimConfig::named("alpha"));
        env.set(TEST_SEED_ENV, "not-a-number");
        assert_eq!(derive_seed(&SimConfig::named("alpha")), hashed);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Simulation::new(SimConfig::default().with_processes(0)).is_err());
    }

    #[test]
    fn test_default_run_is_clean() {
        let config = SimConfig::named("default").with_seed(7).with_record_trace(true);
        let report = Simulation::new(config).unwrap().run().unwrap();
        assert!(report.is_clean(), "{:?}", report.outcome);
        assert!(report.quiescent);
        assert_eq!(report.metrics.finished, 6);
        assert!(report.trace.is_some());
    }

    #[test]
    fn test_no_trace_by_default() {
        let config = SimConfig::named("quiet").with_seed(7);
        let report = Simulation::new(config).unwrap().run().unwrap();
        assert!(report.trace.is_none());
    }

    #[test]
    fn test_run_with_script() {
        // One reader, one writer; the writer goes first and finishes alone.
        let sim = Simulation::new(SimConfig::named("scripted").with_processes(2).with_seed(0)).unwrap();
        let script = [1, 1, 1, 1, 1].into_iter().chain(std::iter::repeat_n(0, 14));
        let report = sim.run_with(ScriptedSelector::new(script)).unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed { ticks: 19 });
        assert_eq!(report.metrics.steps, 19);
    }

    #[test]
    fn test_batch() {
        let summary = run_batch(&SimConfig::named("batch").with_seed(100), 20).unwrap();
        assert_eq!(summary.runs, 20);
        assert!(summary.is_clean(), "{:?}", summary.failures);
        assert_eq!(summary.base_seed, 100);
    }

    #[test]
    fn test_batch_runs_match_single_runs() {
        let config = SimConfig::named("batch-replay").with_seed(40).with_primitive(PrimitiveKind::Spinlock);
        let summary = run_batch(&config, 5).unwrap();
        let total: u64 = (0..5)
            .map(|i| Simulation::new(config.clone().with_seed(40 + i)).unwrap().run().unwrap().metrics.ticks)
            .sum();
        assert_eq!(summary.total_ticks, total);
    }

    #[test]
    fn test_batch_reports_deadlocks() {
        let config = SimConfig::named("stuck").with_seed(1).with_capacities(2, 0);
        let summary = run_batch(&config, 3).unwrap();
        assert_eq!(summary.deadlocked, 3);
        assert_eq!(summary.failures.len(), 3);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_batch_run_count_bounds() {
        assert!(run_batch(&SimConfig::default(), 0).is_err());
    }

    #[test]
    fn test_report_serializes() {
        let config = SimConfig::named("json").with_seed(3).with_primitive(PrimitiveKind::Spinlock);
        let report = Simulation::new(config).unwrap().run().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["outcome"], "completed");
        assert_eq!(json["config"]["primitive"], "spinlock");
    }
}
