//! Fixed limits and defaults for the simulator.
//!
//! Tiger Style: every loop and collection in the simulator is bounded by one
//! of these.

/// Default number of simulated processes (half readers, half writers).
pub const DEFAULT_PROCESS_COUNT: u32 = 6;

/// Default reader-admission capacity.
pub const DEFAULT_ADMISSION_CAPACITY: u32 = 2;

/// Default writer-exclusion capacity.
pub const DEFAULT_WRITER_EXCLUSION_CAPACITY: u32 = 1;

/// Capacity of the mutex guarding `read_count`. Not configurable.
pub const READ_COUNT_MUTEX_CAPACITY: u32 = 1;

/// Default scheduler tick bound.
pub const DEFAULT_MAX_TICKS: u64 = 100_000;

/// Upper limit on the number of simulated processes.
pub const MAX_PROCESSES: u32 = 64;

/// Upper limit on any primitive capacity.
pub const MAX_CAPACITY: u32 = 64;

/// Upper limit on the configurable tick bound.
pub const MAX_TICKS_LIMIT: u64 = 100_000_000;

/// Upper limit on runs in a single batch.
pub const MAX_BATCH_RUNS: u32 = 1_000_000;

/// Most readers allowed in the critical section at once.
pub const MAX_CONCURRENT_READERS: u32 = 2;

/// Most writers allowed in the critical section at once.
pub const MAX_CONCURRENT_WRITERS: u32 = 1;

/// Most events a recorded trace keeps.
pub const MAX_TRACE_EVENTS: usize = 1_000_000;

/// Most violations a trace keeps, recording or not.
pub const MAX_RECORDED_VIOLATIONS: usize = 10_000;

/// Environment variable consulted for a test seed when none is configured.
pub const TEST_SEED_ENV: &str = "RWSIM_TEST_SEED";
