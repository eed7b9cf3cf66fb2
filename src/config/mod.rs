//! Simulation configuration
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Hardcoded defaults
//! 2. TOML file: explicit path, else `RWSIM_CONFIG`, else `./rwsim.toml`
//! 3. `RWSIM_*` environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! [`SimConfig::validate`] runs once every layer is applied.

pub mod error;

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use rwsim_sync::PrimitiveKind;
use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use tracing::info;
use tracing::warn;

pub use error::ConfigError;
use error::ParseTomlSnafu;
use error::ReadFileSnafu;

use crate::checker::InvariantLimits;
use crate::constants::DEFAULT_ADMISSION_CAPACITY;
use crate::constants::DEFAULT_MAX_TICKS;
use crate::constants::DEFAULT_PROCESS_COUNT;
use crate::constants::DEFAULT_WRITER_EXCLUSION_CAPACITY;
use crate::constants::MAX_CAPACITY;
use crate::constants::MAX_PROCESSES;
use crate::constants::MAX_TICKS_LIMIT;

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "RWSIM_CONFIG";
/// Config file tried when nothing else is specified.
pub const DEFAULT_CONFIG_PATH: &str = "./rwsim.toml";

/// Configuration for one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Name used in logs, reports and seed derivation.
    pub name: String,
    /// Number of processes; the first half are readers, the rest writers.
    pub processes: u32,
    /// Implementation backing all three primitives.
    pub primitive: PrimitiveKind,
    /// Reader-admission capacity.
    pub admission_capacity: u32,
    /// Writer-exclusion capacity.
    pub writer_exclusion_capacity: u32,
    /// Explicit seed. `None` derives one (see `Simulation`).
    pub seed: Option<u64>,
    /// Tick bound before a run is declared non-terminating.
    pub max_ticks: u64,
    /// Keep every trace event, not just violations. Off by default; a kept
    /// trace is capped at `MAX_TRACE_EVENTS`.
    pub record_trace: bool,
    /// Limits the invariant checker enforces.
    pub invariants: InvariantLimits,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "rwsim".to_string(),
            processes: DEFAULT_PROCESS_COUNT,
            primitive: PrimitiveKind::default(),
            admission_capacity: DEFAULT_ADMISSION_CAPACITY,
            writer_exclusion_capacity: DEFAULT_WRITER_EXCLUSION_CAPACITY,
            seed: None,
            max_ticks: DEFAULT_MAX_TICKS,
            record_trace: false,
            invariants: InvariantLimits::default(),
        }
    }
}

impl SimConfig {
    /// Create a default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the process count.
    pub fn with_processes(mut self, processes: u32) -> Self {
        self.processes = processes;
        self
    }

    /// Set the primitive backing all three resources.
    pub fn with_primitive(mut self, primitive: PrimitiveKind) -> Self {
        self.primitive = primitive;
        self
    }

    /// Set the reader-admission and writer-exclusion capacities.
    pub fn with_capacities(mut self, admission: u32, writer_exclusion: u32) -> Self {
        self.admission_capacity = admission;
        self.writer_exclusion_capacity = writer_exclusion;
        self
    }

    /// Fix the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the tick bound.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Keep (or drop) the full event log.
    pub fn with_record_trace(mut self, record_trace: bool) -> Self {
        self.record_trace = record_trace;
        self
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        toml::from_str(&contents).context(ParseTomlSnafu { path })
    }

    /// Load defaults, then a TOML file, then environment overrides.
    ///
    /// The file is `explicit` if given (it must exist), else the path in
    /// `RWSIM_CONFIG`, else `./rwsim.toml` when present.
    pub fn load_with_layers(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::config_path(explicit) {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                Self::from_toml_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            warn!(path = %env_path, "{CONFIG_PATH_ENV} specified but not found");
        }
        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        local.exists().then_some(local)
    }

    /// Apply `RWSIM_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `RWSIM_*` overrides read through `lookup`.
    ///
    /// A set but unparsable value is an error rather than silently ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = parse_override(&lookup, "RWSIM_PROCESSES")? {
            self.processes = v;
        }
        if let Some(v) = parse_override(&lookup, "RWSIM_PRIMITIVE")? {
            self.primitive = v;
        }
        if let Some(v) = parse_override(&lookup, "RWSIM_ADMISSION_CAPACITY")? {
            self.admission_capacity = v;
        }
        if let Some(v) = parse_override(&lookup, "RWSIM_WRITER_CAPACITY")? {
            self.writer_exclusion_capacity = v;
        }
        if let Some(v) = parse_override(&lookup, "RWSIM_SEED")? {
            self.seed = Some(v);
        }
        if let Some(v) = parse_override(&lookup, "RWSIM_MAX_TICKS")? {
            self.max_ticks = v;
        }
        Ok(())
    }

    /// Check bounds. A zero capacity is legal but can never be acquired, so
    /// it only warns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processes == 0 || self.processes > MAX_PROCESSES {
            return Err(ConfigError::invalid(
                "processes",
                self.processes,
                format!("must be between 1 and {MAX_PROCESSES}"),
            ));
        }
        for (key, capacity) in [
            ("admission_capacity", self.admission_capacity),
            ("writer_exclusion_capacity", self.writer_exclusion_capacity),
        ] {
            if capacity > MAX_CAPACITY {
                return Err(ConfigError::invalid(key, capacity, format!("must be at most {MAX_CAPACITY}")));
            }
            if capacity == 0 {
                warn!(key, "capacity is 0; the primitive can never be acquired");
            }
        }
        if self.max_ticks == 0 || self.max_ticks > MAX_TICKS_LIMIT {
            return Err(ConfigError::invalid(
                "max_ticks",
                self.max_ticks,
                format!("must be between 1 and {MAX_TICKS_LIMIT}"),
            ));
        }
        Ok(())
    }
}

fn parse_override<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| ConfigError::invalid(key, &raw, format!("failed to parse: {e}")))
}
