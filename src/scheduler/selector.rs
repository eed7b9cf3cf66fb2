//! Process selection.
//!
//! The scheduler draws from the full process table on every tick, ready or
//! not. A [`Selector`] supplies those draws.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Source of process indices.
pub trait Selector {
    /// Pick an index in `0..process_count`, or `None` when no more draws are
    /// available.
    fn select(&mut self, process_count: usize) -> Option<usize>;
}

/// Uniform random draws from a seeded generator.
///
/// Two selectors built from the same seed produce the same sequence, so a
/// whole run is reproducible from its seed.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    seed: u64,
    rng: StdRng,
}

impl RandomSelector {
    /// Create a selector seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this selector was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Selector for RandomSelector {
    fn select(&mut self, process_count: usize) -> Option<usize> {
        if process_count == 0 {
            return None;
        }
        Some(self.rng.random_range(0..process_count))
    }
}

/// Replays a fixed sequence of indices.
///
/// Used to force a specific interleaving. Returns `None` once the script runs
/// out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSelector {
    script: VecDeque<usize>,
}

impl ScriptedSelector {
    /// Create a selector that replays `script` in order.
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Append more draws.
    pub fn extend(&mut self, more: impl IntoIterator<Item = usize>) {
        self.script.extend(more);
    }

    /// Draws left.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Selector for ScriptedSelector {
    fn select(&mut self, _process_count: usize) -> Option<usize> {
        self.script.pop_front()
    }
}
