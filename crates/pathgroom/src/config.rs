//! Tuning knobs for [`crate::Graph::groom`].

use serde::{Deserialize, Serialize};

/// Configuration for the grooming fixed-point loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroomConfig {
    /// Upper bound on full groom rounds (dedup, simplify, collect).
    /// Every productive round shrinks the graph, so this only trips on
    /// pathological inputs. One round always runs, so `0` behaves like `1`.
    /// Default: 100 000.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for GroomConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

const fn default_max_rounds() -> usize {
    100_000
}
