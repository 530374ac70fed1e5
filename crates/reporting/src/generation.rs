//! Cycle generation tokens.

use serde::Serialize;

/// Monotonic identifier of a rollup cycle. Each parameter change issues
/// the next one; only the newest may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Marker for evaluations outside the tracked cycle sequence.
    pub const UNTRACKED: Generation = Generation(0);

    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Whether a cycle issued as `issued` may commit while `latest` is the most
/// recently issued generation.
pub fn is_current(issued: Generation, latest: Generation) -> bool {
    issued != Generation::UNTRACKED && issued == latest
}
