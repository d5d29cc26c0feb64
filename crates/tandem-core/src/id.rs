//! Strongly-typed identifiers.

use std::fmt;

/// Index of a simulation step as seen by the coordinator.
///
/// The first `step_all()` call runs step 0. Every rank counts steps the
/// same way, which is what lets producers and consumers agree on their
/// cadence without talking to each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepIndex(pub u64);

impl StepIndex {
    /// The step after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepIndex {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Sequence number of a routed plugin pair.
///
/// Allocated by the coordinator for every pair handed to the router,
/// including fully-null pairs, so the n-th pair in the setup code carries
/// tag n on every rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginTag(pub u32);

impl fmt::Display for PluginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PluginTag {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
