//! Coordinator lifecycle states.

use std::fmt;

/// Where a coordinator is in its one-way lifecycle.
///
/// `Uninitialized → Active → Finalized`; there is no way back out of
/// `Finalized`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Not yet activated.
    Uninitialized,
    /// Accepting registrations and steps.
    Active,
    /// Torn down; every further call fails.
    Finalized,
}

impl LifecycleState {
    /// Lower-case name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
