//! "Every N steps" scheduling shared by both halves of a plugin.

use std::fmt;

use crate::id::StepIndex;

/// How often a plugin acts.
///
/// Producer and consumer halves are built from the same cadence value and
/// both see the same step indices, so each side can tell on its own which
/// steps carry a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cadence {
    every: u64,
}

impl Cadence {
    /// Act on every step.
    pub const EVERY_STEP: Cadence = Cadence { every: 1 };

    /// Act on steps that are multiples of `every`.
    ///
    /// Returns `None` for zero, which would never fire.
    pub fn every(every: u64) -> Option<Self> {
        (every > 0).then_some(Self { every })
    }

    /// The period in steps.
    pub fn period(&self) -> u64 {
        self.every
    }

    /// Whether the plugin acts on `step`.
    pub fn is_due(&self, step: StepIndex) -> bool {
        step.0 % self.every == 0
    }

    /// Sequence number of the sample taken at `step`, used for dump file names.
    pub fn time_stamp(&self, step: StepIndex) -> u64 {
        step.0 / self.every
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {} steps", self.every)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_rejected() {
        assert!(Cadence::every(0).is_none());
    }

    #[test]
    fn due_on_multiples_including_zero() {
        let c = Cadence::every(3).unwrap();
        let due: Vec<u64> = (0..10).filter(|&s| c.is_due(StepIndex(s))).collect();
        assert_eq!(due, vec![0, 3, 6, 9]);
    }

    #[test]
    fn time_stamp_counts_samples() {
        let c = Cadence::every(5).unwrap();
        assert_eq!(c.time_stamp(StepIndex(0)), 0);
        assert_eq!(c.time_stamp(StepIndex(10)), 2);
        assert_eq!(c.time_stamp(StepIndex(14)), 2);
    }

    #[test]
    fn every_step_always_due() {
        assert!((0..4).all(|s| Cadence::EVERY_STEP.is_due(StepIndex(s))));
    }
}
