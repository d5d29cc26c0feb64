//! Per-step timing collected by the coordinator.

use tandem_core::StepIndex;

/// Timing of one `step_all` call.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// The step that was run.
    pub step: StepIndex,
    /// Wall-clock time for the whole call, including any setup hooks.
    pub total_us: u64,
    /// Time spent in setup hooks run by this call.
    pub setup_us: u64,
    /// Per-plugin step hook times, in registration order: `(name, microseconds)`.
    pub plugin_us: Vec<(String, u64)>,
}
