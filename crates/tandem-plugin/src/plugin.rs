//! The two plugin half traits.
//!
//! A plugin is a named behavior split into a producer half, which runs on
//! compute ranks and samples simulation state, and a consumer half, which
//! runs on postprocess ranks and reduces or writes what the producer
//! sent. Each rank only ever builds the half matching its role.

use std::path::Path;

use tandem_core::PluginError;

use crate::context::{PostprocessContext, SetupContext, SimulationContext};

/// Producer half, run on compute ranks.
///
/// # Contract
///
/// - `name()` is fixed for the plugin's lifetime and equals the name the
///   plugin was created under.
/// - `setup()` runs once, before the first `step()`.
/// - `step()` is called on every coordinator step; the plugin applies its
///   own cadence.
/// - `finalize()` runs once at teardown. If the coordinator is finalized
///   before its first step, `setup()` never ran; `finalize()` (and any
///   `checkpoint()`) must cope with that.
pub trait SimulationPlugin: Send {
    /// Plugin name, unique within the compute-side list.
    fn name(&self) -> &str;

    /// Whether this producer has a consumer half to talk to.
    ///
    /// Producers that only act on simulation state (e.g. adding forces)
    /// return `false` and stay registered in runs without postprocess
    /// ranks.
    ///
    /// Default: `true`.
    fn needs_postprocess(&self) -> bool {
        true
    }

    /// One-time setup before the first step.
    fn setup(&mut self, _ctx: &SetupContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Per-step hook.
    fn step(&mut self, ctx: &mut SimulationContext<'_>) -> Result<(), PluginError>;

    /// Persist plugin state into `folder` under checkpoint `id`.
    fn checkpoint(&mut self, _folder: &Path, _id: u64) -> Result<(), PluginError> {
        Ok(())
    }

    /// Teardown hook. May run without a preceding `setup()`.
    fn finalize(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Consumer half, run on postprocess ranks.
///
/// Same lifecycle as [`SimulationPlugin`]. `step()` is called once per
/// coordinator step with no simulation state; consumers receive from
/// their channel on the steps their cadence marks as due.
pub trait PostprocessPlugin: Send {
    /// Plugin name, unique within the postprocess-side list.
    fn name(&self) -> &str;

    /// One-time setup before the first step.
    fn setup(&mut self, _ctx: &SetupContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Per-step hook.
    fn step(&mut self, ctx: &mut PostprocessContext<'_>) -> Result<(), PluginError>;

    /// Persist plugin state into `folder` under checkpoint `id`.
    fn checkpoint(&mut self, _folder: &Path, _id: u64) -> Result<(), PluginError> {
        Ok(())
    }

    /// Teardown hook. May run without a preceding `setup()`.
    fn finalize(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}
