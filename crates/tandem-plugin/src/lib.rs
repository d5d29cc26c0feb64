//! Plugin traits, pairs and the role-aware plugin factory for Tandem.
//!
//! A plugin kind ([`PluginKind`]) knows how to build a producer half
//! ([`SimulationPlugin`]) for compute ranks and a consumer half
//! ([`PostprocessPlugin`]) for postprocess ranks. [`create`] builds only
//! the half for the caller's role and wraps it in a [`PluginPair`].
//! [`PluginRegistry`] maps kind names to builders so plugins can be
//! declared in configuration as [`PluginSpec`]s.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod args;
pub mod context;
pub mod factory;
pub mod pair;
pub mod plugin;
pub mod registry;
pub mod state;

pub use args::{ArgValue, PluginArgs, PluginSpec};
pub use context::{PostprocessContext, SetupContext, SimulationContext};
pub use factory::{create, PluginKind};
pub use pair::{PluginPair, PluginSlot};
pub use plugin::{PostprocessPlugin, SimulationPlugin};
pub use registry::{PluginBuilder, PluginRegistry};
pub use state::{MeshTopology, ParticleData, SimulationState};
