//! Tandem: role-partitioned plugin coordination for distributed particle
//! simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tandem sub-crates.
//!
//! A run is split into compute ranks, which advance the simulation, and
//! optionally an equal number of postprocess ranks, each paired with one
//! compute rank. Every rank executes the same setup code; the
//! [`engine::Coordinator`] keeps only the plugin halves and engine objects
//! that belong on its own rank.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use tandem::prelude::*;
//! use tandem::plugins::{AddForce, AddForceArgs};
//!
//! let transport: Arc<dyn Transport> = Arc::new(NullTransport);
//! let mut c =
//!     Coordinator::construct_in(Arc::new(ActivationSlot::new()), Role::Postprocess, transport)
//!         .unwrap();
//!
//! // Compute-only engine objects come back as Null handles here.
//! let pv = c.make(
//!     &GuardedConstructor::new(ObjectKind::ParticleVector, |n: usize| vec![0.0f32; n]),
//!     128,
//! );
//! assert!(pv.is_null());
//!
//! // A forcing plugin has no postprocess half, but still takes a tag.
//! let args = AddForceArgs { vector: "solvent".into(), force: [0.1, 0.0, 0.0] };
//! let outcome = c.add::<AddForce>("push", &args).unwrap();
//! assert!(matches!(outcome, RouteOutcome::Empty { .. }));
//! assert_eq!(c.next_tag(), PluginTag(1));
//!
//! c.finalize().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tandem-core` | Roles, rank layout, IDs, handles, errors |
//! | [`channel`] | `tandem-channel` | Producer→consumer transport and payload codec |
//! | [`plugin`] | `tandem-plugin` | Plugin traits, contexts, pairs, kinds, registry |
//! | [`plugins`] | `tandem-plugins` | Reference plugin kinds |
//! | [`engine`] | `tandem-engine` | Coordinator, routing, guarded construction, config |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs, and errors (`tandem-core`).
///
/// Contains [`types::Role`], the [`types::RankLayout`] partition, and the
/// error enums shared by every other crate.
pub use tandem_core as types;

/// Transport between paired ranks (`tandem-channel`).
///
/// [`channel::LocalTransport`] connects ranks emulated as threads in one
/// process; the [`channel::codec`] helpers encode payloads.
pub use tandem_channel as channel;

/// Plugin traits and creation (`tandem-plugin`).
pub use tandem_plugin as plugin;

/// Reference plugin kinds (`tandem-plugins`).
///
/// [`plugins::builtin_registry`] returns a registry with all of them.
pub use tandem_plugins as plugins;

/// Per-rank coordination (`tandem-engine`).
pub use tandem_engine as engine;

/// Common imports for typical Tandem usage.
///
/// ```rust
/// use tandem::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tandem_core::{
        Cadence, Handle, LifecycleState, PartitionMode, PluginTag, RankLayout, RankPosition,
        Role, StepIndex,
    };

    // Errors
    pub use tandem_core::{ChannelError, CoordinatorError, LayoutError, PluginError};

    // Transport
    pub use tandem_channel::{LocalTransport, NullTransport, Transport};

    // Plugins
    pub use tandem_plugin::{
        PluginArgs, PluginKind, PluginPair, PluginRegistry, PluginSpec, PostprocessContext,
        PostprocessPlugin, SetupContext, SimulationContext, SimulationPlugin, SimulationState,
    };

    // Engine
    pub use tandem_engine::{
        ActivationSlot, Coordinator, GuardedConstructor, ObjectKind, RouteOutcome, RunConfig,
        StepMetrics,
    };
}
