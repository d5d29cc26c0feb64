//! Per-process coordination of role-partitioned Tandem plugins.
//!
//! Every rank runs the same setup code. The [`Coordinator`] knows which
//! role its rank plays and keeps only the plugin halves that belong there:
//! producers on compute ranks, consumers on postprocess ranks. Engine
//! objects that exist only on compute ranks are built through
//! [`GuardedConstructor`]s, which hand out Null handles elsewhere.
//!
//! # Architecture
//!
//! - [`Coordinator`] owns the role-local plugin lists and drives hooks
//! - [`route`] dispatches a created [`PluginPair`](tandem_plugin::PluginPair)
//!   to the matching list and allocates its tag
//! - [`ActivationSlot`] enforces one active coordinator per scope
//! - [`RunConfig`] loads the rank grid and plugin declarations from TOML

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod guarded;
pub mod metrics;
pub mod router;
pub mod slot;

pub use config::{CheckpointConfig, ConfigError, RunConfig};
pub use coordinator::{Coordinator, Registration};
pub use guarded::{GuardedConstructor, ObjectKind};
pub use metrics::StepMetrics;
pub use router::{route, RouteOutcome};
pub use slot::ActivationSlot;
