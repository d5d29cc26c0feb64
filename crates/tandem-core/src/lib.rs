//! Core types for the Tandem coordination layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other Tandem crate: rank roles and the
//! rank partition they are derived from, inert-or-live object handles,
//! plugin cadence, identifiers, and the error types of each subsystem.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cadence;
pub mod error;
pub mod handle;
pub mod id;
pub mod lifecycle;
pub mod role;

pub use cadence::Cadence;
pub use error::{ChannelError, CoordinatorError, LayoutError, PluginError, PluginHook};
pub use handle::Handle;
pub use id::{PluginTag, StepIndex};
pub use lifecycle::LifecycleState;
pub use role::{PartitionMode, RankLayout, RankPosition, Role};
