//! Reference plugin kinds for Tandem.
//!
//! | Kind | Producer (compute) | Consumer (postprocess) |
//! |------|--------------------|------------------------|
//! | [`Stats`] | reduces momentum, energy, max speed | CSV rows or log lines |
//! | [`DumpXyz`] | sends particle positions | `<name>_<stamp>.xyz` files |
//! | [`DumpMesh`] | sends mesh vertices and triangles | `<name>_<stamp>.ply` files |
//! | [`AddForce`] | adds a constant force | none |

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod add_force;
pub mod dump_mesh;
pub mod dump_xyz;
pub mod stats;

pub use add_force::{AddForce, AddForceArgs};
pub use dump_mesh::{DumpMesh, DumpMeshArgs};
pub use dump_xyz::{DumpXyz, DumpXyzArgs};
pub use stats::{Stats, StatsArgs, StatsSample};

use tandem_plugin::PluginRegistry;

/// A registry with every kind in this crate.
pub fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register::<Stats>()
        .register::<DumpXyz>()
        .register::<DumpMesh>()
        .register::<AddForce>();
    registry
}
