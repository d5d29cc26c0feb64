//! Dispatch of created plugin pairs to the coordinator's lists.

use tandem_core::{CoordinatorError, PluginTag, Role};
use tandem_plugin::{PluginPair, PluginSlot};

use crate::coordinator::{Coordinator, Registration};

/// What happened to a routed pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The carried half was registered.
    Registered {
        /// Tag allocated to the pair.
        tag: PluginTag,
        /// Which list it joined.
        role: Role,
    },
    /// A producer was dropped because postprocessing is disabled.
    Skipped {
        /// Tag allocated to the pair.
        tag: PluginTag,
    },
    /// Both halves were null; nothing was registered.
    Empty {
        /// Tag allocated to the pair.
        tag: PluginTag,
    },
}

impl RouteOutcome {
    /// The tag allocated to the pair.
    pub fn tag(&self) -> PluginTag {
        match *self {
            Self::Registered { tag, .. } | Self::Skipped { tag } | Self::Empty { tag } => tag,
        }
    }
}

/// Register whichever half `pair` carries with `coordinator`.
///
/// Every call consumes exactly one tag on success, including fully-null
/// pairs, so tags line up across ranks running the same setup code.
///
/// # Errors
///
/// Whatever the matching registration method returns. A fully-null pair
/// fails only if its name was already created or the coordinator is not
/// Active.
pub fn route(
    coordinator: &mut Coordinator,
    pair: PluginPair,
) -> Result<RouteOutcome, CoordinatorError> {
    let name = pair.name().to_string();
    let outcome = match pair.into_slot() {
        PluginSlot::Producer(p) => match coordinator.register_compute_plugin(p)? {
            Registration::Registered(tag) => RouteOutcome::Registered {
                tag,
                role: Role::Compute,
            },
            Registration::Skipped(tag) => RouteOutcome::Skipped { tag },
        },
        PluginSlot::Consumer(c) => match coordinator.register_postprocess_plugin(c)? {
            Registration::Registered(tag) => RouteOutcome::Registered {
                tag,
                role: Role::Postprocess,
            },
            Registration::Skipped(tag) => RouteOutcome::Skipped { tag },
        },
        PluginSlot::Empty => {
            let tag = coordinator.reserve_empty(&name)?;
            tracing::debug!(
                role = %coordinator.role(),
                plugin = %name,
                tag = tag.0,
                "null pair routed"
            );
            RouteOutcome::Empty { tag }
        }
    };
    Ok(outcome)
}
