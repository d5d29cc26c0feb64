//! Role-filtered plugin pairs.

use std::fmt;

use tandem_core::Role;

use crate::plugin::{PostprocessPlugin, SimulationPlugin};

/// The half a pair actually carries.
pub enum PluginSlot {
    /// A producer half, for a compute rank.
    Producer(Box<dyn SimulationPlugin>),
    /// A consumer half, for a postprocess rank.
    Consumer(Box<dyn PostprocessPlugin>),
    /// Neither: the kind has no behavior on this role.
    Empty,
}

/// Result of creating a plugin on one rank: producer half, consumer half,
/// or nothing.
///
/// Never carries both halves; a single slot makes that unrepresentable.
pub struct PluginPair {
    name: String,
    kind: &'static str,
    slot: PluginSlot,
}

impl PluginPair {
    /// A pair carrying only a producer half.
    pub fn producer(kind: &'static str, plugin: Box<dyn SimulationPlugin>) -> Self {
        Self {
            name: plugin.name().to_string(),
            kind,
            slot: PluginSlot::Producer(plugin),
        }
    }

    /// A pair carrying only a consumer half.
    pub fn consumer(kind: &'static str, plugin: Box<dyn PostprocessPlugin>) -> Self {
        Self {
            name: plugin.name().to_string(),
            kind,
            slot: PluginSlot::Consumer(plugin),
        }
    }

    /// A fully-null pair.
    pub fn empty(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            slot: PluginSlot::Empty,
        }
    }

    /// Plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind the pair was created from.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Role of the half carried, if any.
    pub fn role(&self) -> Option<Role> {
        match self.slot {
            PluginSlot::Producer(_) => Some(Role::Compute),
            PluginSlot::Consumer(_) => Some(Role::Postprocess),
            PluginSlot::Empty => None,
        }
    }

    /// Whether a producer half is present.
    pub fn has_producer(&self) -> bool {
        matches!(self.slot, PluginSlot::Producer(_))
    }

    /// Whether a consumer half is present.
    pub fn has_consumer(&self) -> bool {
        matches!(self.slot, PluginSlot::Consumer(_))
    }

    /// Whether both halves are null.
    pub fn is_empty(&self) -> bool {
        matches!(self.slot, PluginSlot::Empty)
    }

    /// Take the carried half.
    pub fn into_slot(self) -> PluginSlot {
        self.slot
    }
}

impl fmt::Debug for PluginPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let half = match self.slot {
            PluginSlot::Producer(_) => "producer",
            PluginSlot::Consumer(_) => "consumer",
            PluginSlot::Empty => "null",
        };
        f.debug_struct("PluginPair")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("half", &half)
            .finish()
    }
}
