//! Per-hook contexts handed to plugin halves by the coordinator.

use tandem_channel::{Frame, Transport};
use tandem_core::{PluginError, PluginTag, Role, StepIndex};

use crate::state::{MeshTopology, ParticleData, SimulationState};

/// Context for the one-time `setup` hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetupContext {
    tag: PluginTag,
    role: Role,
}

impl SetupContext {
    /// Create a setup context.
    pub fn new(tag: PluginTag, role: Role) -> Self {
        Self { tag, role }
    }

    /// Tag the plugin was registered under. Equal on both ranks of a pair.
    pub fn tag(&self) -> PluginTag {
        self.tag
    }

    /// Role of the rank running the hook.
    pub fn role(&self) -> Role {
        self.role
    }
}

/// Context for a producer's `step` hook.
///
/// Carries the engine state (absent only if the caller stepped a compute
/// coordinator without it) and the outgoing end of the plugin's channel.
pub struct SimulationContext<'a> {
    step: StepIndex,
    state: Option<&'a mut dyn SimulationState>,
    transport: &'a dyn Transport,
    channel: &'a str,
}

impl<'a> SimulationContext<'a> {
    /// Create a context for one hook invocation.
    pub fn new(
        step: StepIndex,
        state: Option<&'a mut dyn SimulationState>,
        transport: &'a dyn Transport,
        channel: &'a str,
    ) -> Self {
        Self {
            step,
            state,
            transport,
            channel,
        }
    }

    /// The current coordinator step.
    pub fn step(&self) -> StepIndex {
        self.step
    }

    /// Channel this plugin sends on (its name).
    pub fn channel(&self) -> &str {
        self.channel
    }

    /// Engine state.
    ///
    /// # Errors
    ///
    /// [`PluginError::MissingState`] if the coordinator was stepped
    /// without state.
    pub fn state(&self) -> Result<&(dyn SimulationState + 'a), PluginError> {
        self.state.as_deref().ok_or_else(missing_state)
    }

    /// Mutable engine state.
    ///
    /// # Errors
    ///
    /// [`PluginError::MissingState`] if the coordinator was stepped
    /// without state.
    pub fn state_mut(&mut self) -> Result<&mut (dyn SimulationState + 'a), PluginError> {
        self.state.as_deref_mut().ok_or_else(missing_state)
    }

    /// Particle arrays of the named vector.
    pub fn particles(&self, name: &str) -> Result<&ParticleData, PluginError> {
        self.state()?
            .particles(name)
            .ok_or_else(|| PluginError::MissingState {
                what: format!("particle vector '{name}'"),
            })
    }

    /// Mutable particle arrays of the named vector.
    pub fn particles_mut(&mut self, name: &str) -> Result<&mut ParticleData, PluginError> {
        self.state_mut()?
            .particles_mut(name)
            .ok_or_else(|| PluginError::MissingState {
                what: format!("particle vector '{name}'"),
            })
    }

    /// Mesh of the named object vector.
    pub fn mesh(&self, name: &str) -> Result<&MeshTopology, PluginError> {
        self.state()?
            .mesh(name)
            .ok_or_else(|| PluginError::MissingState {
                what: format!("mesh of object vector '{name}'"),
            })
    }

    /// Send `payload` to the consumer half, stamped with the current step.
    pub fn send(&self, payload: Vec<u8>) -> Result<(), PluginError> {
        self.transport.send(self.channel, self.step, payload)?;
        Ok(())
    }
}

fn missing_state() -> PluginError {
    PluginError::MissingState {
        what: "simulation state".into(),
    }
}

/// Context for a consumer's `step` hook.
pub struct PostprocessContext<'a> {
    step: StepIndex,
    transport: &'a dyn Transport,
    channel: &'a str,
}

impl<'a> PostprocessContext<'a> {
    /// Create a context for one hook invocation.
    pub fn new(step: StepIndex, transport: &'a dyn Transport, channel: &'a str) -> Self {
        Self {
            step,
            transport,
            channel,
        }
    }

    /// The current coordinator step.
    pub fn step(&self) -> StepIndex {
        self.step
    }

    /// Channel this plugin receives on (its name).
    pub fn channel(&self) -> &str {
        self.channel
    }

    /// Block for the next frame on this plugin's channel.
    pub fn receive(&self) -> Result<Frame, PluginError> {
        Ok(self.transport.receive(self.channel)?)
    }

    /// Receive the frame the producer sent on this same step.
    ///
    /// # Errors
    ///
    /// [`PluginError::OutOfOrder`] if the next frame carries another step,
    /// which means the two halves disagree on cadence.
    pub fn receive_current(&self) -> Result<Vec<u8>, PluginError> {
        let frame = self.receive()?;
        if frame.step != self.step {
            return Err(PluginError::OutOfOrder {
                channel: self.channel.to_string(),
                expected: self.step,
                received: frame.step,
            });
        }
        Ok(frame.payload)
    }
}
