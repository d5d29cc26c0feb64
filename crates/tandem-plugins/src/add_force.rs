//! Constant body force on one particle vector.
//!
//! Compute-only: the producer needs no consumer, so the kind builds
//! nothing on postprocess ranks and stays active in runs without them.

use tandem_core::PluginError;
use tandem_plugin::{
    PluginArgs, PluginKind, PostprocessPlugin, SimulationContext, SimulationPlugin,
};

/// Arguments for [`AddForce`].
#[derive(Clone, Debug, PartialEq)]
pub struct AddForceArgs {
    /// Particle vector to push.
    pub vector: String,
    /// Force added to every particle each step.
    pub force: [f32; 3],
}

/// Producer half.
pub struct AddForceProducer {
    name: String,
    args: AddForceArgs,
}

impl SimulationPlugin for AddForceProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn needs_postprocess(&self) -> bool {
        false
    }

    fn step(&mut self, ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
        let force = self.args.force;
        let pv = ctx.particles_mut(&self.args.vector)?;
        for f in &mut pv.forces {
            for (fd, add) in f.iter_mut().zip(force) {
                *fd += add;
            }
        }
        Ok(())
    }
}

/// The `add_force` plugin kind.
pub struct AddForce;

impl PluginKind for AddForce {
    const KIND: &'static str = "add_force";
    type Args = AddForceArgs;

    fn parse_args(args: &PluginArgs) -> Result<AddForceArgs, PluginError> {
        let [x, y, z] = args.vec3("force")?;
        Ok(AddForceArgs {
            vector: args.str("vector")?.to_string(),
            force: [x as f32, y as f32, z as f32],
        })
    }

    fn producer(
        name: &str,
        args: &AddForceArgs,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
        Ok(Some(Box::new(AddForceProducer {
            name: name.to_string(),
            args: args.clone(),
        })))
    }

    fn consumer(
        _name: &str,
        _args: &AddForceArgs,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
        Ok(None)
    }
}
