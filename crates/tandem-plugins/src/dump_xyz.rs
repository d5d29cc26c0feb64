//! Particle position dumps in XYZ format.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tandem_channel::codec::{
    ensure_consumed, read_f64_le, read_vec3_list, write_f64_le, write_vec3_list,
};
use tandem_core::{Cadence, PluginError};
use tandem_plugin::{
    PluginArgs, PluginKind, PostprocessContext, PostprocessPlugin, SetupContext,
    SimulationContext, SimulationPlugin,
};

/// Arguments shared by both halves.
#[derive(Clone, Debug, PartialEq)]
pub struct DumpXyzArgs {
    /// Dump cadence.
    pub cadence: Cadence,
    /// Particle vector to dump.
    pub vector: String,
    /// Output folder.
    pub path: PathBuf,
}

/// Producer half: sends the vector's positions on due steps.
pub struct DumpXyzProducer {
    name: String,
    args: DumpXyzArgs,
}

impl SimulationPlugin for DumpXyzProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
        if !self.args.cadence.is_due(ctx.step()) {
            return Ok(());
        }
        let time = ctx.state()?.time();
        let pv = ctx.particles(&self.args.vector)?;
        let mut buf = Vec::with_capacity(12 + pv.len() * 12);
        write_f64_le(&mut buf, time)?;
        write_vec3_list(&mut buf, &pv.positions)?;
        ctx.send(buf)
    }
}

/// Consumer half: writes `<path>/<name>_<stamp>.xyz`.
pub struct DumpXyzConsumer {
    name: String,
    args: DumpXyzArgs,
}

impl DumpXyzConsumer {
    fn file_name(&self, stamp: u64) -> PathBuf {
        self.args.path.join(format!("{}_{stamp:05}.xyz", self.name))
    }
}

impl PostprocessPlugin for DumpXyzConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, _ctx: &SetupContext) -> Result<(), PluginError> {
        fs::create_dir_all(&self.args.path)?;
        Ok(())
    }

    fn step(&mut self, ctx: &mut PostprocessContext<'_>) -> Result<(), PluginError> {
        let step = ctx.step();
        if !self.args.cadence.is_due(step) {
            return Ok(());
        }
        let payload = ctx.receive_current()?;
        let mut r: &[u8] = &payload;
        let time = read_f64_le(&mut r)?;
        let positions = read_vec3_list(&mut r)?;
        ensure_consumed(r)?;

        let file = self.file_name(self.args.cadence.time_stamp(step));
        let mut out = BufWriter::new(File::create(&file)?);
        writeln!(out, "{}", positions.len())?;
        writeln!(out, "{} step {} time {}", self.args.vector, step, time)?;
        for [x, y, z] in &positions {
            writeln!(out, "P {x} {y} {z}")?;
        }
        out.flush()?;
        tracing::debug!(plugin = %self.name, file = %file.display(), "xyz dump written");
        Ok(())
    }
}

/// The `dump_xyz` plugin kind.
pub struct DumpXyz;

impl PluginKind for DumpXyz {
    const KIND: &'static str = "dump_xyz";
    type Args = DumpXyzArgs;

    fn parse_args(args: &PluginArgs) -> Result<DumpXyzArgs, PluginError> {
        Ok(DumpXyzArgs {
            cadence: args.cadence("every")?,
            vector: args.str("vector")?.to_string(),
            path: PathBuf::from(args.str("path")?),
        })
    }

    fn producer(
        name: &str,
        args: &DumpXyzArgs,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
        Ok(Some(Box::new(DumpXyzProducer {
            name: name.to_string(),
            args: args.clone(),
        })))
    }

    fn consumer(
        name: &str,
        args: &DumpXyzArgs,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
        Ok(Some(Box::new(DumpXyzConsumer {
            name: name.to_string(),
            args: args.clone(),
        })))
    }
}
