//! Global particle statistics.
//!
//! The producer reduces particle count, total momentum, kinetic energy and
//! maximum speed over a list of particle vectors every N steps and sends
//! the sample. The consumer appends one CSV row per sample to a file, or
//! logs it when no file was given.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tandem_channel::codec::{
    ensure_consumed, read_f64_le, read_u64_le, read_vec3_f64, write_f64_le, write_u64_le,
    write_vec3_f64,
};
use tandem_core::{Cadence, PluginError};
use tandem_plugin::{
    PluginArgs, PluginKind, PostprocessContext, PostprocessPlugin, SetupContext,
    SimulationContext, SimulationPlugin,
};

/// Arguments shared by both halves.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsArgs {
    /// Sampling cadence.
    pub cadence: Cadence,
    /// Particle vectors to reduce over.
    pub vectors: Vec<String>,
    /// CSV output file. Samples are logged instead when absent.
    pub path: Option<PathBuf>,
}

/// One reduced sample.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsSample {
    /// Step the sample was taken on.
    pub step: u64,
    /// Simulation time.
    pub time: f64,
    /// Number of particles reduced over.
    pub particles: u64,
    /// Total momentum.
    pub momentum: [f64; 3],
    /// Total kinetic energy.
    pub kinetic_energy: f64,
    /// Largest particle speed.
    pub max_speed: f64,
    /// Wall-clock milliseconds per step since the previous sample.
    pub ms_per_step: f64,
}

impl StatsSample {
    /// Temperature in energy units, `2E / 3N`.
    pub fn temperature(&self) -> f64 {
        if self.particles == 0 {
            0.0
        } else {
            2.0 * self.kinetic_energy / (3.0 * self.particles as f64)
        }
    }

    fn encode(&self) -> Result<Vec<u8>, PluginError> {
        let mut buf = Vec::with_capacity(80);
        write_u64_le(&mut buf, self.step)?;
        write_f64_le(&mut buf, self.time)?;
        write_u64_le(&mut buf, self.particles)?;
        write_vec3_f64(&mut buf, self.momentum)?;
        write_f64_le(&mut buf, self.kinetic_energy)?;
        write_f64_le(&mut buf, self.max_speed)?;
        write_f64_le(&mut buf, self.ms_per_step)?;
        Ok(buf)
    }

    fn decode(payload: &[u8]) -> Result<Self, PluginError> {
        let mut r = payload;
        let sample = Self {
            step: read_u64_le(&mut r)?,
            time: read_f64_le(&mut r)?,
            particles: read_u64_le(&mut r)?,
            momentum: read_vec3_f64(&mut r)?,
            kinetic_energy: read_f64_le(&mut r)?,
            max_speed: read_f64_le(&mut r)?,
            ms_per_step: read_f64_le(&mut r)?,
        };
        ensure_consumed(r)?;
        Ok(sample)
    }
}

const CSV_HEADER: &str =
    "step,time,particles,momentum_x,momentum_y,momentum_z,kinetic_energy,temperature,max_speed,ms_per_step";

/// Producer half.
pub struct StatsProducer {
    name: String,
    cadence: Cadence,
    vectors: Vec<String>,
    last_sample: Option<(u64, Instant)>,
}

impl SimulationPlugin for StatsProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
        let step = ctx.step();
        if !self.cadence.is_due(step) {
            return Ok(());
        }

        let mut particles = 0u64;
        let mut momentum = [0.0f64; 3];
        let mut kinetic_energy = 0.0f64;
        let mut max_speed = 0.0f64;
        for vector in &self.vectors {
            let pv = ctx.particles(vector)?;
            let mass = f64::from(pv.mass);
            for v in &pv.velocities {
                let v = v.map(f64::from);
                let speed2 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
                for (p, vd) in momentum.iter_mut().zip(v) {
                    *p += mass * vd;
                }
                kinetic_energy += 0.5 * mass * speed2;
                max_speed = max_speed.max(speed2.sqrt());
            }
            particles += pv.len() as u64;
        }

        let now = Instant::now();
        let ms_per_step = match self.last_sample {
            Some((prev_step, prev)) if step.0 > prev_step => {
                now.duration_since(prev).as_secs_f64() * 1e3 / (step.0 - prev_step) as f64
            }
            _ => 0.0,
        };
        self.last_sample = Some((step.0, now));

        let sample = StatsSample {
            step: step.0,
            time: ctx.state()?.time(),
            particles,
            momentum,
            kinetic_energy,
            max_speed,
            ms_per_step,
        };
        ctx.send(sample.encode()?)
    }
}

/// Consumer half.
pub struct StatsConsumer {
    name: String,
    cadence: Cadence,
    path: Option<PathBuf>,
    out: Option<BufWriter<File>>,
}

impl StatsConsumer {
    fn write_row(out: &mut BufWriter<File>, s: &StatsSample) -> std::io::Result<()> {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            s.step,
            s.time,
            s.particles,
            s.momentum[0],
            s.momentum[1],
            s.momentum[2],
            s.kinetic_energy,
            s.temperature(),
            s.max_speed,
            s.ms_per_step
        )
    }
}

impl PostprocessPlugin for StatsConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, _ctx: &SetupContext) -> Result<(), PluginError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{CSV_HEADER}")?;
        self.out = Some(out);
        Ok(())
    }

    fn step(&mut self, ctx: &mut PostprocessContext<'_>) -> Result<(), PluginError> {
        if !self.cadence.is_due(ctx.step()) {
            return Ok(());
        }
        let sample = StatsSample::decode(&ctx.receive_current()?)?;
        match &mut self.out {
            Some(out) => Self::write_row(out, &sample)?,
            None => tracing::info!(
                plugin = %self.name,
                step = sample.step,
                time = sample.time,
                particles = sample.particles,
                momentum = ?sample.momentum,
                temperature = sample.temperature(),
                max_speed = sample.max_speed,
                ms_per_step = sample.ms_per_step,
                "stats"
            ),
        }
        Ok(())
    }

    fn checkpoint(&mut self, _folder: &Path, _id: u64) -> Result<(), PluginError> {
        if let Some(out) = &mut self.out {
            out.flush()?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), PluginError> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

/// The `stats` plugin kind.
pub struct Stats;

impl PluginKind for Stats {
    const KIND: &'static str = "stats";
    type Args = StatsArgs;

    fn parse_args(args: &PluginArgs) -> Result<StatsArgs, PluginError> {
        let vectors = args.str_list("vectors")?;
        if vectors.is_empty() {
            return Err(PluginError::InvalidArgument {
                reason: "argument 'vectors' must name at least one particle vector".into(),
            });
        }
        Ok(StatsArgs {
            cadence: args.cadence("every")?,
            vectors,
            path: args.opt_str("path")?.map(PathBuf::from),
        })
    }

    fn producer(
        name: &str,
        args: &StatsArgs,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
        Ok(Some(Box::new(StatsProducer {
            name: name.to_string(),
            cadence: args.cadence,
            vectors: args.vectors.clone(),
            last_sample: None,
        })))
    }

    fn consumer(
        name: &str,
        args: &StatsArgs,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
        Ok(Some(Box::new(StatsConsumer {
            name: name.to_string(),
            cadence: args.cadence,
            path: args.path.clone(),
            out: None,
        })))
    }
}
