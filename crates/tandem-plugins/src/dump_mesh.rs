//! Membrane mesh dumps in ASCII PLY format.
//!
//! Every object of an object vector shares one triangle topology; the
//! dump writes all objects into one file, offsetting each object's
//! triangle indices by its first vertex.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tandem_channel::codec::{
    ensure_consumed, read_f64_le, read_triangle_list, read_u32_le, read_vec3_list, write_f64_le,
    write_triangle_list, write_u32_le, write_vec3_list,
};
use tandem_core::{Cadence, PluginError};
use tandem_plugin::{
    PluginArgs, PluginKind, PostprocessContext, PostprocessPlugin, SetupContext,
    SimulationContext, SimulationPlugin,
};

/// Arguments shared by both halves.
#[derive(Clone, Debug, PartialEq)]
pub struct DumpMeshArgs {
    /// Dump cadence.
    pub cadence: Cadence,
    /// Object vector to dump.
    pub vector: String,
    /// Output folder.
    pub path: PathBuf,
}

/// A decoded mesh frame.
#[derive(Clone, Debug, PartialEq)]
struct MeshFrame {
    time: f64,
    vertices_per_object: u32,
    triangles: Vec<[u32; 3]>,
    vertices: Vec<[f32; 3]>,
}

impl MeshFrame {
    fn decode(payload: &[u8]) -> Result<Self, PluginError> {
        let mut r = payload;
        let frame = Self {
            time: read_f64_le(&mut r)?,
            vertices_per_object: read_u32_le(&mut r)?,
            triangles: read_triangle_list(&mut r)?,
            vertices: read_vec3_list(&mut r)?,
        };
        ensure_consumed(r)?;
        if frame.vertices_per_object == 0
            || frame.vertices.len() % frame.vertices_per_object as usize != 0
        {
            return Err(PluginError::ExecutionFailed {
                reason: format!(
                    "{} vertices do not split into objects of {}",
                    frame.vertices.len(),
                    frame.vertices_per_object
                ),
            });
        }
        Ok(frame)
    }

    fn objects(&self) -> usize {
        self.vertices.len() / self.vertices_per_object as usize
    }

    fn write_ply(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let faces = self.objects() * self.triangles.len();
        writeln!(out, "ply")?;
        writeln!(out, "format ascii 1.0")?;
        writeln!(out, "comment time {}", self.time)?;
        writeln!(out, "element vertex {}", self.vertices.len())?;
        writeln!(out, "property float x")?;
        writeln!(out, "property float y")?;
        writeln!(out, "property float z")?;
        writeln!(out, "element face {faces}")?;
        writeln!(out, "property list uchar int vertex_index")?;
        writeln!(out, "end_header")?;
        for [x, y, z] in &self.vertices {
            writeln!(out, "{x} {y} {z}")?;
        }
        for object in 0..self.objects() {
            let offset = object as u64 * u64::from(self.vertices_per_object);
            for [a, b, c] in &self.triangles {
                writeln!(
                    out,
                    "3 {} {} {}",
                    offset + u64::from(*a),
                    offset + u64::from(*b),
                    offset + u64::from(*c)
                )?;
            }
        }
        Ok(())
    }
}

/// Producer half: sends mesh topology and vertex positions on due steps.
pub struct DumpMeshProducer {
    name: String,
    args: DumpMeshArgs,
}

impl SimulationPlugin for DumpMeshProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, ctx: &mut SimulationContext<'_>) -> Result<(), PluginError> {
        if !self.args.cadence.is_due(ctx.step()) {
            return Ok(());
        }
        let time = ctx.state()?.time();
        let mesh = ctx.mesh(&self.args.vector)?;
        let ov = ctx.particles(&self.args.vector)?;
        let mut buf = Vec::new();
        write_f64_le(&mut buf, time)?;
        write_u32_le(&mut buf, mesh.vertices_per_object)?;
        write_triangle_list(&mut buf, &mesh.triangles)?;
        write_vec3_list(&mut buf, &ov.positions)?;
        ctx.send(buf)
    }
}

/// Consumer half: writes `<path>/<name>_<stamp>.ply`.
pub struct DumpMeshConsumer {
    name: String,
    args: DumpMeshArgs,
}

impl PostprocessPlugin for DumpMeshConsumer {
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
        let frame = MeshFrame::decode(&ctx.receive_current()?)?;
        let stamp = self.args.cadence.time_stamp(step);
        let file = self.args.path.join(format!("{}_{stamp:05}.ply", self.name));
        let mut out = BufWriter::new(File::create(&file)?);
        frame.write_ply(&mut out)?;
        out.flush()?;
        tracing::debug!(
            plugin = %self.name,
            file = %file.display(),
            objects = frame.objects(),
            "mesh dump written"
        );
        Ok(())
    }
}

/// The `dump_mesh` plugin kind.
pub struct DumpMesh;

impl PluginKind for DumpMesh {
    const KIND: &'static str = "dump_mesh";
    type Args = DumpMeshArgs;

    fn parse_args(args: &PluginArgs) -> Result<DumpMeshArgs, PluginError> {
        Ok(DumpMeshArgs {
            cadence: args.cadence("every")?,
            vector: args.str("vector")?.to_string(),
            path: PathBuf::from(args.str("path")?),
        })
    }

    fn producer(
        name: &str,
        args: &DumpMeshArgs,
    ) -> Result<Option<Box<dyn SimulationPlugin>>, PluginError> {
        Ok(Some(Box::new(DumpMeshProducer {
            name: name.to_string(),
            args: args.clone(),
        })))
    }

    fn consumer(
        name: &str,
        args: &DumpMeshArgs,
    ) -> Result<Option<Box<dyn PostprocessPlugin>>, PluginError> {
        Ok(Some(Box::new(DumpMeshConsumer {
            name: name.to_string(),
            args: args.clone(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_are_offset_per_object() {
        let frame = MeshFrame {
            time: 1.0,
            vertices_per_object: 3,
            triangles: vec![[0, 1, 2]],
            vertices: vec![[0.0; 3]; 6],
        };
        let mut out = Vec::new();
        frame.write_ply(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("element vertex 6"));
        assert!(text.contains("element face 2"));
        assert!(text.lines().any(|l| l == "3 0 1 2"));
        assert!(text.lines().any(|l| l == "3 3 4 5"));
    }

    #[test]
    fn ragged_vertex_count_rejected() {
        let mut buf = Vec::new();
        write_f64_le(&mut buf, 0.0).unwrap();
        write_u32_le(&mut buf, 4).unwrap();
        write_triangle_list(&mut buf, &[[0, 1, 2]]).unwrap();
        write_vec3_list(&mut buf, &[[0.0; 3]; 5]).unwrap();
        assert!(matches!(
            MeshFrame::decode(&buf),
            Err(PluginError::ExecutionFailed { .. })
        ));
    }
}
