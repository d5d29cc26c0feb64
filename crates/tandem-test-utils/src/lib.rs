//! Test utilities and mock types for Tandem development.
//!
//! Provides a mock implementation of [`SimulationState`] and, in
//! [`fixtures`], plugin halves that record their hook calls, fail on
//! demand, or count constructor invocations.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;

use tandem_plugin::{MeshTopology, ParticleData, SimulationState};

pub use fixtures::{
    CallLog, ComputeOnlyKind, ConstructorCounter, FailingProducer, RecordingConsumer,
    RecordingKind, RecordingProducer,
};

/// Mock implementation of [`SimulationState`].
///
/// Backed by `HashMap`s keyed by vector name. [`advance`](MockState::advance)
/// moves particles with their velocities so samples differ between steps.
pub struct MockState {
    time: f64,
    dt: f64,
    vectors: HashMap<String, ParticleData>,
    meshes: HashMap<String, MeshTopology>,
}

impl MockState {
    pub fn new(dt: f64) -> Self {
        Self {
            time: 0.0,
            dt,
            vectors: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    /// Add a particle vector.
    pub fn with_vector(mut self, name: impl Into<String>, data: ParticleData) -> Self {
        self.vectors.insert(name.into(), data);
        self
    }

    /// Add an object vector with a mesh.
    pub fn with_mesh(
        mut self,
        name: impl Into<String>,
        data: ParticleData,
        mesh: MeshTopology,
    ) -> Self {
        let name = name.into();
        self.vectors.insert(name.clone(), data);
        self.meshes.insert(name, mesh);
        self
    }

    /// Explicit Euler step: apply forces, move particles, clear forces.
    pub fn advance(&mut self) {
        let dt = self.dt as f32;
        for pv in self.vectors.values_mut() {
            let inv_mass = if pv.mass > 0.0 { 1.0 / pv.mass } else { 0.0 };
            for ((x, v), f) in pv
                .positions
                .iter_mut()
                .zip(pv.velocities.iter_mut())
                .zip(pv.forces.iter_mut())
            {
                for ((xd, vd), fd) in x.iter_mut().zip(v.iter_mut()).zip(f.iter()) {
                    *vd += fd * inv_mass * dt;
                    *xd += *vd * dt;
                }
                *f = [0.0; 3];
            }
        }
        self.time += self.dt;
    }
}

impl SimulationState for MockState {
    fn time(&self) -> f64 {
        self.time
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn particles(&self, name: &str) -> Option<&ParticleData> {
        self.vectors.get(name)
    }

    fn particles_mut(&mut self, name: &str) -> Option<&mut ParticleData> {
        self.vectors.get_mut(name)
    }

    fn mesh(&self, name: &str) -> Option<&MeshTopology> {
        self.meshes.get(name)
    }
}

/// `n` unit-mass particles on the x axis, all moving with `velocity`.
pub fn particle_line(n: usize, velocity: [f32; 3]) -> ParticleData {
    let mut pv = ParticleData::new(1.0);
    for i in 0..n {
        pv.push([i as f32, 0.0, 0.0], velocity);
    }
    pv
}

/// A single tetrahedron as a one-object membrane mesh.
pub fn tetrahedron() -> (ParticleData, MeshTopology) {
    let mut pv = ParticleData::new(1.0);
    for x in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
        pv.push(x, [0.0; 3]);
    }
    let mesh = MeshTopology {
        vertices_per_object: 4,
        triangles: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    };
    (pv, mesh)
}
