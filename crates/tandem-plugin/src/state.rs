//! The read/write view of engine state that producer halves sample.
//!
//! The engine owns the particle data; this layer only borrows it for the
//! duration of one `step_all` call on a compute rank.

/// Per-particle arrays of one particle vector.
///
/// The three arrays always have the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleData {
    /// Mass shared by every particle of the vector.
    pub mass: f32,
    /// Positions.
    pub positions: Vec<[f32; 3]>,
    /// Velocities.
    pub velocities: Vec<[f32; 3]>,
    /// Forces accumulated for the current step.
    pub forces: Vec<[f32; 3]>,
}

impl ParticleData {
    /// An empty vector of particles with the given mass.
    pub fn new(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }

    /// Append one particle with zero force.
    pub fn push(&mut self, position: [f32; 3], velocity: [f32; 3]) {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.forces.push([0.0; 3]);
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether there are no particles.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Triangle connectivity of an object vector's membrane mesh.
///
/// Every object in the vector shares the same topology; vertex `v` of
/// object `k` is particle `k * vertices_per_object + v`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshTopology {
    /// Vertices per object.
    pub vertices_per_object: u32,
    /// Triangles as vertex index triples, local to one object.
    pub triangles: Vec<[u32; 3]>,
}

/// Engine state visible to compute-side plugin hooks.
pub trait SimulationState {
    /// Simulation time at the end of the current step.
    fn time(&self) -> f64;

    /// Time step size.
    fn dt(&self) -> f64;

    /// Particle arrays of the named vector.
    fn particles(&self, name: &str) -> Option<&ParticleData>;

    /// Mutable particle arrays of the named vector.
    fn particles_mut(&mut self, name: &str) -> Option<&mut ParticleData>;

    /// Mesh of the named object vector. Plain particle vectors have none.
    fn mesh(&self, _name: &str) -> Option<&MeshTopology> {
        None
    }
}
