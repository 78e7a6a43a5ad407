//! Particle records and the index-addressable store that owns them.
//!
//! Every physical field is opaque pass-through data for the distributor: only
//! the material type (as an equality filter) and the flaw list are ever looked
//! at. Porosity and plasticity fields exist on every particle; whether they
//! are read or written is decided by the record layout.

use crate::error::{Error, Result};

/// Spatial dimension of vectors and tensors in a snapshot.
pub const DIM: usize = 3;

/// One simulated material point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Particle {
    pub position: [f64; DIM],
    pub velocity: [f64; DIM],
    pub mass: f64,
    pub density: f64,
    /// Specific internal energy.
    pub energy: f64,
    pub smoothing_length: f64,
    /// Number of interaction partners (restarted runs only).
    pub neighbor_count: i32,
    pub material_type: i32,
    pub damage: f64,
    /// Deviatoric stress tensor.
    pub stress: [[f64; DIM]; DIM],
    pub plastic_strain: f64,
    pub temperature: f64,
    /// Porosity distension.
    pub alpha: f64,
    pub pressure: f64,
    pub(crate) flaws: Vec<f64>,
}

impl Particle {
    /// Number of activation thresholds assigned so far.
    pub fn flaw_count(&self) -> usize {
        self.flaws.len()
    }

    /// Activation thresholds in the order they were assigned.
    pub fn flaws(&self) -> &[f64] {
        &self.flaws
    }

    /// Append one activation threshold.
    ///
    /// Growth is amortised; a failed allocation is reported instead of
    /// aborting so the caller can abandon the run cleanly. `index` is only
    /// used to name the particle in the error.
    pub fn push_flaw(&mut self, index: usize, threshold: f64) -> Result<()> {
        self.flaws
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory { particle: index })?;
        self.flaws.push(threshold);
        Ok(())
    }
}

/// Which particles take part in weibulling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialFilter {
    /// Every particle is eligible.
    #[default]
    All,
    /// Only particles of this material type are eligible.
    Only(i32),
}

impl MaterialFilter {
    /// Build a filter from a command-line style material type, where any
    /// negative value means "all".
    pub fn from_material_type(material_type: i32) -> Self {
        if material_type < 0 {
            Self::All
        } else {
            Self::Only(material_type)
        }
    }

    pub fn matches(&self, particle: &Particle) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => particle.material_type == *t,
        }
    }

    /// Material type being filtered on, if any.
    pub fn material_type(&self) -> Option<i32> {
        match self {
            Self::All => None,
            Self::Only(t) => Some(*t),
        }
    }
}

impl std::fmt::Display for MaterialFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(t) => write!(f, "{t}"),
        }
    }
}

/// Ordered collection of particles. Indices are stable for the lifetime of
/// the store; particles are never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    /// Append a threshold to the particle at `index`.
    ///
    /// Panics if `index` is out of range; callers only pass indices drawn
    /// from `0..len()`.
    pub(crate) fn push_flaw(&mut self, index: usize, threshold: f64) -> Result<()> {
        self.particles[index].push_flaw(index, threshold)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Number of particles the filter lets through.
    pub fn eligible_count(&self, filter: MaterialFilter) -> usize {
        self.particles.iter().filter(|p| filter.matches(p)).count()
    }

    /// Sum of flaw counts over all particles.
    pub fn total_flaws(&self) -> usize {
        self.particles.iter().map(Particle::flaw_count).sum()
    }

    pub fn into_vec(self) -> Vec<Particle> {
        self.particles
    }
}

impl From<Vec<Particle>> for ParticleStore {
    fn from(particles: Vec<Particle>) -> Self {
        Self { particles }
    }
}

impl<'a> IntoIterator for &'a ParticleStore {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}
