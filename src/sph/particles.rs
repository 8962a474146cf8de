use super::material::MaterialIndex;
use crate::units::*;
use cgmath::prelude::*;

pub type ParticleIndex = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParticleKind {
    Real,
    Boundary, // immovable solid/wall particles
}

/// Per-particle N×N matrices (phase field φ and phase Laplacian λ), stored contiguously.
#[derive(Clone, Debug, Default)]
pub struct PhaseMatrices {
    num_materials: usize,
    values: Vec<Real>,
}

impl PhaseMatrices {
    pub fn new(num_materials: usize) -> PhaseMatrices {
        PhaseMatrices {
            num_materials,
            values: Vec::new(),
        }
    }

    /// Number of entries per particle, N².
    pub fn stride(&self) -> usize {
        self.num_materials * self.num_materials
    }

    pub(super) fn push_zero(&mut self) {
        let new_len = self.values.len() + self.stride();
        self.values.resize(new_len, 0.0);
    }

    pub(super) fn zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    pub(super) fn values_mut(&mut self) -> &mut [Real] {
        &mut self.values
    }

    #[inline]
    pub fn get(&self, particle: usize, a: MaterialIndex, b: MaterialIndex) -> Real {
        self.values[particle * self.stride() + a * self.num_materials + b]
    }

    /// The full matrix of one particle, row major.
    pub fn matrix(&self, particle: usize) -> &[Real] {
        let stride = self.stride();
        &self.values[particle * stride..(particle + 1) * stride]
    }

    #[inline]
    pub(super) fn flat_index(&self, particle: usize, a: MaterialIndex, b: MaterialIndex) -> usize {
        particle * self.stride() + a * self.num_materials + b
    }
}

/// Initial state of a particle.
#[derive(Copy, Clone, Debug)]
pub struct ParticleInit {
    pub position: Point,
    pub velocity: Vector,
    pub density: Real,
    pub pressure: Real,
    pub temperature: Real,
    pub mass: Real,
    pub material: MaterialIndex,
    pub kind: ParticleKind,
}

/// Particle arena. Particles are never added or removed during a run, so indices are stable handles.
pub struct Particles {
    pub positions: Vec<Point>,       // R
    pub velocities: Vec<Vector>,     // U
    pub positions_start: Vec<Point>, // R_I, snapshot at start of the step
    pub velocities_start: Vec<Vector>,

    pub densities: Vec<Real>, // ρ
    pub densities_start: Vec<Real>,
    pub volumes: Vec<Real>,
    pub masses: Vec<Real>,
    pub pressures: Vec<Real>,
    pub temperatures: Vec<Real>,
    pub sound_speeds: Vec<Real>,

    pub density_rates: Vec<Real>,      // dρ/dt
    pub accelerations: Vec<Vector>,    // dU/dt
    pub energy_rates: Vec<Real>,       // de/dt
    pub random_velocities: Vec<Vector>, // ΔU from thermal fluctuations

    pub shear_rates: Vec<Vector>,
    pub phase_fields: PhaseMatrices,     // φ
    pub phase_gradients: Vec<Vector>,    // δφ
    pub surface_stresses: Vec<Vector>,   // traceless stress derived from δφ
    pub phase_laplacians: PhaseMatrices, // λ

    pub materials: Vec<MaterialIndex>,
    pub kinds: Vec<ParticleKind>,
}

impl Particles {
    pub fn new(num_materials: usize) -> Particles {
        Particles {
            positions: Vec::new(),
            velocities: Vec::new(),
            positions_start: Vec::new(),
            velocities_start: Vec::new(),
            densities: Vec::new(),
            densities_start: Vec::new(),
            volumes: Vec::new(),
            masses: Vec::new(),
            pressures: Vec::new(),
            temperatures: Vec::new(),
            sound_speeds: Vec::new(),
            density_rates: Vec::new(),
            accelerations: Vec::new(),
            energy_rates: Vec::new(),
            random_velocities: Vec::new(),
            shear_rates: Vec::new(),
            phase_fields: PhaseMatrices::new(num_materials),
            phase_gradients: Vec::new(),
            surface_stresses: Vec::new(),
            phase_laplacians: PhaseMatrices::new(num_materials),
            materials: Vec::new(),
            kinds: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn num_real_particles(&self) -> usize {
        self.kinds.iter().filter(|&&k| k == ParticleKind::Real).count()
    }

    pub fn num_boundary_particles(&self) -> usize {
        self.len() - self.num_real_particles()
    }

    pub fn add(&mut self, init: ParticleInit) -> ParticleIndex {
        let index = self.len() as ParticleIndex;
        let volume = if init.density > 0.0 { init.mass / init.density } else { 0.0 };

        self.positions.push(init.position);
        self.velocities.push(init.velocity);
        self.positions_start.push(init.position);
        self.velocities_start.push(init.velocity);
        self.densities.push(init.density);
        self.densities_start.push(init.density);
        self.volumes.push(volume);
        self.masses.push(init.mass);
        self.pressures.push(init.pressure);
        self.temperatures.push(init.temperature);
        self.sound_speeds.push(0.0);
        self.density_rates.push(0.0);
        self.accelerations.push(Zero::zero());
        self.energy_rates.push(0.0);
        self.random_velocities.push(Zero::zero());
        self.shear_rates.push(Zero::zero());
        self.phase_fields.push_zero();
        self.phase_gradients.push(Zero::zero());
        self.surface_stresses.push(Zero::zero());
        self.phase_laplacians.push_zero();
        self.materials.push(init.material);
        self.kinds.push(init.kind);
        index
    }

    #[inline]
    pub fn is_real(&self, index: usize) -> bool {
        self.kinds[index] == ParticleKind::Real
    }

    pub fn iter(&self) -> impl Iterator<Item = ParticleView<'_>> + '_ {
        (0..self.len()).map(move |index| ParticleView { particles: self, index })
    }

    pub fn total_mass(&self) -> Real {
        self.masses.iter().sum()
    }

    /// Σ m U over real particles.
    pub fn total_momentum(&self) -> Vector {
        self.iter()
            .filter(|p| p.kind() == ParticleKind::Real)
            .fold(Vector::zero(), |sum, p| sum + p.velocity() * p.mass())
    }
}

/// Read-only view on a single particle, used by output writers.
#[derive(Copy, Clone)]
pub struct ParticleView<'a> {
    particles: &'a Particles,
    index: usize,
}

impl<'a> ParticleView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn position(&self) -> Point {
        self.particles.positions[self.index]
    }
    pub fn velocity(&self) -> Vector {
        self.particles.velocities[self.index]
    }
    pub fn acceleration(&self) -> Vector {
        self.particles.accelerations[self.index]
    }
    pub fn random_velocity(&self) -> Vector {
        self.particles.random_velocities[self.index]
    }
    pub fn density(&self) -> Real {
        self.particles.densities[self.index]
    }
    pub fn pressure(&self) -> Real {
        self.particles.pressures[self.index]
    }
    pub fn temperature(&self) -> Real {
        self.particles.temperatures[self.index]
    }
    pub fn mass(&self) -> Real {
        self.particles.masses[self.index]
    }
    pub fn material(&self) -> MaterialIndex {
        self.particles.materials[self.index]
    }
    pub fn kind(&self) -> ParticleKind {
        self.particles.kinds[self.index]
    }
}
