//! Builds the engine and its initial particle state from a configuration.

use std::collections::HashSet;

use cgmath::prelude::*;

use crate::config::{InitialSource, RegionKind, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::io::read_restart;
use crate::sph::*;
use crate::units::*;

/// Engine with materials and pair coefficients from `config`, without particles.
pub fn build_hydrodynamics(config: &SimulationConfig) -> Result<Hydrodynamics> {
    let materials = config.material_table();
    let coefficients = config.pair_coefficients(&materials)?;
    Ok(Hydrodynamics::new(materials, coefficients, config.hydrodynamics_settings()))
}

/// Neighbor grid covering the domain box, search radius = smoothing length.
pub fn neighbor_grid(config: &SimulationConfig) -> CellGrid {
    let box_size = config.domain.box_size();
    CellGrid::new(config.domain.smoothing_length, Point::new(0.0, 0.0), Point::from_vec(box_size))
}

pub fn timestep_controller(config: &SimulationConfig, hydro: &Hydrodynamics) -> TimeStepController {
    TimeStepController::new(
        config.domain.particle_spacing(),
        hydro.materials(),
        hydro.coefficients(),
        hydro.gravity().magnitude(),
        config.max_timestep(),
    )
}

/// Fills the configured regions (or restores a restart file plus walls), then derives volumes and masses.
/// Returns the simulation time to start from.
pub fn initialize_particles<K: Kernel + Sync>(hydro: &mut Hydrodynamics, config: &SimulationConfig, kernel: &K) -> Result<Real> {
    let start_time = match config.initial.source {
        InitialSource::Config => {
            fill_regions(hydro, config, |_| true)?;
            config.timing.start_time
        }
        InitialSource::Restart => {
            let path = config
                .initial
                .restart_file
                .as_ref()
                .ok_or_else(|| SimulationError::InvalidConfig("initial.restart_file is required for restart runs".to_string()))?;
            let restart = read_restart(path, hydro.materials())?;
            for particle in restart.particles {
                hydro.add_particle(ParticleInit {
                    position: particle.position,
                    velocity: particle.velocity,
                    density: particle.density,
                    pressure: particle.pressure,
                    temperature: particle.temperature,
                    mass: 0.0,
                    material: particle.material,
                    kind: ParticleKind::Real,
                });
            }
            fill_regions(hydro, config, |kind| kind == RegionKind::Wall)?;
            restart.time
        }
    };

    let mut neighbors = neighbor_grid(config);
    hydro.update_volume(&mut neighbors, kernel);
    let particles = hydro.particles_mut();
    for ((mass, &density), &volume) in particles.masses.iter_mut().zip(&particles.densities).zip(&particles.volumes) {
        *mass = density * volume;
    }

    log::info!(
        "{} real and {} boundary particles, total mass {}",
        hydro.particles().num_real_particles(),
        hydro.particles().num_boundary_particles(),
        hydro.total_mass()
    );
    Ok(start_time)
}

/// Places particles at the lattice cell centres (k + ½)δ inside each selected region.
/// A lattice site claimed by an earlier region is not filled again. Returns the number of added particles.
pub fn fill_regions(hydro: &mut Hydrodynamics, config: &SimulationConfig, select: impl Fn(RegionKind) -> bool) -> Result<usize> {
    let delta = config.domain.particle_spacing();
    let velocity = Vector::new(config.initial.velocity[0], config.initial.velocity[1]);
    let mut occupied = HashSet::new();
    let mut added = 0;

    for region in config.regions.iter().filter(|region| select(region.kind)) {
        let material = hydro
            .materials()
            .find(&region.material)
            .ok_or_else(|| SimulationError::UnknownMaterial(region.material.clone()))?;
        let density = hydro.materials()[material].rho0;
        let pressure = hydro.materials()[material].pressure(density);
        let (kind, velocity) = match region.kind {
            RegionKind::Fluid => (ParticleKind::Real, velocity),
            RegionKind::Wall => (ParticleKind::Boundary, Vector::zero()),
        };

        let first = |min: Real| (min / delta - 0.5).ceil() as i64;
        let last = |max: Real| (max / delta - 0.5).floor() as i64;
        for j in first(region.min[1])..=last(region.max[1]) {
            for i in first(region.min[0])..=last(region.max[0]) {
                if !occupied.insert((i, j)) {
                    continue;
                }
                hydro.add_particle(ParticleInit {
                    position: Point::new((i as Real + 0.5) * delta, (j as Real + 0.5) * delta),
                    velocity,
                    density,
                    pressure,
                    temperature: config.initial.temperature,
                    mass: 0.0,
                    material,
                    kind,
                });
                added += 1;
            }
        }
    }
    Ok(added)
}
