use super::material::MaterialTable;
use super::pair_coefficients::PairCoefficients;
use super::particles::Particles;
use crate::units::*;
use cgmath::prelude::*;

// Fraction of the most restrictive bound that is actually used.
const SAFETY_FACTOR: Real = 0.25;

/// Stability-constrained time step.
///
/// The viscous/gravity and capillary bounds only depend on material constants and are fixed at construction,
/// the CFL bound is evaluated from the live particle state on every call.
pub struct TimeStepController {
    particle_spacing: Real, // δ
    dt_gravity_viscosity: Real,
    dt_surface: Real,
    max_timestep: Real,
}

impl TimeStepController {
    /// * particle_spacing:  initial distance between particles (δ)
    /// * max_timestep:      replaces non-finite candidates, e.g. for a system at rest without any forces
    pub fn new(particle_spacing: Real, materials: &MaterialTable, coefficients: &PairCoefficients, gravity_magnitude: Real, max_timestep: Real) -> TimeStepController {
        let delta = particle_spacing;
        let nu_max = materials.max_kinematic_viscosity();
        let sigma_max = coefficients.max_surface_tension();

        // x / 0 gives inf, which is fine for a min
        let dt_gravity_viscosity = (delta / gravity_magnitude).sqrt().min(0.5 * delta * delta / nu_max);
        let dt_surface = 0.4 * (delta * delta * delta / sigma_max).sqrt();

        log::info!("particle spacing {}", delta);
        log::info!("time step bounds: gravity/viscosity {}, surface tension {}", dt_gravity_viscosity, dt_surface);

        TimeStepController {
            particle_spacing: delta,
            dt_gravity_viscosity,
            dt_surface,
            max_timestep,
        }
    }

    pub fn particle_spacing(&self) -> Real {
        self.particle_spacing
    }

    pub fn gravity_viscosity_bound(&self) -> Real {
        self.dt_gravity_viscosity
    }

    pub fn surface_bound(&self) -> Real {
        self.dt_surface
    }

    /// δ / (Cs_max + |U|_max) over real particles.
    pub fn cfl_bound(&self, particles: &Particles) -> Real {
        let (cs_max, u_max) = real_particles(particles).fold((0.0, 0.0), |(cs_max, u_max): (Real, Real), i| {
            (cs_max.max(particles.sound_speeds[i]), u_max.max(particles.velocities[i].magnitude()))
        });
        self.particle_spacing / (cs_max + u_max)
    }

    /// Admissible step for the current state, never above the CFL bound.
    pub fn timestep(&self, particles: &Particles) -> Real {
        // ρ_max starts at 1, ρ_min at 1e30
        let (rho_min, rho_max) = real_particles(particles).fold((1.0e30, 1.0), |(rho_min, rho_max): (Real, Real), i| {
            let rho = particles.densities[i];
            (rho_min.min(rho), rho_max.max(rho))
        });

        let cfl = self.cfl_bound(particles);
        let physical = ((0.5 * (rho_min + rho_max)).sqrt() * self.dt_surface).min(self.dt_gravity_viscosity);
        let dt = SAFETY_FACTOR * physical.min(cfl);

        if dt.is_finite() && dt > 0.0 {
            dt
        } else {
            let fallback = if cfl.is_finite() { self.max_timestep.min(cfl) } else { self.max_timestep };
            log::warn!("non-finite time step candidate {}, using {}", dt, fallback);
            fallback
        }
    }
}

fn real_particles(particles: &Particles) -> impl Iterator<Item = usize> + '_ {
    (0..particles.len()).filter(move |&i| particles.is_real(i))
}

// All timing values in (non-dimensional) simulation time.
pub struct TimeManager {
    passed_time: Real,
    timestep: Real,
    num_steps: u64,

    // Simulation time between two observable states (output frames).
    // Steps are shortened so that every multiple of it is hit exactly,
    // otherwise adaptive stepping would overshoot output times.
    start_time: Real,
    output_interval: Real,
    num_outputs: u64,

    // The last step is shortened to end here as well, even off the output grid.
    end_time: Real,
}

// relative tolerance against rounding in the accumulated time
fn reached(time: Real, target: Real) -> bool {
    time >= target - 1.0e-12 * target.abs().max(1.0)
}

impl TimeManager {
    pub fn new(start_time: Real, output_interval: Real, end_time: Real) -> TimeManager {
        TimeManager {
            passed_time: start_time,
            timestep: 0.0, // solver needs to call update_timestep
            num_steps: 0,
            start_time,
            output_interval,
            num_outputs: 0,
            end_time,
        }
    }

    // how much physical time has passed in the simulation
    pub fn passed_time(&self) -> Real {
        self.passed_time
    }

    // how long the last timestep has been
    pub fn timestep(&self) -> Real {
        self.timestep
    }

    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    pub fn next_output(&self) -> Real {
        self.start_time + (self.num_outputs + 1) as Real * self.output_interval
    }

    pub fn end_time(&self) -> Real {
        self.end_time
    }

    pub fn finished(&self) -> bool {
        reached(self.passed_time, self.end_time)
    }

    /// Takes the admissible step, shortened to land on the next output time or the end time.
    pub fn update_timestep(&mut self, admissible: Real) {
        let mut timestep = admissible;
        for target in [self.next_output(), self.end_time] {
            let remaining = target - self.passed_time;
            if remaining > 0.0 {
                timestep = timestep.min(remaining);
            }
        }
        self.timestep = timestep;
    }

    // updates time with the current timestep
    pub fn update_time(&mut self) {
        self.passed_time += self.timestep;
        self.num_steps += 1;
        if reached(self.passed_time, self.end_time) {
            self.passed_time = self.end_time;
        }
    }

    /// True once an output time has been reached. Advances to the next output time.
    pub fn output_due(&mut self) -> bool {
        let next_output = self.next_output();
        if reached(self.passed_time, next_output) {
            self.passed_time = next_output;
            self.num_outputs += 1;
            true
        } else {
            false
        }
    }
}
