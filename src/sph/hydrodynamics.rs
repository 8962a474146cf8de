use super::accumulator::{accumulate, accumulate_slice};
use super::forces::{pair_rates, shear_rate_contribution};
use super::interaction::{InteractionList, PairContext};
use super::material::MaterialTable;
use super::neighborhood_search::NeighborProvider;
use super::pair_coefficients::PairCoefficients;
use super::particles::{ParticleIndex, ParticleInit, ParticleKind, Particles};
use super::phase;
use super::smoothing_kernel::Kernel;
use super::stochastic::{pair_noise, Wiener};
use crate::units::*;
use cgmath::prelude::*;
use rayon::prelude::*;

/// External body force acting on real particles.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Gravity {
    Uniform(Vector),
    /// Periodic shear forcing (g cos(2π y / period), 0)
    Kolmogorov { amplitude: Real, period: Real },
}

impl Gravity {
    #[inline]
    pub fn acceleration(&self, position: Point) -> Vector {
        match *self {
            Gravity::Uniform(g) => g,
            Gravity::Kolmogorov { amplitude, period } => Vector::new(amplitude * (2.0 * std::f64::consts::PI * position.y / period).cos(), 0.0),
        }
    }

    pub fn magnitude(&self) -> Real {
        match *self {
            Gravity::Uniform(g) => g.magnitude(),
            Gravity::Kolmogorov { amplitude, .. } => amplitude.abs(),
        }
    }
}

pub struct HydrodynamicsSettings {
    pub gravity: Gravity,
    pub boltzmann_constant: Real, // 0 disables thermal noise
    pub num_workers: usize,       // number of private accumulators per pair summation
}

impl Default for HydrodynamicsSettings {
    fn default() -> Self {
        HydrodynamicsSettings {
            gravity: Gravity::Uniform(Vector::zero()),
            boltzmann_constant: 0.0,
            num_workers: rayon::current_num_threads(),
        }
    }
}

/// Interpolated field values at an arbitrary point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampledState {
    pub density: Real,
    pub pressure: Real,
    pub temperature: Real,
    pub velocity: Vector,
}

impl SampledState {
    pub fn zero() -> SampledState {
        SampledState {
            density: 0.0,
            pressure: 0.0,
            temperature: 0.0,
            velocity: Vector::zero(),
        }
    }
}

/// Owns particles and interaction pairs and runs all pairwise summations.
///
/// Update order within a step matters: density before state, state before change rates,
/// phase field before gradient before surface stress.
pub struct Hydrodynamics {
    particles: Particles,
    materials: MaterialTable,
    coefficients: PairCoefficients,
    interactions: InteractionList,
    gravity: Gravity,
    boltzmann_constant: Real,
    num_workers: usize,
    random_pending: bool, // ΔU was drawn but not yet folded into velocities
}

impl Hydrodynamics {
    /// Takes ownership of the material constants and refines every material's b0
    /// from the characteristic speed scale of the whole system.
    pub fn new(mut materials: MaterialTable, coefficients: PairCoefficients, settings: HydrodynamicsSettings) -> Hydrodynamics {
        let sound = settings
            .gravity
            .magnitude()
            .max(materials.max_kinematic_viscosity())
            .max(coefficients.max_surface_tension());
        log::info!("characteristic sound scale {}", sound);
        for material in materials.iter_mut() {
            material.refine_reference_pressure(sound);
            material.log_properties();
        }

        Hydrodynamics {
            particles: Particles::new(materials.len()),
            materials,
            coefficients,
            interactions: InteractionList::new(),
            gravity: settings.gravity,
            boltzmann_constant: settings.boltzmann_constant,
            num_workers: settings.num_workers.max(1),
            random_pending: false,
        }
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut Particles {
        &mut self.particles
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn coefficients(&self) -> &PairCoefficients {
        &self.coefficients
    }

    pub fn interactions(&self) -> &InteractionList {
        &self.interactions
    }

    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    pub fn boltzmann_constant(&self) -> Real {
        self.boltzmann_constant
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn add_particle(&mut self, init: ParticleInit) -> ParticleIndex {
        self.particles.add(init)
    }

    fn context(&self) -> PairContext<'_> {
        PairContext {
            particles: &self.particles,
            materials: &self.materials,
            coefficients: &self.coefficients,
        }
    }

    // ----------------------------------------------------------------
    // interaction pairs

    /// Re-bins particles and regenerates the pair topology.
    pub fn build_pairs<N, K>(&mut self, neighbors: &mut N, kernel: &K)
    where
        N: NeighborProvider + Sync,
        K: Kernel + Sync,
    {
        neighbors.update(&self.particles.positions);
        self.interactions.rebuild(&self.particles.positions, neighbors, kernel);
    }

    /// Refreshes kernel values of the existing pairs after a small move.
    pub fn renew_pairs<K: Kernel + Sync>(&mut self, kernel: &K) {
        self.interactions.renew(&self.particles.positions, kernel);
    }

    // ----------------------------------------------------------------
    // zeroing

    pub fn zero_density(&mut self) {
        self.particles.densities.par_iter_mut().for_each(|rho| *rho = 0.0);
    }

    pub fn zero_shear_rate(&mut self) {
        self.particles.shear_rates.par_iter_mut().for_each(|d| *d = Vector::zero());
    }

    pub fn zero_phase_field(&mut self) {
        self.particles.phase_fields.zero();
    }

    pub fn zero_phase_gradient(&mut self) {
        self.particles.phase_gradients.par_iter_mut().for_each(|g| *g = Vector::zero());
    }

    pub fn zero_phase_laplacian(&mut self) {
        self.particles.phase_laplacians.zero();
    }

    pub fn zero_change_rate(&mut self) {
        self.particles.density_rates.par_iter_mut().for_each(|r| *r = 0.0);
        self.particles.accelerations.par_iter_mut().for_each(|a| *a = Vector::zero());
        self.particles.energy_rates.par_iter_mut().for_each(|r| *r = 0.0);
    }

    pub fn zero_random(&mut self) {
        self.particles.random_velocities.par_iter_mut().for_each(|u| *u = Vector::zero());
        self.random_pending = false;
    }

    // ----------------------------------------------------------------
    // summations

    /// Summation density ρ_i = m_i W(0) + Σ_j m_i W_ij. Does not update pressures.
    pub fn update_density<K: Kernel>(&mut self, kernel: &K) {
        self.zero_density();

        let particles = &self.particles;
        let num_particles = particles.len();
        let pair_sums: Vec<Real> = accumulate_slice(
            self.interactions.pairs(),
            self.num_workers,
            || vec![0.0; num_particles],
            |sums, pair| {
                let (i, j) = pair.indices();
                sums[i] += particles.masses[i] * pair.weight;
                sums[j] += particles.masses[j] * pair.weight;
            },
        );

        let self_weight = kernel.evaluate(0.0);
        (&mut self.particles.densities, &self.particles.masses, &pair_sums)
            .into_par_iter()
            .for_each(|(rho, &mass, &sum)| *rho += mass * self_weight + sum);
    }

    /// Pressure and sound speed from the current density, for all particles.
    pub fn update_state(&mut self) {
        let materials = &self.materials;
        (
            &mut self.particles.pressures,
            &mut self.particles.sound_speeds,
            &self.particles.densities,
            &self.particles.materials,
        )
            .into_par_iter()
            .for_each(|(p, cs, &rho, &material)| {
                let material = &materials[material];
                *p = material.pressure(rho);
                *cs = material.sound_speed(*p, rho);
            });
    }

    pub fn update_shear_rate(&mut self) {
        self.zero_shear_rate();

        let ctx = self.context();
        let num_particles = ctx.particles.len();
        let sums: Vec<Vector> = accumulate_slice(
            self.interactions.pairs(),
            self.num_workers,
            || vec![Vector::zero(); num_particles],
            |sums, pair| {
                let (i, j) = pair.indices();
                let (di, dj) = shear_rate_contribution(&ctx, pair);
                sums[i] += di;
                sums[j] += dj;
            },
        );
        add_into(&mut self.particles.shear_rates, &sums);
    }

    /// Phase fractions φ including the self contribution φ_i[a][a] += V_i W(0).
    pub fn update_phase_field<K: Kernel>(&mut self, kernel: &K) {
        self.zero_phase_field();

        let ctx = self.context();
        let fields = &ctx.particles.phase_fields;
        let num_entries = fields.stride() * ctx.particles.len();
        let mut sums: Vec<Real> = accumulate_slice(
            self.interactions.pairs(),
            self.num_workers,
            || vec![0.0; num_entries],
            |sums, pair| {
                let (i, j) = pair.indices();
                let (a, b) = (ctx.particles.materials[i], ctx.particles.materials[j]);
                let (to_i, to_j) = phase::phase_field_contribution(&ctx, pair);
                sums[fields.flat_index(i, a, b)] += to_i;
                sums[fields.flat_index(j, b, a)] += to_j;
            },
        );

        let self_weight = kernel.evaluate(0.0);
        for (i, &material) in ctx.particles.materials.iter().enumerate() {
            sums[fields.flat_index(i, material, material)] += ctx.volume(i) * self_weight;
        }
        add_into(self.particles.phase_fields.values_mut(), &sums);
    }

    pub fn update_phase_gradient(&mut self) {
        self.zero_phase_gradient();

        let ctx = self.context();
        let num_particles = ctx.particles.len();
        let sums: Vec<Vector> = accumulate_slice(
            self.interactions.pairs(),
            self.num_workers,
            || vec![Vector::zero(); num_particles],
            |sums, pair| {
                let (i, j) = pair.indices();
                let (to_i, to_j) = phase::phase_gradient_contribution(&ctx, pair);
                sums[i] += to_i;
                sums[j] += to_j;
            },
        );
        add_into(&mut self.particles.phase_gradients, &sums);
    }

    pub fn update_phase_laplacian(&mut self) {
        self.zero_phase_laplacian();

        let ctx = self.context();
        let laplacians = &ctx.particles.phase_laplacians;
        let num_entries = laplacians.stride() * ctx.particles.len();
        let sums: Vec<Real> = accumulate_slice(
            self.interactions.pairs(),
            self.num_workers,
            || vec![0.0; num_entries],
            |sums, pair| {
                let (i, j) = pair.indices();
                let (a, b) = (ctx.particles.materials[i], ctx.particles.materials[j]);
                let (to_i, to_j) = phase::phase_laplacian_contribution(&ctx, pair);
                sums[laplacians.flat_index(i, a, b)] += to_i;
                sums[laplacians.flat_index(j, b, a)] += to_j;
            },
        );
        add_into(self.particles.phase_laplacians.values_mut(), &sums);
    }

    /// Derives the traceless interface stress from the current phase gradient.
    pub fn update_surface_stress(&mut self) {
        (&mut self.particles.surface_stresses, &self.particles.phase_gradients)
            .into_par_iter()
            .for_each(|(stress, &gradient)| *stress = phase::surface_stress(gradient));
    }

    /// All multiphase fields in dependency order.
    pub fn update_interface<K: Kernel>(&mut self, kernel: &K) {
        self.update_phase_field(kernel);
        self.update_phase_gradient();
        self.update_surface_stress();
        self.update_phase_laplacian();
    }

    pub fn surface_tension_coefficient(&self) -> Real {
        phase::surface_tension_coefficient(&self.particles)
    }

    /// Density, momentum and energy rates from all pairs, then gravity on real particles.
    pub fn update_change_rate(&mut self) {
        self.zero_change_rate();

        let ctx = self.context();
        let particles = ctx.particles;
        let num_particles = particles.len();
        let (density_rates, accelerations, energy_rates): (Vec<Real>, Vec<Vector>, Vec<Real>) = accumulate_slice(
            self.interactions.pairs(),
            self.num_workers,
            || (vec![0.0; num_particles], vec![Vector::zero(); num_particles], vec![0.0; num_particles]),
            |(drhodt, dudt, dedt), pair| {
                let (i, j) = pair.indices();
                let rates = pair_rates(&ctx, pair);
                drhodt[i] += rates.density_rate_i;
                drhodt[j] += rates.density_rate_j;
                dudt[i] += rates.momentum / particles.masses[i];
                dudt[j] -= rates.momentum / particles.masses[j];
                dedt[i] += rates.heat / particles.masses[i];
                dedt[j] -= rates.heat / particles.masses[j];
            },
        );

        add_into(&mut self.particles.density_rates, &density_rates);
        add_into(&mut self.particles.accelerations, &accelerations);
        add_into(&mut self.particles.energy_rates, &energy_rates);
        self.add_gravity();
    }

    fn add_gravity(&mut self) {
        let gravity = self.gravity;
        (&mut self.particles.accelerations, &self.particles.positions, &self.particles.kinds)
            .into_par_iter()
            .filter(|(_, _, &kind)| kind == ParticleKind::Real)
            .for_each(|(acceleration, &position, _)| *acceleration += gravity.acceleration(position));
    }

    /// Draws one Wiener increment per pair (in pair order) and accumulates the thermal velocity increments ΔU.
    pub fn update_random(&mut self, dt: Real, wiener: &mut Wiener) {
        self.zero_random();
        if self.boltzmann_constant <= 0.0 || self.interactions.is_empty() {
            return;
        }

        let sqrt_dt = dt.sqrt();
        let increments: Vec<_> = (0..self.interactions.len()).map(|_| wiener.increment(sqrt_dt)).collect();

        let ctx = self.context();
        let pairs = self.interactions.pairs();
        let particles = ctx.particles;
        let boltzmann_constant = self.boltzmann_constant;
        let num_particles = particles.len();
        let sums: Vec<Vector> = accumulate(
            pairs.len(),
            self.num_workers,
            || vec![Vector::zero(); num_particles],
            |sums, k| {
                let pair = &pairs[k];
                let (i, j) = pair.indices();
                let noise = pair_noise(&ctx, pair, boltzmann_constant, &increments[k]);
                sums[i] += noise / particles.masses[i];
                sums[j] -= noise / particles.masses[j];
            },
        );
        add_into(&mut self.particles.random_velocities, &sums);
        self.random_pending = true;
    }

    /// Folds pending ΔU into the velocities of real particles. Does nothing if already applied.
    pub fn apply_random_effects(&mut self) {
        if !self.random_pending {
            return;
        }
        self.random_pending = false;
        (&mut self.particles.velocities, &self.particles.random_velocities, &self.particles.kinds)
            .into_par_iter()
            .filter(|(_, _, &kind)| kind == ParticleKind::Real)
            .for_each(|(u, &du, _)| *u += du);
    }

    // ----------------------------------------------------------------
    // integration, real particles only

    /// Stores the step start state and moves to the half step using the current rates.
    pub fn predictor(&mut self, dt: Real) {
        let p = &mut self.particles;
        (
            &mut p.positions,
            &mut p.velocities,
            &mut p.densities,
            &mut p.positions_start,
            &mut p.velocities_start,
            &mut p.densities_start,
            &p.accelerations,
            &p.density_rates,
            &p.kinds,
        )
            .into_par_iter()
            .filter(|(.., &kind)| kind == ParticleKind::Real)
            .for_each(|(r, u, rho, r_start, u_start, rho_start, &dudt, &drhodt, _)| {
                *r_start = *r;
                *rho_start = *rho;
                *u_start = *u;

                let r_full = *r + *u * dt;
                let rho_full = *rho + drhodt * dt;
                let u_full = *u + dudt * dt;

                *r = r_start.midpoint(r_full);
                *rho = (rho_full + *rho_start) * 0.5;
                *u = (u_full + *u_start) * 0.5;
            });
    }

    /// Completes the step from the step start state with half step velocity and rates.
    pub fn corrector(&mut self, dt: Real) {
        let p = &mut self.particles;
        (
            &mut p.positions,
            &mut p.velocities,
            &mut p.densities,
            &p.positions_start,
            &p.velocities_start,
            &p.accelerations,
            &p.density_rates,
            &p.kinds,
        )
            .into_par_iter()
            .filter(|(.., &kind)| kind == ParticleKind::Real)
            .for_each(|(r, u, rho, &r_start, &u_start, &dudt, &drhodt, _)| {
                *r = r_start + *u * dt;
                *rho += drhodt * dt;
                *u = u_start + dudt * dt;
            });
    }

    /// Predictor for summation density: folds pending ΔU into the velocity first, leaves density alone.
    pub fn predictor_summation(&mut self, dt: Real) {
        self.apply_random_effects();

        let p = &mut self.particles;
        (
            &mut p.positions,
            &mut p.velocities,
            &mut p.positions_start,
            &mut p.velocities_start,
            &p.accelerations,
            &p.kinds,
        )
            .into_par_iter()
            .filter(|(.., &kind)| kind == ParticleKind::Real)
            .for_each(|(r, u, r_start, u_start, &dudt, _)| {
                *r_start = *r;
                *u_start = *u;

                let r_full = *r + *u * dt;
                let u_full = *u + dudt * dt;

                *r = r_start.midpoint(r_full);
                *u = (u_full + *u_start) * 0.5;
            });
    }

    /// Corrector for summation density. ΔU is already part of the step start velocity.
    pub fn corrector_summation(&mut self, dt: Real) {
        let p = &mut self.particles;
        (&mut p.positions, &mut p.velocities, &p.positions_start, &p.velocities_start, &p.accelerations, &p.kinds)
            .into_par_iter()
            .filter(|(.., &kind)| kind == ParticleKind::Real)
            .for_each(|(r, u, &r_start, &u_start, &dudt, _)| {
                *r = r_start + *u * dt;
                *u = u_start + dudt * dt;
            });
    }

    // ----------------------------------------------------------------
    // setup & diagnostics

    /// V_i = 1 / Σ_j W(|R_i - R_j|), self included. Queries the provider directly, not the pair list.
    pub fn update_volume<N, K>(&mut self, neighbors: &mut N, kernel: &K)
    where
        N: NeighborProvider + Sync,
        K: Kernel + Sync,
    {
        neighbors.update(&self.particles.positions);
        let positions = &self.particles.positions;
        let neighbors = &*neighbors;
        self.particles.volumes.par_iter_mut().enumerate().for_each(|(i, volume)| {
            let mut weight_sum = 0.0;
            neighbors.foreach_neighbor(positions, positions[i], |j| {
                weight_sum += kernel.evaluate(positions[i].distance(positions[j as usize]));
            });
            *volume = 1.0 / (weight_sum + DIVISION_EPSILON);
        });
    }

    /// Sets all velocities to zero, e.g. to relax towards a static solution.
    pub fn zero_velocity(&mut self) {
        self.particles.velocities.par_iter_mut().for_each(|u| *u = Vector::zero());
    }

    /// Shepard interpolation at `position`. `None` if no particle is in range.
    /// The neighbor provider needs to be up to date.
    pub fn sample<N: NeighborProvider, K: Kernel>(&self, neighbors: &N, kernel: &K, position: Point) -> Option<SampledState> {
        let p = &self.particles;
        let mut weight_sum = 0.0;
        let mut state = SampledState::zero();
        neighbors.foreach_neighbor(&p.positions, position, |j| {
            let j = j as usize;
            let weight = kernel.evaluate(position.distance(p.positions[j]));
            weight_sum += weight;
            state.density += weight * p.densities[j];
            state.pressure += weight * p.pressures[j];
            state.temperature += weight * p.temperatures[j];
            state.velocity += p.velocities[j] * weight;
        });

        if weight_sum <= DIVISION_EPSILON {
            return None;
        }
        let inv = 1.0 / weight_sum;
        Some(SampledState {
            density: state.density * inv,
            pressure: state.pressure * inv,
            temperature: state.temperature * inv,
            velocity: state.velocity * inv,
        })
    }

    pub fn total_mass(&self) -> Real {
        self.particles.total_mass()
    }

    pub fn total_momentum(&self) -> Vector {
        self.particles.total_momentum()
    }
}

// Reduction pass: folds an already merged private accumulator into a shared particle field.
fn add_into<T: Copy + std::ops::AddAssign + Send + Sync>(target: &mut [T], sums: &[T]) {
    target.par_iter_mut().zip(sums.par_iter()).for_each(|(t, &s)| *t += s);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sph::material::test_material;
    use crate::sph::neighborhood_search::CellGrid;
    use crate::sph::pair_coefficients::PairCoefficient;
    use crate::sph::smoothing_kernel::QuinticSpline;
    use more_asserts::*;

    const SMOOTHING_LENGTH: Real = 0.3;
    const SPACING: Real = 0.1;

    fn engine(num_materials: usize, settings: HydrodynamicsSettings) -> Hydrodynamics {
        let materials = MaterialTable::new((0..num_materials).map(|k| test_material(&format!("m{}", k))).collect());
        Hydrodynamics::new(materials, PairCoefficients::zeros(num_materials), settings)
    }

    fn fill_block(hydro: &mut Hydrodynamics, count: usize, material_of: impl Fn(usize, usize) -> usize) {
        let mass = test_material("").rho0 * SPACING * SPACING;
        for y in 0..count {
            for x in 0..count {
                // slight shear so that viscous and continuity terms are non-trivial
                let position = Point::new((x as Real + 0.5) * SPACING, (y as Real + 0.5) * SPACING);
                hydro.add_particle(ParticleInit {
                    position,
                    velocity: Vector::new(0.1 * position.y, -0.05 * position.x),
                    density: 1.0,
                    pressure: 0.0,
                    temperature: 1.0,
                    mass,
                    material: material_of(x, y),
                    kind: ParticleKind::Real,
                });
            }
        }
    }

    fn grid(count: usize) -> CellGrid {
        let extent = count as Real * SPACING;
        CellGrid::new(SMOOTHING_LENGTH, Point::new(0.0, 0.0), Point::new(extent, extent))
    }

    fn full_update(hydro: &mut Hydrodynamics, neighbors: &mut CellGrid, kernel: &QuinticSpline) {
        hydro.build_pairs(neighbors, kernel);
        hydro.update_density(kernel);
        hydro.update_state();
        hydro.update_shear_rate();
        hydro.update_interface(kernel);
        hydro.update_change_rate();
    }

    #[test]
    fn two_particle_density_and_pressure() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut hydro = engine(1, Default::default());
        let mass = 0.01;
        for &x in &[0.0, 0.5 * SMOOTHING_LENGTH] {
            hydro.add_particle(ParticleInit {
                position: Point::new(x, 0.0),
                velocity: Vector::zero(),
                density: 1.0,
                pressure: 0.0,
                temperature: 1.0,
                mass,
                material: 0,
                kind: ParticleKind::Real,
            });
        }
        let mut neighbors = CellGrid::new(SMOOTHING_LENGTH, Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        hydro.build_pairs(&mut neighbors, &kernel);
        assert_eq!(hydro.interactions().len(), 1);

        hydro.update_density(&kernel);
        let expected = mass * (kernel.evaluate(0.0) + kernel.evaluate(0.5 * SMOOTHING_LENGTH));
        for &rho in &hydro.particles().densities {
            assert_lt!((rho - expected).abs(), 1.0e-12 * expected);
        }

        // at reference density the pressure is exactly b0
        let rho0 = hydro.materials()[0].rho0;
        hydro.particles_mut().densities.iter_mut().for_each(|rho| *rho = rho0);
        hydro.update_state();
        for &p in &hydro.particles().pressures {
            assert_eq!(p, hydro.materials()[0].b0);
        }
    }

    #[test]
    fn pair_forces_conserve_momentum() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut hydro = engine(2, Default::default());
        let mut coefficients = PairCoefficients::zeros(2);
        let interface = PairCoefficient {
            epsilon: 0.2,
            sigma: 0.5,
            shear_slip: 0.01,
            bulk_slip: 0.01,
            heat_slip: 0.0,
        };
        coefficients.set(0, 1, interface);
        coefficients.set(1, 0, interface);
        hydro.coefficients = coefficients;
        fill_block(&mut hydro, 10, |x, _| if x < 5 { 0 } else { 1 });

        let mut neighbors = grid(10);
        full_update(&mut hydro, &mut neighbors, &kernel);

        let p = hydro.particles();
        let momentum_rate = p.accelerations.iter().zip(&p.masses).fold(Vector::zero(), |sum, (a, &m)| sum + a * m);
        let scale = p.accelerations.iter().zip(&p.masses).map(|(a, &m)| (a * m).magnitude()).sum::<Real>();
        assert_gt!(scale, 0.0);
        assert_lt!(momentum_rate.magnitude(), 1.0e-10 * scale);

        // interface exists, so there is a phase gradient somewhere
        assert_gt!(hydro.surface_tension_coefficient(), 0.0);
    }

    #[test]
    fn mass_is_conserved_over_steps() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut hydro = engine(
            1,
            HydrodynamicsSettings {
                gravity: Gravity::Uniform(Vector::new(0.0, -1.0)),
                ..Default::default()
            },
        );
        fill_block(&mut hydro, 8, |_, _| 0);
        let mut neighbors = grid(8);
        let mass_before = hydro.total_mass();

        for _ in 0..3 {
            full_update(&mut hydro, &mut neighbors, &kernel);
            hydro.predictor(1.0e-4);
            hydro.renew_pairs(&kernel);
            hydro.update_state();
            hydro.update_change_rate();
            hydro.corrector(1.0e-4);
        }
        assert_eq!(hydro.total_mass(), mass_before);
        assert!(hydro.particles().positions.iter().all(|r| r.x.is_finite() && r.y.is_finite()));
    }

    #[test]
    fn zero_coefficients_reduce_to_single_material() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut single = engine(1, Default::default());
        let mut split = engine(2, Default::default());
        fill_block(&mut single, 8, |_, _| 0);
        fill_block(&mut split, 8, |x, y| (x + y) % 2);

        let mut neighbors = grid(8);
        full_update(&mut single, &mut neighbors, &kernel);
        full_update(&mut split, &mut neighbors, &kernel);

        let (a, b) = (single.particles(), split.particles());
        for i in 0..a.len() {
            assert_lt!((a.densities[i] - b.densities[i]).abs(), 1.0e-12);
            assert_lt!((a.shear_rates[i] - b.shear_rates[i]).magnitude(), 1.0e-12);
            assert_lt!((a.accelerations[i] - b.accelerations[i]).magnitude(), 1.0e-9);
            assert_lt!((a.density_rates[i] - b.density_rates[i]).abs(), 1.0e-12);
            assert_eq!(b.phase_gradients[i], Vector::zero());

            // phase fractions only get distributed over the material columns
            let material = b.materials[i];
            let row_sum: Real = (0..2).map(|other| b.phase_fields.get(i, material, other)).sum();
            assert_lt!((row_sum - a.phase_fields.get(i, 0, 0)).abs(), 1.0e-12);
        }
    }

    // two materials with an interface, heat conduction, a temperature gradient and thermal noise
    fn interface_engine(num_workers: usize) -> Hydrodynamics {
        let mut oil = test_material("oil");
        oil.shear_viscosity = 0.3;
        oil.heat_conduction = 0.2;
        let mut water = test_material("water");
        water.heat_conduction = 0.5;
        let mut coefficients = PairCoefficients::zeros(2);
        let interface = PairCoefficient {
            epsilon: 0.1,
            sigma: 0.5,
            shear_slip: 0.01,
            bulk_slip: 0.0,
            heat_slip: 0.02,
        };
        coefficients.set(0, 1, interface);
        coefficients.set(1, 0, interface);

        let mut hydro = Hydrodynamics::new(
            MaterialTable::new(vec![water, oil]),
            coefficients,
            HydrodynamicsSettings {
                boltzmann_constant: 1.0e-3,
                num_workers,
                ..Default::default()
            },
        );
        fill_block(&mut hydro, 8, |x, y| if x + y < 8 { 0 } else { 1 });
        for (temperature, position) in hydro.particles.temperatures.iter_mut().zip(&hydro.particles.positions) {
            *temperature = 1.0 + position.x;
        }
        hydro
    }

    #[test]
    fn result_independent_of_worker_count() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut neighbors = grid(8);
        let mut results = Vec::new();
        for &num_workers in &[1, 3, 16] {
            let mut hydro = interface_engine(num_workers);
            full_update(&mut hydro, &mut neighbors, &kernel);
            hydro.update_random(1.0e-4, &mut Wiener::new(5));
            results.push(hydro.particles);
        }

        let reference = &results[0];
        assert!(reference.energy_rates.iter().any(|&r| r != 0.0));
        assert!(reference.phase_gradients.iter().any(|g| *g != Vector::zero()));
        assert!(reference.shear_rates.iter().any(|d| *d != Vector::zero()));
        assert!(reference.random_velocities.iter().any(|du| *du != Vector::zero()));

        let close = |a: Real, b: Real| (a - b).abs() <= 1.0e-10 * (1.0 + a.abs().max(b.abs()));
        let close_vec = |a: Vector, b: Vector| close(a.x, b.x) && close(a.y, b.y);
        for other in &results[1..] {
            for i in 0..reference.len() {
                assert!(close(reference.densities[i], other.densities[i]), "density {}", i);
                assert!(close(reference.density_rates[i], other.density_rates[i]), "density rate {}", i);
                assert!(close(reference.energy_rates[i], other.energy_rates[i]), "energy rate {}", i);
                assert!(close_vec(reference.accelerations[i], other.accelerations[i]), "acceleration {}", i);
                assert!(close_vec(reference.shear_rates[i], other.shear_rates[i]), "shear rate {}", i);
                assert!(close_vec(reference.phase_gradients[i], other.phase_gradients[i]), "phase gradient {}", i);
                assert!(close_vec(reference.surface_stresses[i], other.surface_stresses[i]), "surface stress {}", i);
                assert!(close_vec(reference.random_velocities[i], other.random_velocities[i]), "random velocity {}", i);
                for (a, b) in reference.phase_fields.matrix(i).iter().zip(other.phase_fields.matrix(i)) {
                    assert!(close(*a, *b), "phase field {}", i);
                }
                for (a, b) in reference.phase_laplacians.matrix(i).iter().zip(other.phase_laplacians.matrix(i)) {
                    assert!(close(*a, *b), "phase laplacian {}", i);
                }
            }
        }
    }

    // single particle without neighbors, so the rates stay what they are set to
    fn lone_particle(gravity: Vector) -> Hydrodynamics {
        let mut hydro = engine(
            1,
            HydrodynamicsSettings {
                gravity: Gravity::Uniform(gravity),
                ..Default::default()
            },
        );
        hydro.add_particle(ParticleInit {
            position: Point::new(1.0, 1.0),
            velocity: Vector::new(0.5, 0.0),
            density: 1.0,
            pressure: 0.0,
            temperature: 1.0,
            mass: 0.01,
            material: 0,
            kind: ParticleKind::Real,
        });
        hydro.update_change_rate();
        hydro.particles.density_rates[0] = 0.3;
        hydro
    }

    fn assert_close(actual: Real, expected: Real) {
        assert_lt!((actual - expected).abs(), 1.0e-12, "{} != {}", actual, expected);
    }

    #[test]
    fn predictor_corrector_with_continuity_density() {
        let dt = 0.1;
        let mut hydro = lone_particle(Vector::new(0.0, -2.0));
        assert_eq!(hydro.particles.accelerations[0], Vector::new(0.0, -2.0));

        // half step: R0 + U0 dt/2, U0 + a dt/2, ρ0 + dρ/dt dt/2
        hydro.predictor(dt);
        let p = &hydro.particles;
        assert_close(p.positions[0].x, 1.025);
        assert_close(p.positions[0].y, 1.0);
        assert_close(p.velocities[0].x, 0.5);
        assert_close(p.velocities[0].y, -0.1);
        assert_close(p.densities[0], 1.015);
        assert_eq!(p.positions_start[0], Point::new(1.0, 1.0));
        assert_eq!(p.velocities_start[0], Vector::new(0.5, 0.0));
        assert_eq!(p.densities_start[0], 1.0);

        // full step: R0 + U_half dt, U0 + a dt, ρ_half + dρ/dt dt
        hydro.corrector(dt);
        let p = &hydro.particles;
        assert_close(p.positions[0].x, 1.05);
        assert_close(p.positions[0].y, 0.99);
        assert_close(p.velocities[0].x, 0.5);
        assert_close(p.velocities[0].y, -0.2);
        assert_close(p.densities[0], 1.045);
    }

    #[test]
    fn predictor_corrector_with_summation_density() {
        let dt = 0.1;
        let mut hydro = lone_particle(Vector::new(0.0, -2.0));
        hydro.particles.random_velocities[0] = Vector::new(0.1, 0.2);
        hydro.random_pending = true;

        // ΔU is folded in before the step start state is stored
        hydro.predictor_summation(dt);
        let p = &hydro.particles;
        assert_close(p.velocities_start[0].x, 0.6);
        assert_close(p.velocities_start[0].y, 0.2);
        assert_eq!(p.positions_start[0], Point::new(1.0, 1.0));
        assert_close(p.positions[0].x, 1.03);
        assert_close(p.positions[0].y, 1.01);
        assert_close(p.velocities[0].x, 0.6);
        assert_close(p.velocities[0].y, 0.1);
        assert_eq!(p.densities[0], 1.0);

        hydro.corrector_summation(dt);
        let p = &hydro.particles;
        assert_close(p.positions[0].x, 1.06);
        assert_close(p.positions[0].y, 1.01);
        assert_close(p.velocities[0].x, 0.6);
        assert_close(p.velocities[0].y, 0.0);
        assert_eq!(p.densities[0], 1.0);
    }

    #[test]
    fn random_effects_are_applied_once() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut hydro = engine(
            1,
            HydrodynamicsSettings {
                boltzmann_constant: 1.0e-3,
                ..Default::default()
            },
        );
        fill_block(&mut hydro, 6, |_, _| 0);
        let mut neighbors = grid(6);
        full_update(&mut hydro, &mut neighbors, &kernel);

        let mut wiener = Wiener::new(1);
        hydro.update_random(1.0e-4, &mut wiener);
        let p = hydro.particles();
        let noise_momentum = p.random_velocities.iter().zip(&p.masses).fold(Vector::zero(), |sum, (du, &m)| sum + du * m);
        assert_lt!(noise_momentum.magnitude(), 1.0e-12);
        assert!(p.random_velocities.iter().any(|du| du.magnitude() > 0.0));

        let before = hydro.particles().velocities.clone();
        hydro.apply_random_effects();
        let once = hydro.particles().velocities.clone();
        hydro.apply_random_effects();
        assert_eq!(hydro.particles().velocities, once);
        assert_ne!(once, before);

        // the summation predictor must not fold it in a second time either
        hydro.predictor_summation(0.0);
        assert_eq!(hydro.particles().velocities, once);
    }

    #[test]
    fn boundary_particles_do_not_move() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut hydro = engine(
            1,
            HydrodynamicsSettings {
                gravity: Gravity::Uniform(Vector::new(0.0, -1.0)),
                ..Default::default()
            },
        );
        fill_block(&mut hydro, 4, |_, _| 0);
        hydro.add_particle(ParticleInit {
            position: Point::new(0.2, -0.05),
            velocity: Vector::zero(),
            density: 1.0,
            pressure: 0.0,
            temperature: 1.0,
            mass: 0.01,
            material: 0,
            kind: ParticleKind::Boundary,
        });
        let wall = hydro.particles().len() - 1;
        let mut neighbors = grid(4);
        full_update(&mut hydro, &mut neighbors, &kernel);
        hydro.predictor(1.0e-3);
        hydro.corrector(1.0e-3);
        assert_eq!(hydro.particles().positions[wall], Point::new(0.2, -0.05));
        assert_eq!(hydro.particles().num_boundary_particles(), 1);
    }

    #[test]
    fn volume_and_sampling() {
        let kernel = QuinticSpline::new(SMOOTHING_LENGTH);
        let mut hydro = engine(1, Default::default());
        fill_block(&mut hydro, 12, |_, _| 0);
        let mut neighbors = grid(12);

        hydro.update_volume(&mut neighbors, &kernel);
        // interior particles of a regular lattice have roughly spacing² volume
        let center = 6 * 12 + 6;
        let volume = hydro.particles().volumes[center];
        assert_lt!((volume - SPACING * SPACING).abs(), 0.05 * SPACING * SPACING);

        let sampled = hydro.sample(&neighbors, &kernel, Point::new(0.6, 0.6));
        let sampled = sampled.expect("points inside the block have neighbors");
        assert_lt!((sampled.density - 1.0).abs(), 1.0e-12);
        assert_lt!((sampled.temperature - 1.0).abs(), 1.0e-12);
        assert!(hydro.sample(&neighbors, &kernel, Point::new(5.0, 5.0)).is_none());

        hydro.zero_velocity();
        assert_eq!(hydro.total_momentum(), Vector::zero());
    }

    #[test]
    fn kolmogorov_forcing_profile() {
        let gravity = Gravity::Kolmogorov { amplitude: 2.0, period: 1.0 };
        assert_lt!((gravity.acceleration(Point::new(0.3, 0.0)).x - 2.0).abs(), 1.0e-12);
        assert_lt!((gravity.acceleration(Point::new(0.0, 0.5)).x + 2.0).abs(), 1.0e-12);
        assert_eq!(gravity.acceleration(Point::new(0.0, 0.25)).y, 0.0);
        assert_eq!(gravity.magnitude(), 2.0);
    }
}
