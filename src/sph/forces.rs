use super::interaction::{InteractionPair, PairContext};
use super::pair_coefficients::effective_coefficient;
use super::phase::surface_stress_times;
use crate::units::*;
use cgmath::prelude::*;

/// Change rates a single pair contributes.
///
/// The momentum rate is applied as +momentum/m_i to i and -momentum/m_j to j, same for heat.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PairRates {
    pub momentum: Vector,
    pub heat: Real,
    pub density_rate_i: Real,
    pub density_rate_j: Real,
}

/// Effective shear, bulk and heat transport coefficients of a pair.
#[inline]
pub fn effective_transport(ctx: &PairContext, pair: &InteractionPair) -> (Real, Real, Real) {
    let (i, j) = pair.indices();
    let (a, b) = (ctx.particles.materials[i], ctx.particles.materials[j]);
    let (ma, mb) = (&ctx.materials[a], &ctx.materials[b]);
    let coefficient = ctx.coefficients.get(a, b);
    let r = pair.distance;
    (
        effective_coefficient(ma.shear_viscosity, mb.shear_viscosity, coefficient.shear_slip, r),
        effective_coefficient(ma.bulk_viscosity, mb.bulk_viscosity, coefficient.bulk_slip, r),
        effective_coefficient(ma.heat_conduction, mb.heat_conduction, coefficient.heat_slip, r),
    )
}

/// Full pairwise force law: pressure, capillary stress, viscosity, interfacial repulsion,
/// plus continuity and heat conduction.
#[inline]
pub fn pair_rates(ctx: &PairContext, pair: &InteractionPair) -> PairRates {
    let (i, j) = pair.indices();
    let particles = ctx.particles;
    let e = pair.direction;
    let dw = pair.gradient;
    let f = pair.gradient_over_distance();

    let (vi, vj) = (ctx.volume(i), ctx.volume(j));
    let (vi_sq, vj_sq) = (vi * vi, vj * vj);
    let volume_sq = vi_sq + vj_sq;
    let u_ij = particles.velocities[i] - particles.velocities[j];
    let u_ij_e = u_ij.dot(e);

    let (eta, zeta, kappa) = effective_transport(ctx, pair);
    let (a, b) = (particles.materials[i], particles.materials[j]);
    let epsilon = ctx.coefficients.get(a, b).epsilon;

    let pressure = e * (-(particles.pressures[i] * vi_sq + particles.pressures[j] * vj_sq) * dw);
    let capillary = (surface_stress_times(particles.surface_stresses[i], e) * vi_sq + surface_stress_times(particles.surface_stresses[j], e) * vj_sq) * dw;
    let viscous = (u_ij * eta + e * (zeta * u_ij_e)) * (volume_sq * f);
    let repulsion = e * (-epsilon * volume_sq * dw);

    PairRates {
        momentum: pressure + capillary + viscous + repulsion,
        heat: kappa * volume_sq * f * (particles.temperatures[i] - particles.temperatures[j]),
        density_rate_i: particles.masses[i] * u_ij_e * dw,
        density_rate_j: particles.masses[j] * u_ij_e * dw,
    }
}

/// Velocity-gradient contributions (D_xx - D_yy, D_xy + D_yx) to i and j.
#[inline]
pub fn shear_rate_contribution(ctx: &PairContext, pair: &InteractionPair) -> (Vector, Vector) {
    let (i, j) = pair.indices();
    let u_ji = ctx.particles.velocities[j] - ctx.particles.velocities[i];
    let e = pair.direction * pair.gradient;
    let d = Vector::new(u_ji.x * e.x - u_ji.y * e.y, u_ji.x * e.y + u_ji.y * e.x);
    (d * ctx.volume(j), d * ctx.volume(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sph::material::{test_material, MaterialTable};
    use crate::sph::pair_coefficients::{PairCoefficient, PairCoefficients};
    use crate::sph::particles::{ParticleInit, ParticleKind, Particles};
    use crate::sph::smoothing_kernel::{Kernel, QuinticSpline};
    use more_asserts::*;

    fn two_materials() -> (MaterialTable, PairCoefficients) {
        let mut oil = test_material("oil");
        oil.shear_viscosity = 0.3;
        oil.heat_conduction = 0.2;
        let mut water = test_material("water");
        water.heat_conduction = 0.5;
        let mut coefficients = PairCoefficients::zeros(2);
        let interface = PairCoefficient {
            epsilon: 0.5,
            sigma: 1.0,
            shear_slip: 0.01,
            bulk_slip: 0.0,
            heat_slip: 0.0,
        };
        coefficients.set(0, 1, interface);
        coefficients.set(1, 0, interface);
        (MaterialTable::new(vec![water, oil]), coefficients)
    }

    fn particle(x: Real, y: Real, u: Vector, material: usize, mass: Real, temperature: Real) -> ParticleInit {
        ParticleInit {
            position: Point::new(x, y),
            velocity: u,
            density: 1.0 + 0.1 * x,
            pressure: 2.0 + x,
            temperature,
            mass,
            material,
            kind: ParticleKind::Real,
        }
    }

    #[test]
    fn pair_force_is_antisymmetric() {
        let (materials, coefficients) = two_materials();
        let mut particles = Particles::new(2);
        particles.add(particle(0.0, 0.0, Vector::new(0.1, 0.2), 0, 0.01, 1.0));
        particles.add(particle(0.12, 0.05, Vector::new(-0.3, 0.0), 1, 0.02, 2.0));
        particles.surface_stresses[0] = Vector::new(0.4, 0.1);
        particles.surface_stresses[1] = Vector::new(-0.2, 0.3);

        let kernel = QuinticSpline::new(0.3);
        let ctx = PairContext {
            particles: &particles,
            materials: &materials,
            coefficients: &coefficients,
        };
        let forward = InteractionPair::new(0, 1, &particles.positions, &kernel);
        let backward = InteractionPair::new(1, 0, &particles.positions, &kernel);

        // the same physical pair seen from the other side yields the negated momentum
        let rates_forward = pair_rates(&ctx, &forward);
        let rates_backward = pair_rates(&ctx, &backward);
        assert_lt!((rates_forward.momentum + rates_backward.momentum).magnitude(), 1.0e-12);
        assert_lt!((rates_forward.heat + rates_backward.heat).abs(), 1.0e-12);

        // i = 0 is colder, so it receives heat
        assert_gt!(rates_forward.heat, 0.0);
    }

    #[test]
    fn pressure_is_repulsive() {
        let (materials, coefficients) = two_materials();
        let mut particles = Particles::new(2);
        particles.add(particle(0.0, 0.0, Vector::zero(), 0, 0.01, 1.0));
        particles.add(particle(0.1, 0.0, Vector::zero(), 0, 0.01, 1.0));
        let kernel = QuinticSpline::new(0.3);
        let ctx = PairContext {
            particles: &particles,
            materials: &materials,
            coefficients: &coefficients,
        };
        // e points from 1 to 0, i.e. -x; i is pushed away from j
        let rates = pair_rates(&ctx, &InteractionPair::new(0, 1, &particles.positions, &kernel));
        assert_lt!(rates.momentum.x, 0.0);
        assert_eq!(rates.density_rate_i, 0.0);
    }

    #[test]
    fn approaching_particles_compress() {
        let (materials, coefficients) = two_materials();
        let mut particles = Particles::new(2);
        particles.add(particle(0.0, 0.0, Vector::new(1.0, 0.0), 0, 0.01, 1.0));
        particles.add(particle(0.1, 0.0, Vector::new(-1.0, 0.0), 0, 0.01, 1.0));
        let kernel = QuinticSpline::new(0.3);
        let ctx = PairContext {
            particles: &particles,
            materials: &materials,
            coefficients: &coefficients,
        };
        let rates = pair_rates(&ctx, &InteractionPair::new(0, 1, &particles.positions, &kernel));
        assert_gt!(rates.density_rate_i, 0.0);
        assert_gt!(rates.density_rate_j, 0.0);
    }

    #[test]
    fn shear_rate_of_uniform_flow_vanishes() {
        let (materials, coefficients) = two_materials();
        let mut particles = Particles::new(2);
        particles.add(particle(0.0, 0.0, Vector::new(1.0, 2.0), 0, 0.01, 1.0));
        particles.add(particle(0.1, 0.1, Vector::new(1.0, 2.0), 0, 0.01, 1.0));
        let kernel = QuinticSpline::new(0.3);
        assert_gt!(kernel.evaluate(0.1), 0.0);
        let ctx = PairContext {
            particles: &particles,
            materials: &materials,
            coefficients: &coefficients,
        };
        let (di, dj) = shear_rate_contribution(&ctx, &InteractionPair::new(0, 1, &particles.positions, &kernel));
        assert_eq!(di, Vector::zero());
        assert_eq!(dj, Vector::zero());
    }
}
