//! Pairwise terms of the multiphase field: phase fractions φ, their gradient δφ and Laplacian λ.

use super::interaction::{InteractionPair, PairContext};
use super::particles::Particles;
use crate::units::*;
use cgmath::prelude::*;

/// Contributions to φ_i[a][b] and φ_j[b][a].
#[inline]
pub fn phase_field_contribution(ctx: &PairContext, pair: &InteractionPair) -> (Real, Real) {
    let (i, j) = pair.indices();
    (ctx.volume(j) * pair.weight, ctx.volume(i) * pair.weight)
}

/// Contributions to δφ_i and δφ_j, weighted by the surface tension of the ordered material pairs.
/// Pairs of the same material don't contribute.
#[inline]
pub fn phase_gradient_contribution(ctx: &PairContext, pair: &InteractionPair) -> (Vector, Vector) {
    let (i, j) = pair.indices();
    let (a, b) = (ctx.particles.materials[i], ctx.particles.materials[j]);
    if a == b {
        return (Vector::zero(), Vector::zero());
    }

    let (vi, vj) = (ctx.volume(i), ctx.volume(j));
    let (rhoi, rhoj) = (ctx.particles.densities[i], ctx.particles.densities[j]);
    let volume_sq = vi * vi + vj * vj;
    let grad = pair.direction * pair.gradient;

    let to_i = grad * (ctx.coefficients.get(a, b).sigma * volume_sq / vi * rhoi / (rhoi + rhoj));
    let to_j = -grad * (ctx.coefficients.get(b, a).sigma * volume_sq / vj * rhoj / (rhoi + rhoj));
    (to_i, to_j)
}

/// Contributions to λ_i[a][b] and λ_j[b][a], zero for pairs of the same material.
#[inline]
pub fn phase_laplacian_contribution(ctx: &PairContext, pair: &InteractionPair) -> (Real, Real) {
    let (i, j) = pair.indices();
    if ctx.particles.materials[i] == ctx.particles.materials[j] {
        return (0.0, 0.0);
    }
    let f = pair.gradient_over_distance();
    (-2.0 * ctx.volume(j) * f, -2.0 * ctx.volume(i) * f)
}

/// Traceless interface stress from a phase gradient: (½(δx² − δy²), δx·δy) / |δφ|.
#[inline]
pub fn surface_stress(phase_gradient: Vector) -> Vector {
    let (dx, dy) = (phase_gradient.x, phase_gradient.y);
    Vector::new(0.5 * (dx * dx - dy * dy), dx * dy) / (phase_gradient.magnitude() + DIVISION_EPSILON)
}

/// S·e with S = −[[s0, s1], [s1, −s0]].
#[inline]
pub fn surface_stress_times(stress: Vector, e: Vector) -> Vector {
    -Vector::new(stress.x * e.x + stress.y * e.y, stress.y * e.x - stress.x * e.y)
}

/// Σ |δφ|² V / sqrt(Σ V) over real particles. Diagnostic only.
pub fn surface_tension_coefficient(particles: &Particles) -> Real {
    let mut tension = 0.0;
    let mut total_volume = 0.0;
    for i in (0..particles.len()).filter(|&i| particles.is_real(i)) {
        let volume = particles.masses[i] / particles.densities[i];
        tension += particles.phase_gradients[i].magnitude2() * volume;
        total_volume += volume;
    }
    if total_volume > 0.0 {
        tension / total_volume.sqrt()
    } else {
        0.0
    }
}
