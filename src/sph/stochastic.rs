use super::forces::effective_transport;
use super::interaction::{InteractionPair, PairContext};
use crate::units::*;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

/// Independent Wiener increments of one pair, already scaled by sqrt(dt).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WienerIncrement {
    pub traceless_xx: Real,
    pub traceless_xy: Real,
    pub trace: Real,
}

/// Explicitly owned, seedable source of Gaussian increments.
pub struct Wiener {
    rng: SmallRng,
}

impl Wiener {
    pub fn new(seed: u64) -> Wiener {
        Wiener {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Standard normal sample.
    #[inline]
    pub fn gaussian(&mut self) -> Real {
        self.rng.sample(StandardNormal)
    }

    pub fn increment(&mut self, sqrt_dt: Real) -> WienerIncrement {
        WienerIncrement {
            traceless_xx: self.gaussian() * sqrt_dt,
            traceless_xy: self.gaussian() * sqrt_dt,
            trace: self.gaussian() * sqrt_dt,
        }
    }
}

/// Thermal momentum increment of a pair. Applied as +N/m_i to i and -N/m_j to j.
#[inline]
pub fn pair_noise(ctx: &PairContext, pair: &InteractionPair, boltzmann_constant: Real, increment: &WienerIncrement) -> Vector {
    let (i, j) = pair.indices();
    let (ti, tj) = (ctx.particles.temperatures[i], ctx.particles.temperatures[j]);
    let temperature = 2.0 * ti * tj / (ti + tj + DIVISION_EPSILON);
    let (vi, vj) = (ctx.volume(i), ctx.volume(j));
    let (eta, zeta, _) = effective_transport(ctx, pair);

    // -F >= 0, clamp away rounding noise before the square root
    let scale = (4.0 * boltzmann_constant * temperature * (vi * vi + vj * vj) * -pair.gradient_over_distance()).max(0.0);
    let shear_amplitude = (scale * eta).sqrt();
    let bulk_amplitude = (scale * zeta).sqrt();

    let e = pair.direction;
    let traceless = Vector::new(
        increment.traceless_xx * e.x + increment.traceless_xy * e.y,
        increment.traceless_xy * e.x - increment.traceless_xx * e.y,
    );
    traceless * shear_amplitude + e * (bulk_amplitude * increment.trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::*;

    #[test]
    fn gaussian_moments() {
        let mut wiener = Wiener::new(7);
        let count = 200_000;
        let samples: Vec<Real> = (0..count).map(|_| wiener.gaussian()).collect();
        let mean = samples.iter().sum::<Real>() / count as Real;
        let variance = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<Real>() / count as Real;
        assert_lt!(mean.abs(), 0.01);
        assert_lt!((variance - 1.0).abs(), 0.02);
    }

    #[test]
    fn increments_scale_with_sqrt_dt() {
        let dt: Real = 1.0e-4;
        let mut wiener = Wiener::new(99);
        let count = 100_000;
        let variance = (0..count).map(|_| wiener.increment(dt.sqrt()).trace.powi(2)).sum::<Real>() / count as Real;
        assert_lt!((variance / dt - 1.0).abs(), 0.03);
    }

    #[test]
    fn seeded_streams_repeat() {
        let mut a = Wiener::new(3);
        let mut b = Wiener::new(3);
        for _ in 0..100 {
            assert_eq!(a.increment(0.1), b.increment(0.1));
        }
    }
}
