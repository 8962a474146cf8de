use super::material::MaterialTable;
use super::neighborhood_search::NeighborProvider;
use super::pair_coefficients::PairCoefficients;
use super::particles::{ParticleIndex, Particles};
use super::smoothing_kernel::Kernel;
use crate::units::*;
use cgmath::prelude::*;
use rayon::prelude::*;

/// Two interacting particles plus the kernel values for their current separation.
///
/// Only holds indices, the particle data stays in [`Particles`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InteractionPair {
    pub i: ParticleIndex,
    pub j: ParticleIndex,
    pub distance: Real,
    pub direction: Vector, // e_ij, unit vector from j to i
    pub weight: Real,      // W(r)
    pub gradient: Real,    // dW/dr(r), never positive
}

impl InteractionPair {
    #[inline]
    pub fn new(i: ParticleIndex, j: ParticleIndex, positions: &[Point], kernel: &impl Kernel) -> InteractionPair {
        let rj_to_ri = positions[i as usize] - positions[j as usize];
        let distance = rj_to_ri.magnitude();
        InteractionPair {
            i,
            j,
            distance,
            direction: rj_to_ri / (distance + DIVISION_EPSILON),
            weight: kernel.evaluate(distance),
            gradient: kernel.gradient_factor(distance),
        }
    }

    /// dW/dr / r
    #[inline]
    pub fn gradient_over_distance(&self) -> Real {
        self.gradient / (self.distance + DIVISION_EPSILON)
    }

    #[inline]
    pub fn indices(&self) -> (usize, usize) {
        (self.i as usize, self.j as usize)
    }
}

/// Read-only state shared by all per-pair terms.
#[derive(Copy, Clone)]
pub struct PairContext<'a> {
    pub particles: &'a Particles,
    pub materials: &'a MaterialTable,
    pub coefficients: &'a PairCoefficients,
}

impl<'a> PairContext<'a> {
    /// V = m / ρ
    #[inline]
    pub fn volume(&self, particle: usize) -> Real {
        self.particles.masses[particle] / self.particles.densities[particle]
    }
}

/// The set of distinct unordered particle pairs within smoothing length.
///
/// Topology only changes on [`InteractionList::rebuild`], never implicitly with particle motion.
#[derive(Default)]
pub struct InteractionList {
    pairs: Vec<InteractionPair>,
}

impl InteractionList {
    pub fn new() -> InteractionList {
        InteractionList { pairs: Vec::new() }
    }

    pub fn pairs(&self) -> &[InteractionPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Discards all pairs and queries the (already updated) neighbor provider for a fresh set.
    ///
    /// Each unordered pair shows up exactly once with i < j, ordered by i then j.
    pub fn rebuild<N, K>(&mut self, positions: &[Point], neighbors: &N, kernel: &K)
    where
        N: NeighborProvider + Sync,
        K: Kernel + Sync,
    {
        self.pairs.clear();
        self.pairs.par_extend((0..positions.len()).into_par_iter().flat_map_iter(|i| {
            let i = i as ParticleIndex;
            let mut partners = Vec::new();
            neighbors.foreach_neighbor(positions, positions[i as usize], |j| {
                if j > i {
                    partners.push(j);
                }
            });
            partners.sort_unstable();
            partners.into_iter().map(move |j| InteractionPair::new(i, j, positions, kernel))
        }));
        log::trace!("rebuilt interaction list with {} pairs", self.pairs.len());
    }

    /// Re-evaluates the cached kernel values from current positions, keeping the pair set.
    pub fn renew<K: Kernel + Sync>(&mut self, positions: &[Point], kernel: &K) {
        self.pairs.par_iter_mut().for_each(|pair| {
            *pair = InteractionPair::new(pair.i, pair.j, positions, kernel);
        });
        log::trace!("renewed {} interaction pairs", self.pairs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sph::neighborhood_search::CellGrid;
    use crate::sph::smoothing_kernel::QuinticSpline;
    use more_asserts::*;
    use rand::prelude::*;

    fn jittered_lattice(count_per_axis: usize, spacing: Real) -> Vec<Point> {
        let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(42);
        let mut positions = Vec::new();
        for y in 0..count_per_axis {
            for x in 0..count_per_axis {
                let jitter = Vector::new(rng.gen::<Real>() - 0.5, rng.gen::<Real>() - 0.5) * spacing * 0.2;
                positions.push(Point::new(x as Real * spacing, y as Real * spacing) + jitter);
            }
        }
        positions
    }

    #[test]
    fn pairs_are_distinct_and_in_range() {
        let smoothing_length = 0.3;
        let positions = jittered_lattice(12, 0.1);
        let kernel = QuinticSpline::new(smoothing_length);
        let mut grid = CellGrid::new(smoothing_length, Point::new(0.0, 0.0), Point::new(1.2, 1.2));
        grid.update(&positions);

        let mut list = InteractionList::new();
        list.rebuild(&positions, &grid, &kernel);
        assert!(!list.is_empty());

        let mut brute_force_count = 0;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if positions[i].distance(positions[j]) <= smoothing_length {
                    brute_force_count += 1;
                }
            }
        }
        assert_eq!(list.len(), brute_force_count);
        for pair in list.pairs() {
            assert_lt!(pair.i, pair.j);
            assert_le!(pair.distance, smoothing_length);
            assert_le!(pair.gradient, 0.0);
        }
    }

    #[test]
    fn rebuild_and_renew_agree() {
        let smoothing_length = 0.3;
        let mut positions = jittered_lattice(10, 0.1);
        let kernel = QuinticSpline::new(smoothing_length);
        let mut grid = CellGrid::new(smoothing_length, Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        grid.update(&positions);

        let mut renewed = InteractionList::new();
        renewed.rebuild(&positions, &grid, &kernel);

        // move slightly, renew, then compare against a rebuild restricted to the same topology
        for (k, position) in positions.iter_mut().enumerate() {
            *position += Vector::new(0.001 * (k % 3) as Real, -0.0005 * (k % 5) as Real);
        }
        renewed.renew(&positions, &kernel);

        for pair in renewed.pairs() {
            let fresh = InteractionPair::new(pair.i, pair.j, &positions, &kernel);
            assert_eq!(*pair, fresh);
        }

        // at unchanged positions rebuild and renew are identical
        let mut rebuilt = InteractionList::new();
        grid.update(&positions);
        rebuilt.rebuild(&positions, &grid, &kernel);
        let mut renewed_again = InteractionList::new();
        renewed_again.rebuild(&positions, &grid, &kernel);
        renewed_again.renew(&positions, &kernel);
        assert_eq!(rebuilt.pairs(), renewed_again.pairs());
    }

    #[test]
    fn direction_points_from_j_to_i() {
        let positions = vec![Point::new(0.2, 0.0), Point::new(0.0, 0.0)];
        let kernel = QuinticSpline::new(0.3);
        let pair = InteractionPair::new(0, 1, &positions, &kernel);
        assert_lt!((pair.direction.x - 1.0).abs(), 1.0e-12);
        assert_eq!(pair.direction.y, 0.0);
        assert_lt!((pair.distance - 0.2).abs(), 1.0e-12);
    }
}
