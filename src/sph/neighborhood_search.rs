use super::particles::ParticleIndex;
use crate::units::*;
use cgmath::prelude::*;
use rayon::prelude::*;

/// Spatial index answering "which particles are within the smoothing length of P".
pub trait NeighborProvider {
    /// Radius that determines if a point is a neighbor.
    fn radius(&self) -> Real;

    /// Re-bins all positions. Needs to be called whenever positions moved before the next query.
    fn update(&mut self, positions: &[Point]);

    /// Calls `f` for every particle with |position - r_j| <= radius, including a particle located exactly at `position`.
    fn foreach_neighbor(&self, positions: &[Point], position: Point, f: impl FnMut(ParticleIndex));

    /// Clears `candidates` and fills it with all neighbors of `position`.
    fn collect_neighbors(&self, positions: &[Point], position: Point, candidates: &mut Vec<ParticleIndex>) {
        candidates.clear();
        self.foreach_neighbor(positions, position, |j| candidates.push(j));
    }
}

pub type CellIndex = u32;

#[derive(Copy, Clone)]
struct Particle {
    pidx: ParticleIndex,
    cidx: CellIndex,
}

#[derive(Copy, Clone)]
struct CellPos {
    x: u32,
    y: u32,
}

struct GridProperties {
    radius: Real,
    cell_size_inv: Real,
    grid_min: Point,
    num_cells_x: u32,
    num_cells_y: u32,
}
impl GridProperties {
    // Positions outside of the grid are clamped to the border cells, which keeps queries correct (just slower).
    #[inline]
    fn position_to_cellpos(&self, position: Point) -> CellPos {
        let cellspace = (position - self.grid_min) * self.cell_size_inv;
        CellPos {
            x: (cellspace.x.max(0.0) as u32).min(self.num_cells_x - 1),
            y: (cellspace.y.max(0.0) as u32).min(self.num_cells_y - 1),
        }
    }

    #[inline]
    fn to_cidx(&self, cell: CellPos) -> CellIndex {
        cell.y * self.num_cells_x + cell.x
    }

    #[inline]
    fn position_to_cidx(&self, position: Point) -> CellIndex {
        self.to_cidx(self.position_to_cellpos(position))
    }

    fn num_cells(&self) -> usize {
        (self.num_cells_x * self.num_cells_y) as usize
    }
}

/// Uniform cell grid with cell size >= search radius.
///
/// Particles are sorted by cell index, each cell stores the range of its particles.
pub struct CellGrid {
    grid: GridProperties,
    particles: Vec<Particle>,
    cell_starts: Vec<ParticleIndex>, // num_cells + 1 entries, last one is a sentinel
}

impl CellGrid {
    /// * radius:       Radius that determines if a point is a neighbor
    /// * domain_min/max: Expected extent of all particles. Particles outside still work, but pile up in border cells.
    pub fn new(radius: Real, domain_min: Point, domain_max: Point) -> CellGrid {
        let cell_size = radius;
        // one extra cell of margin on each side
        let grid_min = domain_min - Vector::new(cell_size, cell_size);
        let extent = (domain_max - domain_min) / cell_size;
        let num_cells_x = (extent.x.max(0.0).ceil() as u32 + 2).max(1);
        let num_cells_y = (extent.y.max(0.0).ceil() as u32 + 2).max(1);

        CellGrid {
            grid: GridProperties {
                radius,
                cell_size_inv: 1.0 / cell_size,
                grid_min,
                num_cells_x,
                num_cells_y,
            },
            particles: Vec::new(),
            cell_starts: vec![0; (num_cells_x * num_cells_y) as usize + 1],
        }
    }

    pub fn num_cells(&self) -> usize {
        self.grid.num_cells()
    }
}

impl NeighborProvider for CellGrid {
    fn radius(&self) -> Real {
        self.grid.radius
    }

    fn update(&mut self, positions: &[Point]) {
        let grid = &self.grid;
        self.particles.clear();
        self.particles.par_extend(positions.par_iter().enumerate().map(|(pidx, &position)| Particle {
            pidx: pidx as ParticleIndex,
            cidx: grid.position_to_cidx(position),
        }));

        // Sort by cell index, ties by particle index to keep neighbor order deterministic.
        self.particles.par_sort_unstable_by_key(|p| (p.cidx, p.pidx));

        // create cells
        self.cell_starts.clear();
        self.cell_starts.resize(self.grid.num_cells() + 1, 0);
        for p in self.particles.iter() {
            self.cell_starts[p.cidx as usize + 1] += 1;
        }
        for cidx in 0..self.grid.num_cells() {
            self.cell_starts[cidx + 1] += self.cell_starts[cidx];
        }
    }

    fn foreach_neighbor(&self, positions: &[Point], position: Point, mut f: impl FnMut(ParticleIndex)) {
        let radius_sq = self.grid.radius * self.grid.radius;
        let center = self.grid.position_to_cellpos(position);

        let y_min = center.y.saturating_sub(1);
        let y_max = (center.y + 1).min(self.grid.num_cells_y - 1);
        let x_min = center.x.saturating_sub(1);
        let x_max = (center.x + 1).min(self.grid.num_cells_x - 1);

        for y in y_min..=y_max {
            // cells of a row are contiguous, so is their particle range
            let first_particle = self.cell_starts[self.grid.to_cidx(CellPos { x: x_min, y }) as usize];
            let last_particle = self.cell_starts[self.grid.to_cidx(CellPos { x: x_max, y }) as usize + 1];
            for p in &self.particles[first_particle as usize..last_particle as usize] {
                if positions[p.pidx as usize].distance2(position) <= radius_sq {
                    f(p.pidx);
                }
            }
        }
    }
}
