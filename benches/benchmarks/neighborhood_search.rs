use cgmath::prelude::*;
use criterion::{black_box, criterion_group, Criterion};
use rand::prelude::*;

use mpsph2d::sph::{CellGrid, NeighborProvider};
use mpsph2d::units::*;

fn bench_neighborhood_search(c: &mut Criterion) {
    const NUM_POSITIONS: usize = 20000;
    const DENSITY: Real = 10.0;
    let search_radius = black_box(1.0);
    let extent = (NUM_POSITIONS as Real / DENSITY).sqrt();

    let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(123456789);
    let positions: Vec<Point> = std::iter::repeat_with(|| Point::from_vec(rng.gen::<Vector>() * extent))
        .take(NUM_POSITIONS)
        .collect();

    let mut grid = CellGrid::new(search_radius, Point::new(0.0, 0.0), Point::new(extent, extent));
    grid.update(&positions);

    c.bench_function(
        &format!(
            "CellGrid.update (warm), {} positions, {} density, {} search_radius",
            NUM_POSITIONS, DENSITY, search_radius
        ),
        |b| b.iter(|| grid.update(&positions)),
    );

    c.bench_function(
        &format!(
            "CellGrid.foreach_neighbor, {} positions, {} density, {} search_radius",
            NUM_POSITIONS, DENSITY, search_radius
        ),
        |b| {
            let mut pindex = 0; // cycle through position for a more balanced result
            b.iter(|| {
                let mut accum: Vector = Zero::zero();
                grid.foreach_neighbor(&positions, positions[pindex], |j| {
                    accum += positions[j as usize].to_vec();
                });
                pindex = (pindex + 1) % NUM_POSITIONS;
                accum
            })
        },
    );
}

fn config() -> Criterion {
    Criterion::default().warm_up_time(core::time::Duration::new(0, 1000))
}

criterion_group!(
    name = neighborhood_search;
    config = config();
    targets = bench_neighborhood_search
);
