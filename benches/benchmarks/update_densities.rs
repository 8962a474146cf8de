use criterion::{black_box, criterion_group, Criterion};

use mpsph2d::sph::*;
use mpsph2d::units::*;

fn material(name: &str) -> Material {
    Material {
        name: name.to_string(),
        material_type: MaterialType::Liquid,
        heat_capacity: 1.0,
        shear_viscosity: 0.01,
        bulk_viscosity: 0.01,
        heat_conduction: 0.0,
        gamma: 7.0,
        b0: 1.0,
        rho0: 1.0,
        a0: 1.0,
    }
}

fn bench_update_densities(c: &mut Criterion) {
    const NUM_PARTICLES_PER_AXIS: usize = 100;
    let spacing = 1.0 / NUM_PARTICLES_PER_AXIS as Real;
    let smoothing_length = 3.0 * spacing;

    let mut hydro = Hydrodynamics::new(
        MaterialTable::new(vec![material("water"), material("oil")]),
        PairCoefficients::zeros(2),
        HydrodynamicsSettings::default(),
    );
    for y in 0..NUM_PARTICLES_PER_AXIS {
        for x in 0..NUM_PARTICLES_PER_AXIS {
            hydro.add_particle(ParticleInit {
                position: Point::new((x as Real + 0.5) * spacing, (y as Real + 0.5) * spacing),
                velocity: Vector::new(0.0, 0.0),
                density: 1.0,
                pressure: 1.0,
                temperature: 1.0,
                mass: spacing * spacing,
                material: (x * 2 / NUM_PARTICLES_PER_AXIS) as MaterialIndex,
                kind: ParticleKind::Real,
            });
        }
    }

    let kernel = black_box(QuinticSpline::new(smoothing_length));
    let mut neighbors = CellGrid::new(smoothing_length, Point::new(0.0, 0.0), Point::new(1.0, 1.0));
    hydro.build_pairs(&mut neighbors, &kernel);

    c.bench_function(
        &format!(
            "Hydrodynamics.update_density - {} particles, {} pairs",
            hydro.particles().len(),
            hydro.interactions().len()
        ),
        |b| b.iter(|| hydro.update_density(&kernel)),
    );

    c.bench_function(
        &format!("Hydrodynamics.build_pairs - {} particles", hydro.particles().len()),
        |b| b.iter(|| hydro.build_pairs(&mut neighbors, &kernel)),
    );
}

criterion_group!(update_densities, bench_update_densities);
