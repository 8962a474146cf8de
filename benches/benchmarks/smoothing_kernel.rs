use criterion::{black_box, criterion_group, Criterion};

use cgmath::prelude::*;
use mpsph2d::sph::smoothing_kernel::*;
use mpsph2d::units::*;

fn bench_kernel<K: Kernel>(c: &mut Criterion, name: &str, kernel: K) {
    let rj_to_ri = black_box(Vector::new(0.3, 0.1));
    let r = black_box(rj_to_ri.magnitude());

    let kernel = black_box(kernel);
    c.bench_function(&format!("{}.evaluate", name), |b| b.iter(|| kernel.evaluate(r)));
    c.bench_function(&format!("{}.gradient", name), |b| b.iter(|| kernel.gradient(rj_to_ri, r)));
}

fn bench_kernels(c: &mut Criterion) {
    let smoothing_length = black_box(1.0);
    bench_kernel(c, "CubicSpline", CubicSpline::new(smoothing_length));
    bench_kernel(c, "QuinticSpline", QuinticSpline::new(smoothing_length));
    bench_kernel(c, "WendlandQuinticC2", WendlandQuinticC2::new(smoothing_length));
}

fn config() -> Criterion {
    Criterion::default()
        .warm_up_time(core::time::Duration::new(0, 100))
        .sample_size(1000)
        .significance_level(0.1)
}

criterion_group!(
    name = smoothing_kernel;
    config = config();
    targets = bench_kernels
);
