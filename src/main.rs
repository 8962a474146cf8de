use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use cgmath::prelude::*;

use mpsph2d::config::{DensityMethod, KernelChoice, SimulationConfig};
use mpsph2d::io::{self, StatesGrid};
use mpsph2d::setup;
use mpsph2d::sph::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: mpsph2d <config.toml>")?;
    let config = SimulationConfig::load(&config_path).with_context(|| format!("failed to load {}", config_path.display()))?;

    let smoothing_length = config.domain.smoothing_length;
    match config.solver.kernel {
        KernelChoice::Quintic => simulate(&config, QuinticSpline::new(smoothing_length)),
        KernelChoice::Cubic => simulate(&config, CubicSpline::new(smoothing_length)),
        KernelChoice::Wendland => simulate(&config, WendlandQuinticC2::new(smoothing_length)),
    }
}

fn simulate<K: Kernel + Copy + Sync + 'static>(config: &SimulationConfig, kernel: K) -> anyhow::Result<()> {
    let mut hydro = setup::build_hydrodynamics(config).context("invalid material setup")?;
    let start_time = setup::initialize_particles(&mut hydro, config, &kernel).context("failed to create particles")?;

    let controller = setup::timestep_controller(config, &hydro);
    let neighbors = setup::neighbor_grid(config);
    let mut solver: Box<dyn Solver> = match config.solver.density {
        DensityMethod::Summation => Box::new(SummationSolver::new(kernel, neighbors, controller, config.solver.multiphase, config.solver.seed)),
        DensityMethod::Continuity => Box::new(ContinuitySolver::new(kernel, neighbors, controller, config.solver.multiphase)),
    };

    let output_directory = &config.output.directory;
    std::fs::create_dir_all(output_directory).with_context(|| format!("cannot create output directory {}", output_directory.display()))?;
    let restart_path = output_directory.join("restart.rst");

    let mut time_manager = TimeManager::new(start_time, config.timing.output_interval, config.timing.end_time);
    solver.update_fields(&mut hydro);
    write_output(config, &hydro, &kernel, &restart_path, time_manager.passed_time())?;

    let start = Instant::now();
    while !time_manager.finished() {
        solver.simulation_step(&mut hydro, &mut time_manager);
        if time_manager.output_due() {
            write_output(config, &hydro, &kernel, &restart_path, time_manager.passed_time())?;
        }
    }

    log::info!(
        "finished at t = {} after {} steps in {:.1}s",
        time_manager.passed_time(),
        time_manager.num_steps(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn write_output<K: Kernel>(config: &SimulationConfig, hydro: &Hydrodynamics, kernel: &K, restart_path: &Path, time: f64) -> anyhow::Result<()> {
    log::info!(
        "t = {}: surface tension coefficient {}, |momentum| {}",
        time,
        hydro.surface_tension_coefficient(),
        hydro.total_momentum().magnitude()
    );

    let directory = &config.output.directory;
    io::write_snapshot(directory, hydro, time)?;
    let grid = StatesGrid::from_domain(&config.domain);
    let mut neighbors = setup::neighbor_grid(config);
    if config.output.states_grid {
        io::write_states(directory, hydro, &mut neighbors, kernel, &grid, time)?;
    }
    if config.output.averages {
        io::write_averages(directory, hydro, &mut neighbors, kernel, &grid, time)?;
    }
    io::write_restart(restart_path, hydro.particles(), hydro.materials(), time)?;
    Ok(())
}
