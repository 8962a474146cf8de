use super::super::hydrodynamics::Hydrodynamics;
use super::super::neighborhood_search::NeighborProvider;
use super::super::smoothing_kernel::Kernel;
use super::super::stochastic::Wiener;
use super::super::timemanager::{TimeManager, TimeStepController};
use super::{advance_timestep, update_change_rates, Solver};

/// Predictor-corrector with summation density and optional thermal fluctuations.
pub struct SummationSolver<K: Kernel, N: NeighborProvider> {
    kernel: K,
    neighbors: N,
    controller: TimeStepController,
    multiphase: bool,
    wiener: Wiener,
}

impl<K: Kernel + Sync, N: NeighborProvider + Sync> SummationSolver<K, N> {
    pub fn new(kernel: K, neighbors: N, controller: TimeStepController, multiphase: bool, seed: u64) -> Self {
        SummationSolver {
            kernel,
            neighbors,
            controller,
            multiphase,
            wiener: Wiener::new(seed),
        }
    }

    fn update_density_and_rates(&mut self, hydro: &mut Hydrodynamics) {
        hydro.update_density(&self.kernel);
        hydro.update_state();
        update_change_rates(hydro, &self.kernel, self.multiphase);
    }
}

impl<K: Kernel + Sync, N: NeighborProvider + Sync> Solver for SummationSolver<K, N> {
    fn update_fields(&mut self, hydro: &mut Hydrodynamics) {
        hydro.build_pairs(&mut self.neighbors, &self.kernel);
        hydro.update_density(&self.kernel);
        hydro.update_state();
        hydro.update_shear_rate();
        update_change_rates(hydro, &self.kernel, self.multiphase);
    }

    fn simulation_step(&mut self, hydro: &mut Hydrodynamics, time_manager: &mut TimeManager) {
        self.update_fields(hydro);
        let dt = advance_timestep(&self.controller, hydro, time_manager);

        if hydro.boltzmann_constant() > 0.0 {
            hydro.update_random(dt, &mut self.wiener);
        }
        hydro.predictor_summation(dt);

        // half step, same topology
        hydro.renew_pairs(&self.kernel);
        self.update_density_and_rates(hydro);

        hydro.corrector_summation(dt);

        time_manager.update_time();
        log::debug!(
            "step {}: t = {}, dt = {}, {} pairs",
            time_manager.num_steps(),
            time_manager.passed_time(),
            dt,
            hydro.interactions().len()
        );
    }
}
