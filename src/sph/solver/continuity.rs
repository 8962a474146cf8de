use super::super::hydrodynamics::Hydrodynamics;
use super::super::neighborhood_search::NeighborProvider;
use super::super::smoothing_kernel::Kernel;
use super::super::timemanager::{TimeManager, TimeStepController};
use super::{advance_timestep, update_change_rates, Solver};

/// Predictor-corrector with density integrated from the continuity equation.
pub struct ContinuitySolver<K: Kernel, N: NeighborProvider> {
    kernel: K,
    neighbors: N,
    controller: TimeStepController,
    multiphase: bool,
}

impl<K: Kernel + Sync, N: NeighborProvider + Sync> ContinuitySolver<K, N> {
    pub fn new(kernel: K, neighbors: N, controller: TimeStepController, multiphase: bool) -> Self {
        ContinuitySolver {
            kernel,
            neighbors,
            controller,
            multiphase,
        }
    }
}

impl<K: Kernel + Sync, N: NeighborProvider + Sync> Solver for ContinuitySolver<K, N> {
    fn update_fields(&mut self, hydro: &mut Hydrodynamics) {
        hydro.build_pairs(&mut self.neighbors, &self.kernel);
        hydro.update_state();
        hydro.update_shear_rate();
        update_change_rates(hydro, &self.kernel, self.multiphase);
    }

    fn simulation_step(&mut self, hydro: &mut Hydrodynamics, time_manager: &mut TimeManager) {
        self.update_fields(hydro);
        let dt = advance_timestep(&self.controller, hydro, time_manager);

        hydro.predictor(dt);

        // half step, same topology
        hydro.renew_pairs(&self.kernel);
        hydro.update_state();
        update_change_rates(hydro, &self.kernel, self.multiphase);

        hydro.corrector(dt);
        hydro.update_state();

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
