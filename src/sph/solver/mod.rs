pub use continuity::ContinuitySolver;
pub use summation::SummationSolver;

mod continuity;
mod summation;

// ------------------------------------------------------

use super::hydrodynamics::Hydrodynamics;
use super::smoothing_kernel::Kernel;
use super::timemanager::{TimeManager, TimeStepController};

pub trait Solver {
    // performs a single simulation step.
    fn simulation_step(&mut self, hydro: &mut Hydrodynamics, time_manager: &mut TimeManager);

    // brings rates and derived fields up to date, e.g. before writing the initial state
    fn update_fields(&mut self, hydro: &mut Hydrodynamics);
}

// Rates for the current pair list. Density/pressure need to be up to date.
fn update_change_rates<K: Kernel>(hydro: &mut Hydrodynamics, kernel: &K, multiphase: bool) {
    if multiphase {
        hydro.update_interface(kernel);
    }
    hydro.update_change_rate();
}

fn advance_timestep(controller: &TimeStepController, hydro: &Hydrodynamics, time_manager: &mut TimeManager) -> crate::units::Real {
    time_manager.update_timestep(controller.timestep(hydro.particles()));
    time_manager.timestep()
}
