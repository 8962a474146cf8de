pub use self::hydrodynamics::{Gravity, Hydrodynamics, HydrodynamicsSettings, SampledState};
pub use self::interaction::{InteractionList, InteractionPair, PairContext};
pub use self::material::{Material, MaterialIndex, MaterialTable, MaterialType};
pub use self::neighborhood_search::{CellGrid, NeighborProvider};
pub use self::pair_coefficients::{effective_coefficient, PairCoefficient, PairCoefficients};
pub use self::particles::{ParticleIndex, ParticleInit, ParticleKind, ParticleView, Particles, PhaseMatrices};
pub use self::smoothing_kernel::{CubicSpline, Kernel, QuinticSpline, WendlandQuinticC2};
pub use self::solver::*;
pub use self::stochastic::{Wiener, WienerIncrement};
pub use self::timemanager::{TimeManager, TimeStepController};

pub mod accumulator;
pub mod forces;
mod hydrodynamics;
mod interaction;
mod material;
pub mod neighborhood_search;
mod pair_coefficients;
mod particles;
pub mod phase;
pub mod smoothing_kernel;
mod solver;
mod stochastic;
mod timemanager;
