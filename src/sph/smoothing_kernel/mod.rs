/// Smoothing Kernels.
#[macro_use]
mod kernel;

pub use self::cubic::CubicSpline;
pub use self::kernel::Kernel;
pub use self::quintic::QuinticSpline;
pub use self::wendland_quintic_c2::WendlandQuinticC2;

mod cubic;
mod quintic;
mod wendland_quintic_c2;
