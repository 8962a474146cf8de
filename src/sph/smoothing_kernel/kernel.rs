use crate::units::{Real, Vector};

/// SPH smoothing kernel
///
/// Only radially symmetric kernels with compact support are supported.
/// Both weight and gradient factor vanish for r >= smoothing length.
pub trait Kernel {
    /// Support radius, i.e. the distance beyond which particles don't interact.
    fn smoothing_length(&self) -> Real;

    /// Kernel weight W(r). Never negative.
    /// `r`:        distance between the two particles
    fn evaluate(&self, r: Real) -> Real;

    /// First derivative dW/dr. Zero or negative, which makes pressure terms repulsive.
    /// `r`:        distance between the two particles
    fn gradient_factor(&self, r: Real) -> Real;

    /// Gradient of W with respect to the position of i.
    /// `rj_to_ri`: Vector from position j to position i, so ri - rj. Not normalized!
    #[inline]
    fn gradient(&self, rj_to_ri: Vector, r: Real) -> Vector {
        rj_to_ri * (self.gradient_factor(r) / (r + crate::units::DIVISION_EPSILON))
    }
}

// Shared property tests for all kernels.
// Each kernel type needs a `new(smoothing_length)` constructor.
macro_rules! generate_kernel_tests {
    ($kernel_type:ident) => {
    };
}
