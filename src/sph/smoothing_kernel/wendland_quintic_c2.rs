use super::kernel::Kernel;
use crate::units::Real;

// https://github.com/InteractiveComputerGraphics/SPlisHSPlasH/blob/d5172c9/SPlisHSPlasH/SPHKernels.h#L545
#[derive(Copy, Clone)]
pub struct WendlandQuinticC2 {
    h: Real,
    h_inv: Real,
    normalizer: Real,
    normalizer_grad: Real,
}

impl WendlandQuinticC2 {
    pub fn new(smoothing_length: Real) -> Self {
        WendlandQuinticC2 {
            h: smoothing_length,
            h_inv: 1.0 / smoothing_length,
            normalizer: 7.0 / (std::f64::consts::PI * smoothing_length.powi(2)),
            normalizer_grad: -140.0 / (std::f64::consts::PI * smoothing_length.powi(3)),
        }
    }
}

impl Kernel for WendlandQuinticC2 {
    #[inline]
    fn smoothing_length(&self) -> Real {
        self.h
    }

    #[inline]
    fn evaluate(&self, r: Real) -> Real {
        let q = (self.h_inv * r).min(1.0);
        let one_minus_q = 1.0 - q;
        let one_minus_q_sq = one_minus_q * one_minus_q;
        self.normalizer * one_minus_q_sq * one_minus_q_sq * (4.0 * q + 1.0)
    }

    #[inline]
    fn gradient_factor(&self, r: Real) -> Real {
        let q = (r * self.h_inv).min(1.0);
        self.normalizer_grad * q * (1.0 - q).powi(3)
    }
}

generate_kernel_tests!(WendlandQuinticC2);
