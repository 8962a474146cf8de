use super::kernel::Kernel;
use crate::units::Real;

/// Quintic spline smoothing kernel.
///
/// "J. Morris, P. Fox, Y. Zhu, Modeling Low Reynolds Number Incompressible Flows Using SPH", JCP 136 (1997).
/// Written in terms of s = 3r/h, so the support ends at the smoothing length h.
#[derive(Copy, Clone)]
pub struct QuinticSpline {
    h: Real,
    three_h_inv: Real,
    normalizer: Real,
    normalizer_grad: Real,
}

impl QuinticSpline {
    pub fn new(smoothing_length: Real) -> QuinticSpline {
        let normalizer = 63.0 / (478.0 * std::f64::consts::PI * smoothing_length * smoothing_length);
        QuinticSpline {
            h: smoothing_length,
            three_h_inv: 3.0 / smoothing_length,
            normalizer,
            normalizer_grad: -15.0 * normalizer / smoothing_length,
        }
    }
}

impl Kernel for QuinticSpline {
    #[inline]
    fn smoothing_length(&self) -> Real {
        self.h
    }

    #[inline]
    fn evaluate(&self, r: Real) -> Real {
        let s = r * self.three_h_inv;
        if s < 1.0 {
            self.normalizer * ((3.0 - s).powi(5) - 6.0 * (2.0 - s).powi(5) + 15.0 * (1.0 - s).powi(5))
        } else if s < 2.0 {
            self.normalizer * ((3.0 - s).powi(5) - 6.0 * (2.0 - s).powi(5))
        } else if s < 3.0 {
            self.normalizer * (3.0 - s).powi(5)
        } else {
            0.0
        }
    }

    #[inline]
    fn gradient_factor(&self, r: Real) -> Real {
        let s = r * self.three_h_inv;
        if s < 1.0 {
            self.normalizer_grad * ((3.0 - s).powi(4) - 6.0 * (2.0 - s).powi(4) + 15.0 * (1.0 - s).powi(4))
        } else if s < 2.0 {
            self.normalizer_grad * ((3.0 - s).powi(4) - 6.0 * (2.0 - s).powi(4))
        } else if s < 3.0 {
            self.normalizer_grad * (3.0 - s).powi(4)
        } else {
            0.0
        }
    }
}

generate_kernel_tests!(QuinticSpline);
