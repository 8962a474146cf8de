use super::material::MaterialIndex;
use crate::units::*;

/// Interaction coefficients for an ordered material pair (a, b).
///
/// Same-material entries are expected to be configured as zero; nothing here special-cases a == b.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PairCoefficient {
    pub epsilon: Real,    // conservative interfacial repulsion
    pub sigma: Real,      // surface tension, weights the phase gradient
    pub shear_slip: Real, // slip lengths at the interface
    pub bulk_slip: Real,
    pub heat_slip: Real,
}

/// Dense N×N matrix of [`PairCoefficient`]. Not assumed to be symmetric.
#[derive(Clone, Debug)]
pub struct PairCoefficients {
    num_materials: usize,
    coefficients: Vec<PairCoefficient>,
}

impl PairCoefficients {
    pub fn zeros(num_materials: usize) -> PairCoefficients {
        PairCoefficients {
            num_materials,
            coefficients: vec![Default::default(); num_materials * num_materials],
        }
    }

    pub fn num_materials(&self) -> usize {
        self.num_materials
    }

    #[inline]
    pub fn get(&self, a: MaterialIndex, b: MaterialIndex) -> &PairCoefficient {
        &self.coefficients[a * self.num_materials + b]
    }

    pub fn set(&mut self, a: MaterialIndex, b: MaterialIndex, coefficient: PairCoefficient) {
        self.coefficients[a * self.num_materials + b] = coefficient;
    }

    pub fn max_surface_tension(&self) -> Real {
        self.coefficients.iter().map(|c| c.sigma).fold(0.0, Real::max)
    }
}

/// Harmonic mean of two transport coefficients, reduced by the interface slip length.
/// Vanishes when either coefficient vanishes.
#[inline]
pub fn effective_coefficient(ca: Real, cb: Real, slip: Real, r: Real) -> Real {
    2.0 * ca * cb * r / ((ca + cb) * (r + 2.0 * slip) + DIVISION_EPSILON)
}
