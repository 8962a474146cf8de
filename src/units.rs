// Simulation runs in non-dimensional units, double precision throughout.
pub type Real = f64;
pub type Point = cgmath::Point2<Real>;
pub type Vector = cgmath::Vector2<Real>;

// Guards divisions by vanishing distances/gradients.
pub const DIVISION_EPSILON: Real = 1.0e-30;
