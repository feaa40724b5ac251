/// The hyperbolic tangent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tanh;

impl Tanh {
    pub fn new() -> Self {
        Self
    }

    pub fn f(&self, z: f32) -> f32 {
        z.tanh()
    }

    /// `1 - tanh(z)^2`, the same value as `1 - y^2` over the cached output `y`.
    pub fn df(&self, z: f32) -> f32 {
        1. - z.tanh().powi(2)
    }
}
