use super::Sigmoid;

/// The swish activation, `z * sigmoid(z)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Swish {
    sigmoid: Sigmoid,
}

impl Swish {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn f(&self, z: f32) -> f32 {
        z * self.sigmoid.f(z)
    }

    pub fn df(&self, z: f32) -> f32 {
        let s = self.sigmoid.f(z);
        s + z * s * (1. - s)
    }
}
