use crate::Result;

/// An update rule for a flat parameter vector.
pub trait Optimizer {
    /// Takes one step, modifying `params` in place.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient of the objective at `params`.
    ///
    /// # Errors
    /// `SizeMismatch` if `grad` and `params` differ in length.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}

/// A scalar function of a flat parameter vector and its gradient.
///
/// The gradient of a point can only be asked for with whatever `error` returned for that same
/// point, so any value the gradient needs from the evaluation travels explicitly.
pub trait Objective {
    /// The by-product of `error` that `gradient` reuses.
    type Forward;

    /// Evaluates the objective at `params`.
    fn error(&mut self, params: &[f32]) -> Result<(f32, Self::Forward)>;

    /// Computes the gradient at `params`, `forward` being what `error` returned for them.
    fn gradient(&mut self, params: &[f32], forward: &Self::Forward) -> Result<&[f32]>;
}
