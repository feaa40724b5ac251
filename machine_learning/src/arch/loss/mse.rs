use ndarray::{Array2, ArrayView2};

use super::LossFn;

/// Mean squared error loss function.
///
/// The mean is taken over every sample and every output at once, so the loss is a single
/// scalar regardless of the amount of outputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        (&y - &y_pred)
            .mapv(|x| x.powi(2))
            .mean()
            .unwrap_or_default()
    }

    /// `-(y - y_pred) / (n_samples * n_outputs)`.
    ///
    /// The factor 2 of the true derivative is folded into the learning rate.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len() as f32;
        (&y_pred - &y) / n
    }
}
