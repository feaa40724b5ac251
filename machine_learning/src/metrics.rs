use ndarray::ArrayView2;

use crate::{MlErr, Result};

/// Root mean squared error between `a` and `b`.
///
/// # Errors
/// `SizeMismatch` if the shapes differ, `InvalidArgument` if both are empty.
pub fn rmse(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Result<f32> {
    if a.dim() != b.dim() {
        return Err(MlErr::size_mismatch("rmse operands", b.len(), a.len()));
    }

    (&a - &b)
        .mapv(|d| d.powi(2))
        .mean()
        .map(f32::sqrt)
        .ok_or_else(|| MlErr::invalid("rmse of empty arrays"))
}
