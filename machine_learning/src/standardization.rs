use ndarray::prelude::*;

use crate::{MlErr, Result};

/// Per column mean and standard deviation used to rescale data to zero mean and unit variance.
///
/// Columns whose standard deviation is zero get a standard deviation of one, so they map to a
/// constant instead of dividing by zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Standardizer {
    means: Array1<f32>,
    stds: Array1<f32>,
}

impl Standardizer {
    /// Computes the statistics of every column of `a`.
    ///
    /// The standard deviation is the population one (no degrees of freedom correction).
    ///
    /// # Errors
    /// `InvalidArgument` if `a` has no rows, `NumericInstability` if a statistic is not finite.
    pub fn fit(a: ArrayView2<f32>) -> Result<Self> {
        let means = a
            .mean_axis(Axis(0))
            .ok_or_else(|| MlErr::invalid("cannot standardize an empty set of samples"))?;
        let stds = a
            .std_axis(Axis(0), 0.)
            .mapv_into(|s| if s == 0. { 1. } else { s });

        if means.iter().chain(stds.iter()).any(|v| !v.is_finite()) {
            return Err(MlErr::NumericInstability("standardization statistics"));
        }

        Ok(Self { means, stds })
    }

    pub fn means(&self) -> ArrayView1<'_, f32> {
        self.means.view()
    }

    pub fn stds(&self) -> ArrayView1<'_, f32> {
        self.stds.view()
    }

    /// `(a - means) / stds`.
    pub fn standardize(&self, a: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_cols(a.ncols())?;

        let out = (&a - &self.means) / &self.stds;
        finite(out, "standardized values")
    }

    /// `a * stds + means`, the inverse of `standardize`.
    pub fn unstandardize(&self, a: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_cols(a.ncols())?;

        let out = &a * &self.stds + &self.means;
        finite(out, "unstandardized values")
    }

    fn check_cols(&self, got: usize) -> Result<()> {
        if got != self.means.len() {
            return Err(MlErr::size_mismatch("standardized columns", got, self.means.len()));
        }

        Ok(())
    }
}

fn finite(a: Array2<f32>, what: &'static str) -> Result<Array2<f32>> {
    if a.iter().all(|v| v.is_finite()) {
        Ok(a)
    } else {
        Err(MlErr::NumericInstability(what))
    }
}
