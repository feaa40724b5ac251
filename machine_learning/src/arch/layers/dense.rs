use std::ops::Range;

use ndarray::{ArrayView2, ArrayViewMut2, linalg, prelude::*};

use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer.
///
/// The layer owns no parameters, it only knows where its window lives inside a flat buffer.
/// That window is read as a `(n_in + 1, n_out)` matrix whose row 0 holds the biases and whose
/// remaining rows hold the weights. The same window is used on the parameter buffer and on the
/// gradient buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Dense {
    offset: usize,
    dim: (usize, usize),
    size: usize,
    act_fn: Option<ActFn>,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `offset` - The position of this layer's first parameter in the flat buffer.
    /// * `dim` - The amount of inputs and units of the layer.
    /// * `act_fn` - The activation applied to the weighted sums, `None` for a linear output.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(offset: usize, dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            offset,
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The shape of this layer's window, bias row included.
    pub fn shape(&self) -> (usize, usize) {
        (self.dim.0 + 1, self.dim.1)
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    /// The extent of this layer inside the flat buffer.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }

    /// Gives a view of this layer's window of `buf`.
    ///
    /// # Errors
    /// `SizeMismatch` if `buf` is too short to hold this layer.
    pub fn view<'a>(&self, buf: &'a [f32]) -> Result<ArrayView2<'a, f32>> {
        let raw = buf
            .get(self.range())
            .ok_or_else(|| MlErr::size_mismatch("layer buffer", buf.len(), self.range().end))?;

        Ok(ArrayView2::from_shape(self.shape(), raw)?)
    }

    /// Gives a mutable view of this layer's window of `buf`.
    ///
    /// # Errors
    /// `SizeMismatch` if `buf` is too short to hold this layer.
    pub fn view_mut<'a>(&self, buf: &'a mut [f32]) -> Result<ArrayViewMut2<'a, f32>> {
        let len = buf.len();
        let raw = buf
            .get_mut(self.range())
            .ok_or_else(|| MlErr::size_mismatch("layer buffer", len, self.range().end))?;

        Ok(ArrayViewMut2::from_shape(self.shape(), raw)?)
    }

    /// Computes `x @ w + b`.
    pub fn weighted_sum(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_cols("layer input", x.ncols(), self.dim.0)?;

        let wb = self.view(params)?;
        let (b, w) = wb.split_at(Axis(0), 1);

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        Ok(z)
    }

    /// Applies the activation function to the weighted sums, a copy of them for linear layers.
    pub fn activate(&self, z: &Array2<f32>) -> Array2<f32> {
        match self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        }
    }

    /// Writes this layer's gradient into its window of `grad`.
    ///
    /// # Arguments
    /// * `grad` - The flat gradient buffer.
    /// * `x` - The input this layer received on the forward pass.
    /// * `d` - The delta of this layer's weighted sums.
    pub fn backward(&self, grad: &mut [f32], x: ArrayView2<f32>, d: ArrayView2<f32>) -> Result<()> {
        self.check_cols("layer input", x.ncols(), self.dim.0)?;
        self.check_cols("layer delta", d.ncols(), self.dim.1)?;
        if x.nrows() != d.nrows() {
            return Err(MlErr::size_mismatch("delta rows", d.nrows(), x.nrows()));
        }

        let g = self.view_mut(grad)?;
        let (mut db, mut dw) = g.split_at(Axis(0), 1);

        linalg::general_mat_mul(1.0, &x.t(), &d, 0.0, &mut dw);
        db.row_mut(0).assign(&d.sum_axis(Axis(0)));

        Ok(())
    }

    /// Propagates a delta back through the weights, `d @ w^T`.
    ///
    /// The caller is in charge of multiplying by the previous layer's activation derivative.
    pub fn propagate(&self, params: &[f32], d: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_cols("layer delta", d.ncols(), self.dim.1)?;

        let wb = self.view(params)?;
        let (_, w) = wb.split_at(Axis(0), 1);

        Ok(d.dot(&w.t()))
    }

    fn check_cols(&self, what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(MlErr::size_mismatch(what, got, expected));
        }

        Ok(())
    }
}
