use ndarray::prelude::*;

use super::loss::LossFn;
use crate::Result;

/// A pure computational model.
///
/// A `Model` defines how to evaluate a function and compute parameter gradients. It does not
/// own parameters, the flat parameter and gradient buffers are always handed in by the caller.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data, one sample per row.
    ///
    /// # Returns
    /// Every intermediate value the backward pass needs, or an error on a shape violation.
    fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<ForwardPass>;

    /// Computes the gradient of `loss_fn` with respect to every parameter, **overwriting**
    /// `grad`.
    ///
    /// # Arguments
    /// * `params` - The parameters `pass` was computed with.
    /// * `pass` - The result of the matching forward pass.
    /// * `y` - The expected output.
    /// * `loss_fn` - The loss function.
    /// * `grad` - A buffer for writing the computed gradient.
    fn backward<L: LossFn>(
        &self,
        params: &[f32],
        pass: &ForwardPass,
        y: ArrayView2<f32>,
        loss_fn: &L,
        grad: &mut [f32],
    ) -> Result<()>;
}

/// The values computed by a forward pass.
///
/// `outputs()[0]` is the input itself and `outputs()[i]` the output of layer `i - 1`, the last
/// one being the output of the model. `sums()[i]` holds the weighted sums of layer `i` before
/// its activation.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardPass {
    outputs: Vec<Array2<f32>>,
    sums: Vec<Array2<f32>>,
}

impl ForwardPass {
    pub(crate) fn new(x: Array2<f32>) -> Self {
        Self {
            outputs: vec![x],
            sums: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, z: Array2<f32>, a: Array2<f32>) {
        self.sums.push(z);
        self.outputs.push(a);
    }

    pub fn outputs(&self) -> &[Array2<f32>] {
        &self.outputs
    }

    pub fn sums(&self) -> &[Array2<f32>] {
        &self.sums
    }

    pub fn output(&self) -> ArrayView2<'_, f32> {
        self.outputs[self.outputs.len() - 1].view()
    }
}
