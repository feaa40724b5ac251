use ndarray::prelude::*;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

use super::{
    Model,
    activations::ActFn,
    layers::Dense,
    loss::LossFn,
    model::ForwardPass,
};
use crate::{MlErr, Result};

/// A sequential stack of dense layers: information flows forward when computing an output and
/// backward when computing the *deltas* of its layers.
///
/// Every hidden layer applies the same activation function, the output layer is linear. The
/// layers' windows are laid out one after the other, in order, so together they cover a flat
/// buffer of `size()` values with no gaps nor overlaps.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequential {
    n_inputs: usize,
    hidden: Vec<usize>,
    n_outputs: usize,
    act_fn: ActFn,
    layers: Vec<Dense>,
    size: usize,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `n_inputs` - The width of the input.
    /// * `hidden` - The width of every hidden layer, `[]` and `[0]` both mean no hidden layers,
    ///   that is, a linear model.
    /// * `n_outputs` - The width of the output.
    /// * `act_fn` - The activation function of the hidden layers.
    ///
    /// # Returns
    /// A new `Sequential` instance or `InvalidArgument` if any width is zero.
    pub fn new(n_inputs: usize, hidden: &[usize], n_outputs: usize, act_fn: ActFn) -> Result<Self> {
        if n_inputs == 0 || n_outputs == 0 {
            return Err(MlErr::invalid(format!(
                "a network needs inputs and outputs, got {n_inputs} inputs and {n_outputs} outputs"
            )));
        }

        let hidden = match hidden {
            [0] => Vec::new(),
            widths if widths.contains(&0) => {
                return Err(MlErr::invalid(format!(
                    "hidden layers must have at least one unit, got {widths:?}"
                )));
            }
            widths => widths.to_vec(),
        };

        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut offset = 0;
        let mut n_in = n_inputs;

        for &units in &hidden {
            let layer = Dense::new(offset, (n_in, units), Some(act_fn));
            offset += layer.size();
            n_in = units;
            layers.push(layer);
        }

        let output = Dense::new(offset, (n_in, n_outputs), None);
        offset += output.size();
        layers.push(output);

        Ok(Self {
            n_inputs,
            hidden,
            n_outputs,
            act_fn,
            layers,
            size: offset,
        })
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    /// The normalized hidden widths, empty for a linear model.
    pub fn hidden(&self) -> &[usize] {
        &self.hidden
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn act_fn(&self) -> ActFn {
        self.act_fn
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Samples a fresh parameter vector.
    ///
    /// Every value of a layer is drawn from `U[0, 1)` and divided by `sqrt(n_in + 1)`, so layers
    /// with a larger fan-in start with smaller weights.
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let uniform =
            Uniform::new(0f32, 1f32).map_err(|e| MlErr::invalid(format!("uniform: {e}")))?;
        let mut params = Vec::with_capacity(self.size);

        for layer in &self.layers {
            let shape = layer.shape();
            let scale = (shape.0 as f32).sqrt();
            let w = Array2::<f32>::random_using(shape, &uniform, rng) / scale;
            params.extend(w.iter());
        }

        Ok(params)
    }

    /// Splits `buf` into one read only window per layer.
    pub fn views<'a>(&self, buf: &'a [f32]) -> Result<Vec<ArrayView2<'a, f32>>> {
        self.check_len("parameters", buf.len())?;
        self.layers.iter().map(|layer| layer.view(buf)).collect()
    }

    /// Splits `buf` into one mutable window per layer.
    pub fn views_mut<'a>(&self, buf: &'a mut [f32]) -> Result<Vec<ArrayViewMut2<'a, f32>>> {
        self.check_len("parameters", buf.len())?;

        let mut rest = buf;
        let mut views = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let (chunk, tail) = rest.split_at_mut(layer.size());
            views.push(ArrayViewMut2::from_shape(layer.shape(), chunk)?);
            rest = tail;
        }

        Ok(views)
    }

    fn check_len(&self, what: &'static str, len: usize) -> Result<()> {
        if len != self.size {
            return Err(MlErr::size_mismatch(what, len, self.size));
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<ForwardPass> {
        self.check_len("parameters", params.len())?;

        let mut pass = ForwardPass::new(x.to_owned());
        for layer in &self.layers {
            let z = layer.weighted_sum(params, pass.output())?;
            let a = layer.activate(&z);
            pass.push(z, a);
        }

        Ok(pass)
    }

    fn backward<L: LossFn>(
        &self,
        params: &[f32],
        pass: &ForwardPass,
        y: ArrayView2<f32>,
        loss_fn: &L,
        grad: &mut [f32],
    ) -> Result<()> {
        self.check_len("parameters", params.len())?;
        self.check_len("gradient", grad.len())?;

        let nlayers = self.layers.len();
        if pass.sums().len() != nlayers {
            return Err(MlErr::size_mismatch("forward pass layers", pass.sums().len(), nlayers));
        }

        let y_pred = pass.output();
        if y.nrows() != y_pred.nrows() {
            return Err(MlErr::size_mismatch("rows of the targets", y.nrows(), y_pred.nrows()));
        }
        if y.ncols() != y_pred.ncols() {
            return Err(MlErr::size_mismatch("columns of the targets", y.ncols(), y_pred.ncols()));
        }

        let mut d = loss_fn.loss_prime(y_pred, y);

        for (i, layer) in self.layers.iter().enumerate().rev() {
            layer.backward(grad, pass.outputs()[i].view(), d.view())?;

            if i == 0 {
                break;
            }

            let mut prev = layer.propagate(params, d.view())?;
            if let Some(act_fn) = self.layers[i - 1].act_fn() {
                prev.zip_mut_with(&pass.sums()[i - 1], |d, &z| *d *= act_fn.df(z));
            }

            d = prev;
        }

        Ok(())
    }
}
