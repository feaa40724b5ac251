use std::fmt;

use log::info;
use ndarray::prelude::*;
use rand::Rng;

use crate::{
    MlErr, Result,
    arch::{
        ForwardPass, Model, Sequential,
        activations::ActFn,
        layers::Dense,
        loss::{LossFn, Mse},
    },
    optimization::{Method, Minimizer, Objective},
    standardization::Standardizer,
};

/// A fully connected feed forward network for nonlinear regression.
///
/// The network owns one flat parameter vector and one gradient vector of the same length, the
/// per layer matrices are windows into them. Inputs and targets are standardized with
/// statistics computed on the first `train` call; later calls reuse them so continued training
/// keeps a consistent scaling.
#[derive(Clone, Debug)]
pub struct NeuralNetwork {
    arch: Sequential,
    params: Vec<f32>,
    grad: Vec<f32>,
    loss_fn: Mse,
    input_stats: Option<Standardizer>,
    target_stats: Option<Standardizer>,
    error_trace: Vec<f32>,
    total_epochs: usize,
    trained: bool,
}

impl NeuralNetwork {
    /// Creates a new `NeuralNetwork` with parameters sampled from the thread's rng.
    ///
    /// # Arguments
    /// * `n_inputs` - The amount of input columns.
    /// * `hidden` - The width of every hidden layer, `[]` or `[0]` for a linear model.
    /// * `n_outputs` - The amount of target columns.
    /// * `act_fn` - The activation function of the hidden layers.
    pub fn new(n_inputs: usize, hidden: &[usize], n_outputs: usize, act_fn: ActFn) -> Result<Self> {
        Self::with_rng(n_inputs, hidden, n_outputs, act_fn, &mut rand::rng())
    }

    /// Same as [`NeuralNetwork::new`] but samples the initial parameters from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        n_inputs: usize,
        hidden: &[usize],
        n_outputs: usize,
        act_fn: ActFn,
        rng: &mut R,
    ) -> Result<Self> {
        let arch = Sequential::new(n_inputs, hidden, n_outputs, act_fn)?;
        let params = arch.init_params(rng)?;
        let grad = vec![0.; arch.size()];

        Ok(Self {
            arch,
            params,
            grad,
            loss_fn: Mse::new(),
            input_stats: None,
            target_stats: None,
            error_trace: Vec::new(),
            total_epochs: 0,
            trained: false,
        })
    }

    /// Trains the network on raw (not standardized) samples.
    ///
    /// Every call runs a fresh optimizer over the current parameters for exactly `n_epochs`
    /// full batch epochs and replaces the error trace. The trace holds the training RMSE in
    /// units of the first target column.
    ///
    /// # Arguments
    /// * `x` - The inputs, one sample per row.
    /// * `t` - The targets, one sample per row.
    /// * `n_epochs` - The amount of epochs to train for.
    /// * `learning_rate` - The learning rate of the optimizer.
    /// * `method` - The optimization algorithm.
    ///
    /// # Returns
    /// The network itself, so calls can be chained.
    pub fn train(
        &mut self,
        x: ArrayView2<f32>,
        t: ArrayView2<f32>,
        n_epochs: usize,
        learning_rate: f32,
        method: Method,
    ) -> Result<&mut Self> {
        if x.nrows() != t.nrows() {
            return Err(MlErr::size_mismatch("rows of the targets", t.nrows(), x.nrows()));
        }
        self.check_cols("input columns", x.ncols(), self.arch.n_inputs())?;
        self.check_cols("target columns", t.ncols(), self.arch.n_outputs())?;

        let input_stats = match &self.input_stats {
            Some(stats) => stats.clone(),
            None => Standardizer::fit(x)?,
        };
        let target_stats = match &self.target_stats {
            Some(stats) => stats.clone(),
            None => Standardizer::fit(t)?,
        };

        let xs = input_stats.standardize(x)?;
        let ts = target_stats.standardize(t)?;

        let t_std = target_stats.stds()[0];
        self.input_stats = Some(input_stats);
        self.target_stats = Some(target_stats);

        let Self {
            arch,
            params,
            grad,
            loss_fn,
            ..
        } = self;

        let mut fit = Fit {
            arch,
            loss_fn,
            x: xs.view(),
            t: ts.view(),
            grad,
        };
        let to_rmse = |err: f32| err.sqrt() * t_std;

        let trace = Minimizer::new(params).minimize(
            method,
            &mut fit,
            n_epochs,
            learning_rate,
            Some(&to_rmse),
        )?;

        self.error_trace = trace;
        self.total_epochs += n_epochs;
        self.trained = true;

        info!(
            method = method.name(),
            epochs = n_epochs,
            error = self.error_trace.last().copied().unwrap_or(f32::NAN);
            "finished training"
        );

        Ok(self)
    }

    /// Predicts the targets of raw samples, in target units.
    ///
    /// # Errors
    /// `InvalidArgument` if the network was never trained, as there are no statistics to
    /// standardize with.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (Some(input_stats), Some(target_stats)) = (&self.input_stats, &self.target_stats)
        else {
            return Err(MlErr::invalid("the network has to be trained before using it"));
        };

        let xs = input_stats.standardize(x)?;
        let pass = self.forward_pass(xs.view())?;

        target_stats.unstandardize(pass.output())
    }

    /// Runs the network on already standardized inputs.
    pub fn forward_pass(&self, x: ArrayView2<f32>) -> Result<ForwardPass> {
        self.arch.forward(&self.params, x)
    }

    /// The mean squared error of the network on standardized samples.
    pub fn error_f(&self, x: ArrayView2<f32>, t: ArrayView2<f32>) -> Result<f32> {
        let pass = self.forward_pass(x)?;
        let y = pass.output();

        if y.dim() != t.dim() {
            return Err(MlErr::size_mismatch("targets", t.len(), y.len()));
        }

        Ok(self.loss_fn.loss(y, t))
    }

    /// Computes the gradient of the mean squared error for the standardized targets `t`.
    ///
    /// `pass` must be the result of `forward_pass` on the current parameters.
    pub fn gradient_f(&mut self, pass: &ForwardPass, t: ArrayView2<f32>) -> Result<&[f32]> {
        self.arch
            .backward(&self.params, pass, t, &self.loss_fn, &mut self.grad)?;

        Ok(&self.grad)
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn gradients(&self) -> &[f32] {
        &self.grad
    }

    /// The bias and weight matrix of layer `i`, row 0 being the bias.
    pub fn layer_weights(&self, i: usize) -> Result<ArrayView2<'_, f32>> {
        self.layer(i)?.view(&self.params)
    }

    /// The gradient of layer `i`, laid out like its weights.
    pub fn layer_gradients(&self, i: usize) -> Result<ArrayView2<'_, f32>> {
        self.layer(i)?.view(&self.grad)
    }

    pub fn n_layers(&self) -> usize {
        self.arch.layers().len()
    }

    /// The training RMSE of every epoch of the last `train` call.
    pub fn error_trace(&self) -> &[f32] {
        &self.error_trace
    }

    pub fn total_epochs(&self) -> usize {
        self.total_epochs
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn input_stats(&self) -> Option<&Standardizer> {
        self.input_stats.as_ref()
    }

    pub fn target_stats(&self) -> Option<&Standardizer> {
        self.target_stats.as_ref()
    }

    pub fn n_inputs(&self) -> usize {
        self.arch.n_inputs()
    }

    pub fn hidden(&self) -> &[usize] {
        self.arch.hidden()
    }

    pub fn n_outputs(&self) -> usize {
        self.arch.n_outputs()
    }

    pub fn act_fn(&self) -> ActFn {
        self.arch.act_fn()
    }

    fn layer(&self, i: usize) -> Result<&Dense> {
        self.arch.layers().get(i).ok_or_else(|| {
            MlErr::invalid(format!("layer {i} out of range, the network has {}", self.n_layers()))
        })
    }

    fn check_cols(&self, what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(MlErr::size_mismatch(what, got, expected));
        }

        Ok(())
    }
}

impl fmt::Display for NeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NeuralNetwork({}, {:?}, {})",
            self.n_inputs(),
            self.hidden(),
            self.n_outputs()
        )?;

        if let (true, Some(error)) = (self.trained, self.error_trace.last()) {
            write!(
                f,
                " trained for {} epochs, final training error {error}",
                self.total_epochs
            )?;
        }

        Ok(())
    }
}

/// The training objective: the loss of the network over a fixed standardized sample set.
struct Fit<'a> {
    arch: &'a Sequential,
    loss_fn: &'a Mse,
    x: ArrayView2<'a, f32>,
    t: ArrayView2<'a, f32>,
    grad: &'a mut [f32],
}

impl Objective for Fit<'_> {
    type Forward = ForwardPass;

    fn error(&mut self, params: &[f32]) -> Result<(f32, ForwardPass)> {
        let pass = self.arch.forward(params, self.x)?;
        let err = self.loss_fn.loss(pass.output(), self.t);

        Ok((err, pass))
    }

    fn gradient(&mut self, params: &[f32], forward: &ForwardPass) -> Result<&[f32]> {
        self.arch
            .backward(params, forward, self.t, self.loss_fn, self.grad)?;

        Ok(&*self.grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    fn network(hidden: &[usize], act_fn: ActFn) -> NeuralNetwork {
        let mut rng = StdRng::seed_from_u64(7);
        NeuralNetwork::with_rng(1, hidden, 1, act_fn, &mut rng).unwrap()
    }

    fn samples() -> (Array2<f32>, Array2<f32>) {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f32);
        let t = x.mapv(|x| (0.3 * x).sin() + 0.1 * x);
        (x, t)
    }

    #[test]
    fn buffers_match_the_topology() {
        let nn = network(&[3, 2], ActFn::tanh());

        // (1 + 1) * 3 + (3 + 1) * 2 + (2 + 1) * 1
        assert_eq!(nn.params().len(), 17);
        assert_eq!(nn.gradients(), &[0.; 17]);
        assert_eq!(nn.n_layers(), 3);
        assert_eq!(nn.layer_weights(1).unwrap().dim(), (4, 2));
        assert!(nn.layer_weights(3).is_err());
    }

    #[test]
    fn untrained_networks_cannot_predict() {
        let nn = network(&[2], ActFn::tanh());

        assert!(!nn.is_trained());
        assert!(matches!(
            nn.predict(array![[1.]].view()),
            Err(MlErr::InvalidArgument(_))
        ));
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let mut nn = network(&[2], ActFn::tanh());
        let x = Array2::<f32>::zeros((4, 1));
        let t = Array2::<f32>::zeros((3, 1));

        let err = nn
            .train(x.view(), t.view(), 1, 0.1, Method::Sgd)
            .unwrap_err();
        assert_eq!(err, MlErr::size_mismatch("rows of the targets", 3, 4));
        assert!(nn.input_stats().is_none());
    }

    #[test]
    fn wrong_amount_of_inputs_is_rejected() {
        let mut nn = network(&[2], ActFn::tanh());
        let x = Array2::<f32>::zeros((4, 2));
        let t = Array2::<f32>::zeros((4, 1));

        let err = nn
            .train(x.view(), t.view(), 1, 0.1, Method::Sgd)
            .unwrap_err();
        assert_eq!(err, MlErr::size_mismatch("input columns", 2, 1));
    }

    #[test]
    fn statistics_are_frozen_by_the_first_train() {
        let (x, t) = samples();
        let mut nn = network(&[4], ActFn::tanh());

        nn.train(x.view(), t.view(), 5, 0.01, Method::Adam).unwrap();
        let first = (nn.input_stats().cloned(), nn.target_stats().cloned());

        let x2 = x.mapv(|x| 10. * x + 3.);
        let t2 = t.mapv(|t| -t);
        nn.train(x2.view(), t2.view(), 5, 0.01, Method::Adam)
            .unwrap();

        assert_eq!(first, (nn.input_stats().cloned(), nn.target_stats().cloned()));
        assert_eq!(first.0.unwrap(), Standardizer::fit(x.view()).unwrap());
    }

    #[test]
    fn train_chains_and_counts_epochs() {
        let (x, t) = samples();
        let mut nn = network(&[4], ActFn::relu());

        nn.train(x.view(), t.view(), 30, 0.01, Method::Adam)
            .unwrap()
            .train(x.view(), t.view(), 20, 0.01, Method::Sgd)
            .unwrap();

        assert!(nn.is_trained());
        assert_eq!(nn.total_epochs(), 50);
        assert_eq!(nn.error_trace().len(), 20);
        assert!(nn.error_trace().iter().all(|e| e.is_finite() && *e >= 0.));
    }

    #[test]
    fn every_train_starts_a_fresh_adam() {
        let (x, t) = samples();
        let lr = 0.01;
        let mut nn = network(&[4], ActFn::tanh());
        nn.train(x.view(), t.view(), 40, lr, Method::Adam).unwrap();

        let xs = nn.input_stats().unwrap().standardize(x.view()).unwrap();
        let ts = nn.target_stats().unwrap().standardize(t.view()).unwrap();
        let pass = nn.forward_pass(xs.view()).unwrap();
        let grad = nn.gradient_f(&pass, ts.view()).unwrap().to_vec();
        let before = nn.params().to_vec();

        nn.train(x.view(), t.view(), 1, lr, Method::Adam).unwrap();

        // a first Adam step moves every parameter by lr * g / (|g| + eps)
        for ((b, a), g) in before.iter().zip(nn.params()).zip(&grad) {
            if g.abs() > 1e-5 {
                let expected = lr * g.signum();
                assert!((b - a - expected).abs() < 1e-4, "moved {} for g = {g}", b - a);
            }
        }
    }

    #[test]
    fn diverging_training_is_aborted() {
        let (x, t) = samples();
        let mut nn = network(&[0], ActFn::tanh());

        let err = nn
            .train(x.view(), t.view(), 10, 1e30, Method::Sgd)
            .unwrap_err();

        assert!(matches!(err, MlErr::NumericInstability(_)), "{err}");
        assert!(!nn.is_trained());
        assert_eq!(nn.total_epochs(), 0);
        assert!(nn.error_trace().is_empty());
    }

    #[test]
    fn predict_is_idempotent_and_matches_a_manual_forward_pass() {
        let (x, t) = samples();
        let mut nn = network(&[5], ActFn::swish());
        nn.train(x.view(), t.view(), 50, 0.01, Method::Adam).unwrap();

        let first = nn.predict(x.view()).unwrap();
        let second = nn.predict(x.view()).unwrap();
        assert_eq!(first, second);

        let xs = nn.input_stats().unwrap().standardize(x.view()).unwrap();
        let pass = nn.forward_pass(xs.view()).unwrap();
        let manual = nn
            .target_stats()
            .unwrap()
            .unstandardize(pass.output())
            .unwrap();
        assert_eq!(first, manual);
    }

    #[test]
    fn error_f_is_the_mse_of_the_forward_pass() {
        let (x, t) = samples();
        let mut nn = network(&[3], ActFn::tanh());
        nn.train(x.view(), t.view(), 10, 0.01, Method::Sgd).unwrap();

        let xs = nn.input_stats().unwrap().standardize(x.view()).unwrap();
        let ts = nn.target_stats().unwrap().standardize(t.view()).unwrap();

        let pass = nn.forward_pass(xs.view()).unwrap();
        let manual = (&ts - &pass.output()).mapv(|d| d.powi(2)).mean().unwrap();

        assert_eq!(nn.error_f(xs.view(), ts.view()).unwrap(), manual);
    }

    #[test]
    fn gradient_f_fills_the_layer_gradients() {
        let (x, t) = samples();
        let mut nn = network(&[3], ActFn::tanh());
        nn.train(x.view(), t.view(), 1, 0.01, Method::Sgd).unwrap();

        let xs = nn.input_stats().unwrap().standardize(x.view()).unwrap();
        let ts = nn.target_stats().unwrap().standardize(t.view()).unwrap();
        let pass = nn.forward_pass(xs.view()).unwrap();

        let grad = nn.gradient_f(&pass, ts.view()).unwrap().to_vec();
        assert_eq!(grad.len(), nn.params().len());

        let output_grad = nn.layer_gradients(1).unwrap();
        assert_eq!(output_grad.as_slice().unwrap(), &grad[6..]);
    }

    #[test]
    fn a_linear_network_learns_an_affine_map() {
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f32);
        let t = x.mapv(|x| 2. * x + 1.);
        let mut nn = network(&[0], ActFn::tanh());

        nn.train(x.view(), t.view(), 100, 0.5, Method::Sgd).unwrap();

        let y = nn.predict(array![[20.]].view()).unwrap();
        assert!((y[[0, 0]] - 41.).abs() < 1e-2, "predicted {y}");
        assert!(*nn.error_trace().last().unwrap() < 1e-2);
    }

    #[test]
    fn display_mentions_training_once_trained() {
        let (x, t) = samples();
        let mut nn = network(&[10, 10], ActFn::tanh());
        assert_eq!(nn.to_string(), "NeuralNetwork(1, [10, 10], 1)");

        nn.train(x.view(), t.view(), 3, 0.01, Method::Adam).unwrap();
        let shown = nn.to_string();
        assert!(shown.starts_with("NeuralNetwork(1, [10, 10], 1) trained for 3 epochs"));
        assert!(shown.contains(", final training error "));
    }
}
