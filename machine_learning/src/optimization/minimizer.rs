use log::debug;

use super::{Adam, GradientDescent, Method, Objective, Optimizer};
use crate::{MlErr, Result};

/// A function applied to every recorded error before it lands in the trace.
pub type ErrorConvert<'a> = &'a dyn Fn(f32) -> f32;

/// Drives an [`Objective`] towards a minimum by mutating a parameter vector it does not own.
///
/// The Adam moments live as long as the `Minimizer`, successive `adam` calls on the same
/// instance keep accumulating them.
pub struct Minimizer<'p> {
    params: &'p mut [f32],
    adam: Adam,
}

impl<'p> Minimizer<'p> {
    /// Creates a new `Minimizer` over `params`, with zeroed Adam moments.
    pub fn new(params: &'p mut [f32]) -> Self {
        let adam = Adam::with_defaults(params.len(), 0.);
        Self { params, adam }
    }

    /// The Adam state accumulated so far.
    pub fn adam_state(&self) -> &Adam {
        &self.adam
    }

    /// Runs `n_epochs` steps of plain gradient descent.
    ///
    /// # Arguments
    /// * `objective` - The function being minimized.
    /// * `n_epochs` - The exact amount of steps to take.
    /// * `learning_rate` - The length of every step.
    /// * `error_convert` - Transforms every error before it is recorded.
    ///
    /// # Returns
    /// The error of every epoch, evaluated before that epoch's update.
    pub fn sgd<O: Objective>(
        &mut self,
        objective: &mut O,
        n_epochs: usize,
        learning_rate: f32,
        error_convert: Option<ErrorConvert<'_>>,
    ) -> Result<Vec<f32>> {
        let mut optimizer = GradientDescent::new(learning_rate);
        run(
            "sgd",
            self.params,
            &mut optimizer,
            objective,
            n_epochs,
            error_convert,
        )
    }

    /// Runs `n_epochs` steps of Adam.
    ///
    /// Same arguments and return value as [`Minimizer::sgd`].
    pub fn adam<O: Objective>(
        &mut self,
        objective: &mut O,
        n_epochs: usize,
        learning_rate: f32,
        error_convert: Option<ErrorConvert<'_>>,
    ) -> Result<Vec<f32>> {
        self.adam.set_learning_rate(learning_rate);
        run(
            "adam",
            self.params,
            &mut self.adam,
            objective,
            n_epochs,
            error_convert,
        )
    }

    /// Dispatches to `sgd` or `adam`.
    pub fn minimize<O: Objective>(
        &mut self,
        method: Method,
        objective: &mut O,
        n_epochs: usize,
        learning_rate: f32,
        error_convert: Option<ErrorConvert<'_>>,
    ) -> Result<Vec<f32>> {
        match method {
            Method::Sgd => self.sgd(objective, n_epochs, learning_rate, error_convert),
            Method::Adam => self.adam(objective, n_epochs, learning_rate, error_convert),
        }
    }
}

fn run<O, U>(
    name: &'static str,
    params: &mut [f32],
    optimizer: &mut U,
    objective: &mut O,
    n_epochs: usize,
    error_convert: Option<ErrorConvert<'_>>,
) -> Result<Vec<f32>>
where
    O: Objective,
    U: Optimizer,
{
    let every = (n_epochs / 10).max(1);
    let mut trace = Vec::with_capacity(n_epochs);

    for epoch in 0..n_epochs {
        let (error, forward) = objective.error(params)?;
        if !error.is_finite() {
            return Err(MlErr::NumericInstability("objective error"));
        }

        let grad = objective.gradient(params, &forward)?;
        optimizer.update_params(params, grad)?;

        let error = error_convert.map_or(error, |convert| convert(error));
        trace.push(error);

        if (epoch + 1) % every == 0 {
            debug!(method = name, epoch = epoch + 1, error = error; "training progress");
        }
    }

    Ok(trace)
}
