use super::Optimizer;
use crate::{MlErr, Result};

pub const BETA1: f32 = 0.9;
pub const BETA2: f32 = 0.999;
pub const EPSILON: f32 = 1e-8;

/// The Adam optimization algorithm.
///
/// Both moment buffers start zeroed and both decay powers start at one. The powers are
/// multiplied by their betas *before* the bias correction of each step, so after `k` updates
/// they equal `beta1^k` and `beta2^k`.
#[derive(Clone, Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    mt: Box<[f32]>,
    vt: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            mt: vec![0.; len].into_boxed_slice(),
            vt: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// An `Adam` with the usual `0.9`, `0.999` and `1e-8` hyperparameters.
    pub fn with_defaults(len: usize, learning_rate: f32) -> Self {
        Self::new(len, learning_rate, BETA1, BETA2, EPSILON)
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    pub fn beta1_t(&self) -> f32 {
        self.beta1_t
    }

    pub fn beta2_t(&self) -> f32 {
        self.beta2_t
    }

    /// The first moment estimates.
    pub fn mt(&self) -> &[f32] {
        &self.mt
    }

    /// The second moment estimates.
    pub fn vt(&self) -> &[f32] {
        &self.vt
    }
}

impl Optimizer for Adam {
    /// Takes one Adam step.
    ///
    /// On `NumericInstability` the offending parameter and its moments are left untouched, the
    /// parameters before it have already taken their step.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(MlErr::size_mismatch("gradient", grad.len(), params.len()));
        }
        if self.mt.len() != params.len() {
            return Err(MlErr::size_mismatch("adam moments", self.mt.len(), params.len()));
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;

        for (((p, g), m), v) in params
            .iter_mut()
            .zip(grad)
            .zip(self.mt.iter_mut())
            .zip(self.vt.iter_mut())
        {
            let m_next = b1 * *m + (1. - b1) * g;
            let v_next = b2 * *v + (1. - b2) * g.powi(2);

            let mhat = m_next / bc1;
            let vhat = v_next / bc2;
            let denom = vhat.sqrt() + eps;
            if !denom.is_finite() {
                return Err(MlErr::NumericInstability("adam update denominator"));
            }

            let p_next = *p - lr * mhat / denom;
            if !p_next.is_finite() {
                return Err(MlErr::NumericInstability("adam parameter update"));
            }

            *m = m_next;
            *v = v_next;
            *p = p_next;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn first_step_has_the_length_of_the_learning_rate() {
        // with bias correction the first step is lr * g / (|g| + eps)
        let mut params = [0., 0.];
        let mut adam = Adam::with_defaults(2, 0.1);

        adam.update_params(&mut params, &[3., -0.5]).unwrap();

        assert!((params[0] + 0.1).abs() < EPS);
        assert!((params[1] - 0.1).abs() < EPS);
    }

    #[test]
    fn decay_powers_follow_the_epochs() {
        let mut params = [1.; 4];
        let mut adam = Adam::with_defaults(4, 0.01);

        assert_eq!(adam.beta1_t(), 1.);
        assert_eq!(adam.beta2_t(), 1.);

        for k in 1..=7 {
            adam.update_params(&mut params, &[0.5; 4]).unwrap();

            assert!((adam.beta1_t() - BETA1.powi(k)).abs() < EPS);
            assert!((adam.beta2_t() - BETA2.powi(k)).abs() < EPS);
        }
    }

    #[test]
    fn moments_accumulate_the_gradient() {
        let mut params = [0.];
        let mut adam = Adam::with_defaults(1, 0.01);

        adam.update_params(&mut params, &[2.]).unwrap();

        assert!((adam.mt()[0] - 0.2).abs() < EPS);
        assert!((adam.vt()[0] - 0.004).abs() < EPS);
    }

    #[test]
    fn non_finite_gradients_are_reported() {
        let mut params = [0.];
        let mut adam = Adam::with_defaults(1, 0.01);

        let err = adam
            .update_params(&mut params, &[f32::INFINITY])
            .unwrap_err();
        assert_eq!(err, MlErr::NumericInstability("adam update denominator"));
    }

    #[test]
    fn a_failed_step_leaves_the_offending_parameter_alone() {
        let mut params = [0., 0.5];
        let mut adam = Adam::with_defaults(2, 0.1);

        let err = adam
            .update_params(&mut params, &[1., f32::INFINITY])
            .unwrap_err();

        assert_eq!(err, MlErr::NumericInstability("adam update denominator"));
        assert!((params[0] + 0.1).abs() < EPS);
        assert_eq!(params[1], 0.5);
        assert_eq!(adam.mt()[1], 0.);
        assert_eq!(adam.vt()[1], 0.);
    }

    #[test]
    fn moments_must_match_the_parameters() {
        let mut params = [0.; 3];
        let mut adam = Adam::with_defaults(2, 0.01);

        let err = adam.update_params(&mut params, &[0.; 3]).unwrap_err();
        assert_eq!(err, MlErr::size_mismatch("adam moments", 2, 3));
    }
}
