mod adam;
mod gradient_descent;
mod method;
mod minimizer;
mod optimizer;

pub use adam::{Adam, BETA1, BETA2, EPSILON};
pub use gradient_descent::GradientDescent;
pub use method::Method;
pub use minimizer::{ErrorConvert, Minimizer};
pub use optimizer::{Objective, Optimizer};
