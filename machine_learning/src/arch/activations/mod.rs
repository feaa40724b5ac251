mod act_fn;
mod relu;
mod sigmoid;
mod swish;
mod tanh;

pub use act_fn::ActFn;
pub use relu::Relu;
pub use sigmoid::Sigmoid;
pub use swish::Swish;
pub use tanh::Tanh;
