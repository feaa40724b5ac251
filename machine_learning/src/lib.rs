pub mod arch;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod network;
pub mod optimization;
pub mod standardization;

pub use dataset::{Dataset, Partition};
pub use error::{MlErr, Result};
pub use network::NeuralNetwork;
pub use optimization::Method;
pub use standardization::Standardizer;
