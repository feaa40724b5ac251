use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{Relu, Sigmoid, Swish, Tanh};
use crate::MlErr;

/// The activation function applied by every hidden layer of a network.
///
/// Deserializes from (and serializes to) its lowercase name.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActFn {
    Tanh(Tanh),
    Relu(Relu),
    Swish(Swish),
    Sigmoid(Sigmoid),
}

impl ActFn {
    pub fn tanh() -> Self {
        Self::Tanh(Tanh::new())
    }

    pub fn relu() -> Self {
        Self::Relu(Relu::new())
    }

    pub fn swish() -> Self {
        Self::Swish(Swish::new())
    }

    pub fn sigmoid() -> Self {
        Self::Sigmoid(Sigmoid::new())
    }

    /// Evaluates the function at the pre-activation sum `z`.
    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Tanh(a) => a.f(z),
            Self::Relu(a) => a.f(z),
            Self::Swish(a) => a.f(z),
            Self::Sigmoid(a) => a.f(z),
        }
    }

    /// Evaluates the derivative at the pre-activation sum `z`.
    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Tanh(a) => a.df(z),
            Self::Relu(a) => a.df(z),
            Self::Swish(a) => a.df(z),
            Self::Sigmoid(a) => a.df(z),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tanh(_) => "tanh",
            Self::Relu(_) => "relu",
            Self::Swish(_) => "swish",
            Self::Sigmoid(_) => "sigmoid",
        }
    }
}

impl Default for ActFn {
    fn default() -> Self {
        Self::tanh()
    }
}

impl FromStr for ActFn {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tanh" => Ok(Self::tanh()),
            "relu" => Ok(Self::relu()),
            "swish" => Ok(Self::swish()),
            "sigmoid" => Ok(Self::sigmoid()),
            other => Err(MlErr::invalid(format!(
                "unknown activation function '{other}', expected tanh, relu, swish or sigmoid"
            ))),
        }
    }
}

impl TryFrom<String> for ActFn {
    type Error = MlErr;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActFn> for String {
    fn from(value: ActFn) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for ActFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
