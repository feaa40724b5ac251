use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
///
/// Every variant aborts the `train`/`predict` call that produced it, nothing in this crate
/// retries.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    /// An argument is outside of the supported set (unknown method, zero-width layer, ...).
    InvalidArgument(String),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A NaN or an infinity showed up where a finite number is required.
    NumericInstability(&'static str),
}

impl MlErr {
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn size_mismatch(what: &'static str, got: usize, expected: usize) -> Self {
        Self::SizeMismatch {
            what,
            got,
            expected,
        }
    }
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::NumericInstability(at) => {
                write!(f, "non finite value found while computing {at}")
            }
        }
    }
}

impl Error for MlErr {}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::InvalidArgument(format!("invalid array shape: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_offending_sizes() {
        let err = MlErr::size_mismatch("rows of t", 3, 4);
        let msg = err.to_string();

        assert!(msg.contains("rows of t"));
        assert!(msg.contains('3'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn shape_errors_become_invalid_arguments() {
        let err = ndarray::Array2::<f32>::from_shape_vec((2, 2), vec![0.; 3]).unwrap_err();
        assert!(matches!(MlErr::from(err), MlErr::InvalidArgument(_)));
    }
}
