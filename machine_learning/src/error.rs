use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    /// A shape invariant was violated (e.g. the model's logits can't be squeezed to the batch).
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// The recording is shorter than a single window.
    InsufficientLength { got: usize, min: usize },
    /// A window produced a NaN or infinite loss.
    NonFiniteLoss { window: usize, offset: usize },
    /// An input or configuration value is invalid for domain reasons.
    InvalidInput(&'static str),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::InsufficientLength { got, min } => write!(
                f,
                "The recording has {got} samples but at least {min} are needed to fill one window"
            ),
            MlErr::NonFiniteLoss { window, offset } => write!(
                f,
                "The loss of window {window} (offset {offset}) is not finite"
            ),
            MlErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl Error for MlErr {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_length_names_both_sizes() {
        let err = MlErr::InsufficientLength { got: 39, min: 40 };
        let msg = err.to_string();

        assert!(msg.contains("39"));
        assert!(msg.contains("40"));
    }
}
