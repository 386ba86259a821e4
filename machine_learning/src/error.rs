//! Error types for the learners and their numeric kernels

use gridworld::Coordinate;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("shape mismatch in {op}: {}x{} against {}x{}", left.0, left.1, right.0, right.1)]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("cell {0} is outside the value table")]
    CellOutOfBounds(Coordinate),

    #[error("backpropagation needs a forward pass on the same input first")]
    MissingForwardPass,

    #[error("cached activations belong to a different input than the one being trained")]
    StaleActivationCache,

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Grid(#[from] gridworld::Error),

    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn shape(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        Error::ShapeMismatch { op, left, right }
    }
}
