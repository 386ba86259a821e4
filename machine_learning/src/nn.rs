mod matrix;
mod network;

pub use matrix::Matrix;
pub use network::{sigmoid, sigmoid_derivative, FeedForwardNetwork};
