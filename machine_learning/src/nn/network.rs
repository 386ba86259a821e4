use env::rand::Rng;

use super::matrix::Matrix;
use crate::error::{Error, Result};

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Slope of the sigmoid written in terms of its *output*: for `y = σ(x)`,
/// `σ'(x) = y(1 - y)`. Always fed already-activated values.
pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1.0 - y)
}

#[derive(Debug, Clone)]
struct ForwardCache {
    input: Matrix,
    hidden: Matrix,
    output: Matrix,
}

/// input (I) → hidden (H, sigmoid) → output (O, sigmoid), all as row vectors.
///
/// [`forward`](Self::forward) caches the activations of the call for the next
/// [`backpropagate`](Self::backpropagate). The pair is not reentrant: a second
/// `forward` on a different input before `backpropagate` replaces the cache,
/// and `backpropagate` then fails with [`Error::StaleActivationCache`] instead
/// of computing gradients for the wrong sample. [`train`](Self::train) runs
/// both halves back to back and is the usual entry point.
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    weights_input_hidden: Matrix,
    bias_hidden: Matrix,
    weights_hidden_output: Matrix,
    bias_output: Matrix,
    cache: Option<ForwardCache>,
}

impl FeedForwardNetwork {
    /// Parameters drawn uniformly from `[-1, 1]`.
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, rng: &mut impl Rng) -> Self {
        Self {
            weights_input_hidden: Matrix::zeros(input_size, hidden_size).randomize(rng),
            bias_hidden: Matrix::zeros(1, hidden_size).randomize(rng),
            weights_hidden_output: Matrix::zeros(hidden_size, output_size).randomize(rng),
            bias_output: Matrix::zeros(1, output_size).randomize(rng),
            cache: None,
        }
    }

    pub fn from_parameters(
        weights_input_hidden: Matrix,
        bias_hidden: Matrix,
        weights_hidden_output: Matrix,
        bias_output: Matrix,
    ) -> Result<Self> {
        let hidden = weights_input_hidden.cols();
        let output = weights_hidden_output.cols();
        if bias_hidden.shape() != (1, hidden) {
            return Err(Error::shape("bias_hidden", (1, hidden), bias_hidden.shape()));
        }
        if weights_hidden_output.rows() != hidden {
            return Err(Error::shape(
                "weights_hidden_output",
                weights_input_hidden.shape(),
                weights_hidden_output.shape(),
            ));
        }
        if bias_output.shape() != (1, output) {
            return Err(Error::shape("bias_output", (1, output), bias_output.shape()));
        }
        Ok(Self {
            weights_input_hidden,
            bias_hidden,
            weights_hidden_output,
            bias_output,
            cache: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights_input_hidden.rows()
    }

    pub fn hidden_size(&self) -> usize {
        self.weights_input_hidden.cols()
    }

    pub fn output_size(&self) -> usize {
        self.weights_hidden_output.cols()
    }

    pub fn weights_input_hidden(&self) -> &Matrix {
        &self.weights_input_hidden
    }

    pub fn bias_hidden(&self) -> &Matrix {
        &self.bias_hidden
    }

    pub fn weights_hidden_output(&self) -> &Matrix {
        &self.weights_hidden_output
    }

    pub fn bias_output(&self) -> &Matrix {
        &self.bias_output
    }

    fn layers(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        let hidden = input
            .dot(&self.weights_input_hidden)?
            .add(&self.bias_hidden)?
            .map(|x, _, _| sigmoid(x));
        let output = hidden
            .dot(&self.weights_hidden_output)?
            .add(&self.bias_output)?
            .map(|x, _, _| sigmoid(x));
        Ok((hidden, output))
    }

    /// Forward pass without touching the cache.
    pub fn predict(&self, input: &Matrix) -> Result<Matrix> {
        self.layers(input).map(|(_, output)| output)
    }

    /// Forward pass that caches the activations for [`backpropagate`](Self::backpropagate).
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let (hidden, output) = self.layers(input)?;
        self.cache = Some(ForwardCache {
            input: input.clone(),
            hidden,
            output: output.clone(),
        });
        Ok(output)
    }

    /// One gradient-descent step towards `target`, using the activations cached
    /// by the preceding [`forward`](Self::forward) on the same `input`. Consumes
    /// the cache.
    pub fn backpropagate(&mut self, input: &Matrix, target: &Matrix, learning_rate: f64) -> Result<()> {
        let cache = self.cache.take().ok_or(Error::MissingForwardPass)?;
        if cache.input != *input {
            return Err(Error::StaleActivationCache);
        }

        let output_error = target.subtract(&cache.output)?;
        let output_delta = output_error.multiply(&cache.output.map(|y, _, _| sigmoid_derivative(y)))?;

        // computed against the weights as they were before this step
        let hidden_error = output_delta.dot(&self.weights_hidden_output.transpose())?;
        let hidden_delta = hidden_error.multiply(&cache.hidden.map(|y, _, _| sigmoid_derivative(y)))?;

        self.weights_hidden_output = self
            .weights_hidden_output
            .add(&cache.hidden.transpose().dot(&output_delta)?.scale(learning_rate))?;
        self.bias_output = self.bias_output.add(&output_delta.scale(learning_rate))?;

        self.weights_input_hidden = self
            .weights_input_hidden
            .add(&input.transpose().dot(&hidden_delta)?.scale(learning_rate))?;
        self.bias_hidden = self.bias_hidden.add(&hidden_delta.scale(learning_rate))?;

        Ok(())
    }

    /// `forward` then `backpropagate` on one example. Returns the output seen
    /// before the update.
    pub fn train(&mut self, input: &Matrix, target: &Matrix, learning_rate: f64) -> Result<Matrix> {
        let output = self.forward(input)?;
        self.backpropagate(input, target, learning_rate)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env::rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn network() -> FeedForwardNetwork {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        FeedForwardNetwork::new(2, 3, 1, &mut rng)
    }

    fn squared_error(net: &FeedForwardNetwork, input: &Matrix, target: f64) -> f64 {
        let out = net.predict(input).unwrap().as_slice()[0];
        (target - out).powi(2)
    }

    #[test]
    fn sigmoid_is_centred() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid_derivative(sigmoid(0.0)) - 0.25).abs() < 1e-12);
        assert!(sigmoid(40.0) > 0.999 && sigmoid(-40.0) < 0.001);
    }

    #[test]
    fn forward_produces_a_sigmoid_row() {
        let mut net = network();
        let out = net.forward(&Matrix::row_vector(vec![0.2, 0.8])).unwrap();
        assert_eq!(out.shape(), (1, 1));
        assert!(out.as_slice().iter().all(|&y| y > 0.0 && y < 1.0));
        assert_eq!(net.predict(&Matrix::row_vector(vec![0.2, 0.8])).unwrap(), out);
    }

    #[test]
    fn wrong_input_width_is_a_shape_mismatch() {
        let mut net = network();
        let err = net.forward(&Matrix::row_vector(vec![1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { op: "dot", .. }));
    }

    #[test]
    fn training_reduces_the_error() {
        let mut net = network();
        let input = Matrix::row_vector(vec![0.25, 0.75]);
        let target = Matrix::row_vector(vec![0.9]);
        let before = squared_error(&net, &input, 0.9);
        for _ in 0..1000 {
            net.train(&input, &target, 0.5).unwrap();
        }
        let after = squared_error(&net, &input, 0.9);
        assert!(after < before, "error went from {before} to {after}");
        assert!(after < 1e-3);
    }

    #[test]
    fn backpropagate_without_forward_is_an_error() {
        let mut net = network();
        let input = Matrix::row_vector(vec![0.1, 0.1]);
        let target = Matrix::row_vector(vec![0.0]);
        assert!(matches!(
            net.backpropagate(&input, &target, 0.1),
            Err(Error::MissingForwardPass)
        ));

        net.forward(&input).unwrap();
        net.backpropagate(&input, &target, 0.1).unwrap();
        // the cache is consumed by the first backpropagate
        assert!(matches!(
            net.backpropagate(&input, &target, 0.1),
            Err(Error::MissingForwardPass)
        ));
    }

    #[test]
    fn interleaved_forward_calls_are_detected() {
        let mut net = network();
        let first = Matrix::row_vector(vec![0.1, 0.9]);
        let second = Matrix::row_vector(vec![0.9, 0.1]);
        let target = Matrix::row_vector(vec![1.0]);
        net.forward(&first).unwrap();
        net.forward(&second).unwrap();
        assert!(matches!(
            net.backpropagate(&first, &target, 0.1),
            Err(Error::StaleActivationCache)
        ));
    }

    #[test]
    fn single_step_matches_hand_computed_update() {
        // 1 → 1 → 1 with every parameter zero: hidden = output = 0.5
        let zero = || Matrix::zeros(1, 1);
        let mut net = FeedForwardNetwork::from_parameters(zero(), zero(), zero(), zero()).unwrap();
        let input = Matrix::row_vector(vec![1.0]);
        net.train(&input, &Matrix::row_vector(vec![1.0]), 1.0).unwrap();

        // output_delta = (1 - 0.5) * 0.25 = 0.125
        assert!((net.bias_output().as_slice()[0] - 0.125).abs() < 1e-12);
        // w_ho += hidden * delta = 0.5 * 0.125
        assert!((net.weights_hidden_output().as_slice()[0] - 0.0625).abs() < 1e-12);
        // hidden_delta uses the old w_ho (0), so the first layer stays put
        assert_eq!(net.weights_input_hidden().as_slice()[0], 0.0);
        assert_eq!(net.bias_hidden().as_slice()[0], 0.0);
    }

    #[test]
    fn mismatched_parameters_are_rejected() {
        let result = FeedForwardNetwork::from_parameters(
            Matrix::zeros(2, 3),
            Matrix::zeros(1, 3),
            Matrix::zeros(4, 1),
            Matrix::zeros(1, 1),
        );
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }
}
