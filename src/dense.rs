//! Fully connected layer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::{Buffers, Step};
use crate::{Activation, Layer, Matrix, Result, Scalar, Transpose};

/// Dense layer without bias: `output = activation(input * W^T)`.
///
/// `W` is stored row-major with shape `(out_dim, in_dim)`, i.e. a matrix of width
/// `in_dim` and height `out_dim`.
#[derive(Debug, Clone)]
pub struct Dense {
    weights: Matrix,
    activation: Activation,
}

impl Dense {
    /// Xavier/Glorot uniform initialisation from a deterministic seed.
    pub fn new_with_seed(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(in_dim, out_dim, activation, &mut rng)
    }

    /// Xavier/Glorot uniform initialisation: `U(-l, l)` with `l = sqrt(6 / (in + out))`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let mut weights = Matrix::new(in_dim, out_dim)?;
        let limit = (6.0 / (in_dim + out_dim) as Scalar).sqrt();
        weights.fill_random(rng, -limit, limit)?;
        Ok(Self {
            weights,
            activation,
        })
    }

    /// Uses `weights` (width `in_dim`, height `out_dim`) as-is.
    pub fn from_weights(weights: Matrix, activation: Activation) -> Self {
        Self {
            weights,
            activation,
        }
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut Matrix {
        &mut self.weights
    }
}

impl Layer for Dense {
    #[inline]
    fn in_dim(&self) -> usize {
        self.weights.width()
    }

    #[inline]
    fn out_dim(&self) -> usize {
        self.weights.height()
    }

    fn scratch_len(&self) -> usize {
        self.weights.size()
    }

    fn weights(&self) -> Option<&Matrix> {
        Some(&self.weights)
    }

    fn kind(&self) -> &'static str {
        "dense"
    }

    fn forward(&mut self, input: &Matrix, output: &mut Matrix) {
        let act = self.activation;
        Matrix::multiply(input, &self.weights, output, Transpose::B);
        output.apply(|z| act.forward(z));
    }

    fn backward(
        &mut self,
        step: &mut Step<'_>,
        own: Buffers<'_>,
        prev_output: &Matrix,
        prev_delta: Option<&mut Matrix>,
    ) -> Result<()> {
        let act = self.activation;
        // dL/dz
        own.delta
            .hadamard_with_map(own.output, |y| act.grad_from_output(y));

        // Propagate with the weights used in the forward pass, before the update.
        if let Some(prev_delta) = prev_delta {
            Matrix::multiply(own.delta, &self.weights, prev_delta, Transpose::None);
        }

        // dL/dW = delta^T * prev_output, shaped like the weights.
        let (x, y) = (self.weights.width(), self.weights.height());
        step.scratch().recreate_if_too_small(x, y)?;
        Matrix::multiply(own.delta, prev_output, step.scratch(), Transpose::A);
        step.update_with_scratch(&mut self.weights);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Optimizer;

    /// Records gradients without touching the weights.
    #[derive(Default)]
    struct Capture {
        grads: Vec<(usize, Matrix)>,
    }

    impl Optimizer for Capture {
        fn update(&mut self, _weights: &mut Matrix, gradient: &mut Matrix, layer_index: usize) {
            self.grads.push((layer_index, gradient.clone()));
        }
    }

    fn half_sse(layer: &mut Dense, input: &Matrix, target: &Matrix) -> Scalar {
        let mut out = Matrix::new(layer.out_dim(), input.height()).unwrap();
        layer.forward(input, &mut out);
        out.as_slice()
            .iter()
            .zip(target.as_slice())
            .map(|(o, t)| 0.5 * (o - t) * (o - t))
            .sum()
    }

    fn assert_close(analytic: Scalar, numeric: Scalar) {
        let diff = (analytic - numeric).abs();
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            diff <= 1e-6 || diff / scale <= 1e-5,
            "analytic={analytic} numeric={numeric} diff={diff}"
        );
    }

    #[test]
    fn xavier_init_is_bounded_and_deterministic() {
        let a = Dense::new_with_seed(4, 3, Activation::Tanh, 11).unwrap();
        let b = Dense::new_with_seed(4, 3, Activation::Tanh, 11).unwrap();
        let limit = (6.0_f64 / 7.0).sqrt();

        assert_eq!(a.weights, b.weights);
        assert_eq!((a.in_dim(), a.out_dim(), a.scratch_len()), (4, 3, 12));
        assert!(a.weights.as_slice().iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn forward_applies_weights_transposed_then_activation() {
        // W = [1 2; -1 0; 0 3] (out_dim 3, in_dim 2)
        let w = Matrix::from_flat(2, 3, vec![1.0, 2.0, -1.0, 0.0, 0.0, 3.0]).unwrap();
        let mut layer = Dense::from_weights(w, Activation::ReLU);
        let input = Matrix::from_rows(&[vec![1.0, 1.0], vec![2.0, -1.0]]).unwrap();
        let mut out = Matrix::new(3, 2).unwrap();

        layer.forward(&input, &mut out);

        assert_eq!(out.as_slice(), &[3.0, 0.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn backward_matches_numeric_gradients() {
        let mut layer = Dense::new_with_seed(3, 2, Activation::Tanh, 3).unwrap();
        let input = Matrix::from_rows(&[vec![0.3, -0.7, 0.1], vec![-0.2, 0.5, 0.9]]).unwrap();
        let target = Matrix::from_rows(&[vec![0.2, -0.1], vec![0.0, 0.4]]).unwrap();

        let mut out = Matrix::new(2, 2).unwrap();
        layer.forward(&input, &mut out);
        let mut delta = Matrix::new(2, 2).unwrap();
        Matrix::subtract(&out, &target, &mut delta);

        let mut capture = Capture::default();
        let mut scratch = Matrix::new(1, 1).unwrap();
        let mut d_input = Matrix::new(3, 2).unwrap();
        {
            let mut step = Step::new(&mut capture, &mut scratch, 4, 0.1, 2);
            let own = Buffers {
                output: &out,
                delta: &mut delta,
            };
            layer
                .backward(&mut step, own, &input, Some(&mut d_input))
                .unwrap();
        }

        assert_eq!(capture.grads.len(), 1);
        let (idx, grad) = &capture.grads[0];
        assert_eq!(*idx, 4);
        assert_eq!((grad.width(), grad.height()), (3, 2));

        let eps = 1e-6;
        for p in 0..layer.weights.size() {
            let orig = layer.weights.as_slice()[p];
            layer.weights_mut().as_mut_slice()[p] = orig + eps;
            let plus = half_sse(&mut layer, &input, &target);
            layer.weights_mut().as_mut_slice()[p] = orig - eps;
            let minus = half_sse(&mut layer, &input, &target);
            layer.weights_mut().as_mut_slice()[p] = orig;

            assert_close(grad.as_slice()[p], (plus - minus) / (2.0 * eps));
        }

        let mut input_var = input.clone();
        for p in 0..input_var.size() {
            let orig = input_var.as_slice()[p];
            input_var.as_mut_slice()[p] = orig + eps;
            let plus = half_sse(&mut layer, &input_var, &target);
            input_var.as_mut_slice()[p] = orig - eps;
            let minus = half_sse(&mut layer, &input_var, &target);
            input_var.as_mut_slice()[p] = orig;

            assert_close(d_input.as_slice()[p], (plus - minus) / (2.0 * eps));
        }
    }

    #[test]
    fn backward_without_predecessor_only_updates() {
        let w = Matrix::from_flat(2, 1, vec![1.0, -1.0]).unwrap();
        let mut layer = Dense::from_weights(w, Activation::Identity);
        let input = Matrix::from_flat(2, 1, vec![2.0, 3.0]).unwrap();
        let mut out = Matrix::new(1, 1).unwrap();
        layer.forward(&input, &mut out);
        assert_eq!(out.as_slice(), &[-1.0]);

        // delta = out - target with target 0
        let mut delta = out.clone();
        let mut opt = crate::BatchGradientDescent::new(0.5).unwrap();
        let mut scratch = Matrix::new(1, 1).unwrap();
        let mut step = Step::new(&mut opt, &mut scratch, 0, 0.5, 1);
        layer
            .backward(
                &mut step,
                Buffers {
                    output: &out,
                    delta: &mut delta,
                },
                &input,
                None,
            )
            .unwrap();

        // grad = [-2, -3]; w -= 0.5 * grad
        assert_eq!(layer.weights.as_slice(), &[2.0, 0.5]);
    }
}
