//! The layer contract.
//!
//! A network owns an ordered list of layers. Each layer owns its own parameters;
//! the network owns the layer's output and delta matrices and hands them to the
//! layer on every call, together with the neighbouring layer's buffers. A layer
//! never sees its neighbours directly.

use crate::{Matrix, Optimizer, Result, Scalar};

/// One transformation stage of a [`crate::Network`].
///
/// Dropping the layer releases its state; output and delta matrices are owned and
/// dropped by the network.
pub trait Layer {
    /// Number of input columns this layer expects.
    fn in_dim(&self) -> usize;

    /// Number of output columns this layer produces.
    fn out_dim(&self) -> usize;

    /// Number of scalars of network scratch space `backward` needs.
    ///
    /// The network grows its scratch matrix to the largest demand across layers when
    /// a layer is appended, so the training loop does not reallocate.
    fn scratch_len(&self) -> usize {
        0
    }

    /// Trainable parameters, if the layer has any. Used for inspection only.
    fn weights(&self) -> Option<&Matrix> {
        None
    }

    /// Short name used in log messages.
    fn kind(&self) -> &'static str {
        "layer"
    }

    /// Forward pass.
    ///
    /// `input` is `(batch, in_dim)` and `output` is `(batch, out_dim)`. The layer must
    /// overwrite `output` and may cache whatever it needs for `backward` in its own
    /// state.
    fn forward(&mut self, input: &Matrix, output: &mut Matrix);

    /// Backward pass.
    ///
    /// On entry `own.delta` holds `dL/d(output)` for this layer. The layer must:
    /// 1. compute the gradient of its parameters,
    /// 2. hand it to the optimizer through [`Step::update`] or
    ///    [`Step::update_with_scratch`],
    /// 3. write `dL/d(input)` into `prev_delta` when it is `Some`.
    ///
    /// `prev_delta` is `None` for the first layer, which has no predecessor.
    fn backward(
        &mut self,
        step: &mut Step<'_>,
        own: Buffers<'_>,
        prev_output: &Matrix,
        prev_delta: Option<&mut Matrix>,
    ) -> Result<()>;
}

/// A layer's own buffers, lent to it for one `backward` call.
#[derive(Debug)]
pub struct Buffers<'a> {
    /// Output of the most recent forward pass.
    pub output: &'a Matrix,
    /// `dL/d(output)`; the layer may overwrite it.
    pub delta: &'a mut Matrix,
}

/// Network-side context for one layer's `backward` call.
pub struct Step<'a> {
    optimizer: &'a mut dyn Optimizer,
    scratch: &'a mut Matrix,
    layer_index: usize,
    learning_rate: Scalar,
    batch_width: usize,
}

impl<'a> Step<'a> {
    pub(crate) fn new(
        optimizer: &'a mut dyn Optimizer,
        scratch: &'a mut Matrix,
        layer_index: usize,
        learning_rate: Scalar,
        batch_width: usize,
    ) -> Self {
        Self {
            optimizer,
            scratch,
            layer_index,
            learning_rate,
            batch_width,
        }
    }

    #[inline]
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    #[inline]
    pub fn learning_rate(&self) -> Scalar {
        self.learning_rate
    }

    #[inline]
    pub fn batch_width(&self) -> usize {
        self.batch_width
    }

    /// The network's scratch matrix. Contents are unspecified on entry and must not
    /// be relied upon after the call returns.
    #[inline]
    pub fn scratch(&mut self) -> &mut Matrix {
        self.scratch
    }

    /// Applies `gradient` to `weights` through the network's optimizer.
    ///
    /// `gradient` may be consumed as scratch by the optimizer.
    #[inline]
    pub fn update(&mut self, weights: &mut Matrix, gradient: &mut Matrix) {
        self.optimizer.update(weights, gradient, self.layer_index);
    }

    /// Like [`Step::update`], with the gradient taken from the scratch matrix.
    #[inline]
    pub fn update_with_scratch(&mut self, weights: &mut Matrix) {
        self.optimizer.update(weights, self.scratch, self.layer_index);
    }
}
