use log::{debug, trace};

use crate::layer::{Buffers, Step};
use crate::{BatchGradientDescent, Error, Layer, Matrix, NetworkConfig, Optimizer, Result, Scalar};

/// A layer together with the buffers the network keeps for it.
///
/// Fields drop in declaration order: delta, output, then the layer state.
struct LayerSlot {
    /// `(batch_width, out_dim)`, overwritten by every backward pass.
    delta: Matrix,
    /// `(batch_width, out_dim)`, overwritten by every forward pass.
    output: Matrix,
    layer: Box<dyn Layer>,
}

/// Feed-forward network: an ordered chain of layers and one optimizer.
///
/// Insertion order is forward-pass order. Layer `i` must accept exactly what layer
/// `i - 1` produces; this is checked when layers are appended so that the unchecked
/// matrix arithmetic in `predict`/`fit` always sees consistent shapes.
pub struct Network {
    layers: Vec<LayerSlot>,
    optimizer: Option<Box<dyn Optimizer>>,
    scratch: Matrix,
    learning_rate: Scalar,
    input_width: usize,
    batch_width: usize,
}

impl Network {
    /// Creates an empty network.
    ///
    /// Fails if `input_width` or `batch_width` is zero, or `learning_rate` is not
    /// finite and > 0.
    pub fn new(input_width: usize, batch_width: usize, learning_rate: Scalar) -> Result<Self> {
        if input_width < 1 {
            return Err(Error::InvalidConfig("input_width must be > 0".to_owned()));
        }
        if batch_width < 1 {
            return Err(Error::InvalidConfig("batch_width must be > 0".to_owned()));
        }
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {learning_rate}"
            )));
        }

        let scratch = Matrix::new(1, 1)?;
        debug!(
            "created network: input_width={input_width} batch_width={batch_width} learning_rate={learning_rate}"
        );
        Ok(Self {
            layers: Vec::new(),
            optimizer: None,
            scratch,
            learning_rate,
            input_width,
            batch_width,
        })
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::new(config.input_width, config.batch_width, config.learning_rate)
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    #[inline]
    pub fn batch_width(&self) -> usize {
        self.batch_width
    }

    #[inline]
    pub fn learning_rate(&self) -> Scalar {
        self.learning_rate
    }

    #[inline]
    pub fn has_optimizer(&self) -> bool {
        self.optimizer.is_some()
    }

    /// Width of the network output (the last layer's `out_dim`), or the input width
    /// for a network without layers.
    pub fn output_width(&self) -> usize {
        self.layers
            .last()
            .map_or(self.input_width, |slot| slot.layer.out_dim())
    }

    pub fn layer(&self, idx: usize) -> Option<&dyn Layer> {
        self.layers.get(idx).map(|slot| slot.layer.as_ref())
    }

    /// Output of layer `idx` from the most recent forward pass.
    pub fn output(&self, idx: usize) -> Option<&Matrix> {
        self.layers.get(idx).map(|slot| &slot.output)
    }

    /// Delta of layer `idx` from the most recent backward pass.
    pub fn delta(&self, idx: usize) -> Option<&Matrix> {
        self.layers.get(idx).map(|slot| &slot.delta)
    }

    /// Appends a layer.
    ///
    /// The layer's `in_dim` must equal the current output width. Output and delta
    /// buffers of shape `(batch_width, out_dim)` are allocated for it and the scratch
    /// matrix is grown to the layer's demand. On error the network is unchanged.
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        let expected = self.output_width();
        if layer.in_dim() != expected {
            return Err(Error::InvalidShape(format!(
                "layer {} in_dim {} does not match previous output width {expected}",
                self.layers.len(),
                layer.in_dim()
            )));
        }

        let output = Matrix::new(layer.out_dim(), self.batch_width)?;
        let delta = Matrix::new(layer.out_dim(), self.batch_width)?;

        let need = layer.scratch_len();
        if need > self.scratch.size() {
            self.scratch.recreate_if_too_small(need, 1)?;
            debug!("grew scratch to {need} scalars");
        }

        debug!(
            "appended {} layer {}: {} -> {}",
            layer.kind(),
            self.layers.len(),
            layer.in_dim(),
            layer.out_dim()
        );
        self.layers.push(LayerSlot {
            delta,
            output,
            layer,
        });
        Ok(())
    }

    /// Appends a concrete layer. See [`Network::push_layer`].
    pub fn add_layer<L: Layer + 'static>(&mut self, layer: L) -> Result<()> {
        self.push_layer(Box::new(layer))
    }

    /// Attaches the optimizer. Fails with [`Error::OptimizerAttached`] if one is
    /// already attached, leaving it in place.
    pub fn attach_optimizer(&mut self, optimizer: Box<dyn Optimizer>) -> Result<()> {
        if self.optimizer.is_some() {
            return Err(Error::OptimizerAttached);
        }
        self.optimizer = Some(optimizer);
        debug!("attached optimizer");
        Ok(())
    }

    /// Attaches [`BatchGradientDescent`] with the given rate.
    pub fn add_batch_gradient_descent(&mut self, rate: Scalar) -> Result<()> {
        if self.optimizer.is_some() {
            return Err(Error::OptimizerAttached);
        }
        self.attach_optimizer(Box::new(BatchGradientDescent::new(rate)?))
    }

    /// Reshapes every layer's buffers for a new batch width.
    ///
    /// Buffers are only reallocated when they are too small for the new width.
    pub fn set_batch_width(&mut self, batch_width: usize) -> Result<()> {
        if batch_width < 1 {
            return Err(Error::InvalidConfig("batch_width must be > 0".to_owned()));
        }
        for slot in &mut self.layers {
            let out_dim = slot.layer.out_dim();
            slot.output.recreate_if_too_small(out_dim, batch_width)?;
            slot.delta.recreate_if_too_small(out_dim, batch_width)?;
        }
        debug!("batch_width {} -> {batch_width}", self.batch_width);
        self.batch_width = batch_width;
        Ok(())
    }

    /// Forward pass.
    ///
    /// `input` is `(batch_width, input_width)`. Every layer's output buffer keeps its
    /// activation afterwards; the returned matrix is the last layer's output.
    pub fn predict(&mut self, input: &Matrix) -> Result<&Matrix> {
        if self.layers.is_empty() {
            return Err(Error::EmptyNetwork);
        }
        self.forward(input);
        Ok(&self.layers[self.layers.len() - 1].output)
    }

    fn forward(&mut self, input: &Matrix) {
        debug_assert_eq!(input.width(), self.input_width);
        debug_assert_eq!(input.height(), self.batch_width);

        for idx in 0..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(idx);
            let prev = done.last().map_or(input, |slot| &slot.output);
            let slot = &mut rest[0];
            slot.layer.forward(prev, &mut slot.output);
        }
    }

    /// One training step: forward pass, output error, backward pass.
    ///
    /// The error of the last layer is `output - target`. Layers `N-1..1` then run
    /// `backward` with their predecessor's output and delta; finally layer 0 runs
    /// with the original `input` and no predecessor delta, which only updates its
    /// own weights.
    ///
    /// A layer error aborts the step immediately; weights of layers already
    /// processed stay updated.
    pub fn fit(&mut self, input: &Matrix, target: &Matrix) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::EmptyNetwork);
        }
        if self.optimizer.is_none() {
            return Err(Error::MissingOptimizer);
        }

        self.forward(input);

        let Network {
            layers,
            optimizer,
            scratch,
            learning_rate,
            batch_width,
            ..
        } = self;
        let Some(optimizer) = optimizer.as_deref_mut() else {
            return Err(Error::MissingOptimizer);
        };

        let end = layers.len() - 1;
        {
            let last = &mut layers[end];
            debug_assert_eq!(target.size(), last.output.size());
            Matrix::subtract(&last.output, target, &mut last.delta);
        }

        for idx in (1..=end).rev() {
            trace!("backward layer {idx}");
            let (done, rest) = layers.split_at_mut(idx);
            let prev = &mut done[idx - 1];
            let slot = &mut rest[0];

            let mut step = Step::new(optimizer, scratch, idx, *learning_rate, *batch_width);
            let own = Buffers {
                output: &slot.output,
                delta: &mut slot.delta,
            };
            slot.layer
                .backward(&mut step, own, &prev.output, Some(&mut prev.delta))?;
        }

        trace!("backward layer 0");
        let first = &mut layers[0];
        let mut step = Step::new(optimizer, scratch, 0, *learning_rate, *batch_width);
        let own = Buffers {
            output: &first.output,
            delta: &mut first.delta,
        };
        first.layer.backward(&mut step, own, input, None)
    }

    /// Runs `predict` and counts the rows whose argmax agrees with `target`.
    pub fn count_matching(&mut self, input: &Matrix, target: &Matrix) -> Result<usize> {
        let output = self.predict(input)?;
        Ok(Matrix::row_argmax_match_count(output, target))
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("input_width", &self.input_width)
            .field("batch_width", &self.batch_width)
            .field("learning_rate", &self.learning_rate)
            .field("num_layers", &self.layers.len())
            .field("has_optimizer", &self.optimizer.is_some())
            .finish()
    }
}
