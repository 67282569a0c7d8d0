//! Network builder.
//!
//! `NetworkBuilder` is sugar over the append path of [`Network`]: it records layer
//! sizes and activations, then creates the network, appends one [`Dense`] layer per
//! entry and attaches the optimizer.
//!
//! ```rust
//! use megani::{Activation, NetworkBuilder};
//!
//! # fn main() -> megani::Result<()> {
//! let net = NetworkBuilder::new(2, 4, 0.1)?
//!     .dense(8, Activation::Tanh)?
//!     .dense(1, Activation::Sigmoid)?
//!     .build_with_seed(0)?;
//! assert_eq!(net.num_layers(), 2);
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Dense, Error, Momentum, Network, NetworkConfig, Result, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
/// Optimizer the builder attaches, using the configured learning rate.
pub enum OptimizerKind {
    #[default]
    BatchGradientDescent,
    Momentum { momentum: Scalar },
}

#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    out_dim: usize,
    activation: Activation,
}

#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    config: NetworkConfig,
    layers: Vec<LayerSpec>,
    optimizer: OptimizerKind,
}

impl NetworkBuilder {
    pub fn new(input_width: usize, batch_width: usize, learning_rate: Scalar) -> Result<Self> {
        Self::from_config(NetworkConfig {
            input_width,
            batch_width,
            learning_rate,
        })
    }

    pub fn from_config(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            layers: Vec::new(),
            optimizer: OptimizerKind::default(),
        })
    }

    /// Adds a dense layer with `out_dim` outputs.
    pub fn dense(mut self, out_dim: usize, activation: Activation) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        self.layers.push(LayerSpec {
            out_dim,
            activation,
        });
        Ok(self)
    }

    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }

        let mut net = Network::from_config(&self.config)?;
        let mut in_dim = self.config.input_width;
        for spec in self.layers {
            net.add_layer(Dense::new_with_rng(in_dim, spec.out_dim, spec.activation, rng)?)?;
            in_dim = spec.out_dim;
        }

        let rate = self.config.learning_rate;
        match self.optimizer {
            OptimizerKind::BatchGradientDescent => net.add_batch_gradient_descent(rate)?,
            OptimizerKind::Momentum { momentum } => {
                net.attach_optimizer(Box::new(Momentum::new(rate, momentum)?))?
            }
        }
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Layer;

    #[test]
    fn builds_chained_layers_with_optimizer() {
        let net = NetworkBuilder::new(4, 2, 0.05)
            .unwrap()
            .dense(3, Activation::ReLU)
            .unwrap()
            .dense(2, Activation::Identity)
            .unwrap()
            .optimizer(OptimizerKind::Momentum { momentum: 0.9 })
            .build_with_seed(1)
            .unwrap();

        assert_eq!(net.num_layers(), 2);
        assert!(net.has_optimizer());
        let l1: &dyn Layer = net.layer(1).unwrap();
        assert_eq!((l1.in_dim(), l1.out_dim()), (3, 2));
        assert_eq!(net.output_width(), 2);
    }

    #[test]
    fn rejects_empty_and_invalid_specs() {
        assert!(NetworkBuilder::new(0, 1, 0.1).is_err());
        assert!(NetworkBuilder::new(2, 1, 0.1).unwrap().dense(0, Activation::Tanh).is_err());
        assert!(NetworkBuilder::new(2, 1, 0.1).unwrap().build_with_seed(0).is_err());
        assert!(
            NetworkBuilder::new(2, 1, 0.1)
                .unwrap()
                .dense(1, Activation::Tanh)
                .unwrap()
                .optimizer(OptimizerKind::Momentum { momentum: 1.5 })
                .build_with_seed(0)
                .is_err()
        );
    }

    #[test]
    fn same_seed_same_weights() {
        let build = || {
            NetworkBuilder::new(3, 1, 0.1)
                .unwrap()
                .dense(5, Activation::Tanh)
                .unwrap()
                .build_with_seed(42)
                .unwrap()
        };
        let (a, b) = (build(), build());
        assert_eq!(a.layer(0).unwrap().weights(), b.layer(0).unwrap().weights());
    }
}
