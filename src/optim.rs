//! Optimizers.
//!
//! A network holds exactly one optimizer. Every layer's `backward` hands its
//! parameter gradient to it through [`crate::Step`], tagged with the layer's index
//! so stateful optimizers can keep per-layer state.
//!
//! Dropping the optimizer releases any per-layer state it owns.

use log::warn;

use crate::{Error, Matrix, Result, Scalar};

/// Weight-update strategy shared by all layers of a network.
pub trait Optimizer {
    /// Applies an in-place update to `weights`.
    ///
    /// `gradient` has the same shape as `weights` and may be overwritten.
    /// `layer_index` identifies the calling layer.
    ///
    /// An optimizer that cannot proceed must leave `weights` unchanged and report it
    /// (through the log), never abort the run.
    fn update(&mut self, weights: &mut Matrix, gradient: &mut Matrix, layer_index: usize);
}

fn validate_rate(rate: Scalar) -> Result<()> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {rate}"
        )));
    }
    Ok(())
}

/// Batch gradient descent: `weights -= rate * gradient`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchGradientDescent {
    rate: Scalar,
}

impl BatchGradientDescent {
    /// Returns an error if `rate` is not finite or `rate <= 0`.
    pub fn new(rate: Scalar) -> Result<Self> {
        validate_rate(rate)?;
        Ok(Self { rate })
    }

    #[inline]
    pub fn rate(&self) -> Scalar {
        self.rate
    }
}

impl Optimizer for BatchGradientDescent {
    #[inline]
    fn update(&mut self, weights: &mut Matrix, gradient: &mut Matrix, _layer_index: usize) {
        gradient.scale(-self.rate);
        weights.accumulate(gradient);
    }
}

/// Gradient descent with per-layer momentum.
///
/// `v = momentum * v + gradient`, then `weights -= rate * v`. Velocity matrices are
/// allocated the first time a layer index is seen.
#[derive(Debug, Clone)]
pub struct Momentum {
    rate: Scalar,
    momentum: Scalar,
    velocity: Vec<Option<Matrix>>,
}

impl Momentum {
    /// `momentum` must be finite and in `[0, 1)`.
    pub fn new(rate: Scalar, momentum: Scalar) -> Result<Self> {
        validate_rate(rate)?;
        if !(momentum.is_finite() && (0.0..1.0).contains(&momentum)) {
            return Err(Error::InvalidConfig(format!(
                "momentum must be finite and in [0,1), got {momentum}"
            )));
        }
        Ok(Self {
            rate,
            momentum,
            velocity: Vec::new(),
        })
    }

    #[inline]
    pub fn rate(&self) -> Scalar {
        self.rate
    }

    #[inline]
    pub fn momentum(&self) -> Scalar {
        self.momentum
    }

    /// Velocity kept for `layer_index`, if that layer has been updated yet.
    pub fn velocity(&self, layer_index: usize) -> Option<&Matrix> {
        self.velocity.get(layer_index).and_then(Option::as_ref)
    }
}

impl Optimizer for Momentum {
    fn update(&mut self, weights: &mut Matrix, gradient: &mut Matrix, layer_index: usize) {
        if self.velocity.len() <= layer_index {
            self.velocity.resize_with(layer_index + 1, || None);
        }

        let slot = &mut self.velocity[layer_index];
        let stale = slot
            .as_ref()
            .is_none_or(|v| v.width() != gradient.width() || v.height() != gradient.height());
        if stale {
            match Matrix::new(gradient.width(), gradient.height()) {
                Ok(v) => *slot = Some(v),
                Err(e) => {
                    warn!("momentum: skipping update of layer {layer_index}: {e}");
                    return;
                }
            }
        }
        let Some(v) = slot.as_mut() else {
            return;
        };

        v.scale(self.momentum);
        v.accumulate(gradient);

        gradient.as_mut_slice().copy_from_slice(v.as_slice());
        gradient.scale(-self.rate);
        weights.accumulate(gradient);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(x: usize, y: usize, data: &[Scalar]) -> Matrix {
        Matrix::from_flat(x, y, data.to_vec()).unwrap()
    }

    #[test]
    fn rates_must_be_positive_and_finite() {
        assert!(BatchGradientDescent::new(0.0).is_err());
        assert!(BatchGradientDescent::new(-1.0).is_err());
        assert!(BatchGradientDescent::new(f64::NAN).is_err());
        assert!(Momentum::new(0.1, 1.0).is_err());
        assert!(Momentum::new(0.1, -0.1).is_err());
        assert!(Momentum::new(f64::INFINITY, 0.5).is_err());
    }

    #[test]
    fn batch_gradient_descent_subtracts_scaled_gradient() {
        let mut opt = BatchGradientDescent::new(0.5).unwrap();
        let mut w = m(3, 1, &[1.0, 2.0, 3.0]);
        let mut g = m(3, 1, &[2.0, -4.0, 0.0]);

        opt.update(&mut w, &mut g, 7);

        assert_eq!(w.as_slice(), &[0.0, 4.0, 3.0]);
    }

    #[test]
    fn momentum_first_step_matches_plain_descent() {
        let mut opt = Momentum::new(0.1, 0.9).unwrap();
        let mut w = m(1, 1, &[1.0]);
        let mut g = m(1, 1, &[3.0]);

        opt.update(&mut w, &mut g, 0);

        assert!((w.as_slice()[0] - (1.0 - 0.1 * 3.0)).abs() < 1e-12);
    }

    #[test]
    fn momentum_accumulates_velocity_per_layer() {
        let mut opt = Momentum::new(1.0, 0.5).unwrap();
        let mut w0 = m(1, 1, &[0.0]);
        let mut w2 = m(2, 1, &[0.0, 0.0]);

        opt.update(&mut w0, &mut m(1, 1, &[1.0]), 0);
        opt.update(&mut w2, &mut m(2, 1, &[1.0, 1.0]), 2);
        opt.update(&mut w0, &mut m(1, 1, &[1.0]), 0);

        // v0: 1.0, then 0.5 * 1.0 + 1.0 = 1.5
        assert!((w0.as_slice()[0] - (-2.5)).abs() < 1e-12);
        assert_eq!(opt.velocity(0).unwrap().as_slice(), &[1.5]);
        assert_eq!(opt.velocity(2).unwrap().as_slice(), &[1.0, 1.0]);
        assert!(opt.velocity(1).is_none());
        assert_eq!(w2.as_slice(), &[-1.0, -1.0]);
    }
}
