//! Activation functions.
//!
//! A [`crate::Dense`] layer computes `z = x W^T` and then applies an activation
//! element-wise: `y = activation(z)`.
//!
//! Only the post-activation output `y` is kept in the layer's output matrix. During
//! backprop the derivative is recovered from `y`, so no separate `z` buffer is
//! needed.

use crate::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
/// Element-wise activation function.
pub enum Activation {
    #[default]
    Identity,
    ReLU,
    Sigmoid,
    Tanh,
}

impl Activation {
    #[inline]
    pub fn forward(self, x: Scalar) -> Scalar {
        match self {
            Activation::Identity => x,
            Activation::ReLU => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative of the activation with respect to its input, expressed in terms
    /// of the cached post-activation output `y`.
    #[inline]
    pub fn grad_from_output(self, y: Scalar) -> Scalar {
        match self {
            Activation::Identity => 1.0,
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
        }
    }
}

#[inline]
fn sigmoid(x: Scalar) -> Scalar {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
