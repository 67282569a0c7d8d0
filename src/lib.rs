//! A small feed-forward neural network engine.
//!
//! `megani` is two things:
//!
//! - a flat-array [`Matrix`] library with in-place arithmetic and a multiply that can
//!   read either operand transposed without copying it;
//! - a [`Network`] that chains heterogeneous [`Layer`]s for forward inference and
//!   backpropagation, and hands every gradient to one pluggable [`Optimizer`].
//!
//! # Shapes and checks
//!
//! - Scalars are `f64` ([`Scalar`]).
//! - Matrices are row-major; `width` is the column count, `height` the row count.
//! - Network inputs are `(batch_width, input_width)`; each sample is one row.
//!
//! The matrix arithmetic is the hot path and does not validate operand shapes. Shape
//! agreement is a precondition, asserted only in debug builds. The network keeps that
//! safe in practice: appending a layer whose input width does not match the previous
//! output width is rejected, and all per-layer buffers are sized by the network.
//!
//! Constructors, appends and attachment return [`Result`].
//!
//! # Quick start
//!
//! ```rust
//! use megani::{Activation, Dense, Matrix, Network};
//!
//! # fn main() -> megani::Result<()> {
//! let mut net = Network::new(2, 4, 0.1)?;
//! net.add_layer(Dense::new_with_seed(2, 8, Activation::Tanh, 0)?)?;
//! net.add_layer(Dense::new_with_seed(8, 1, Activation::Identity, 1)?)?;
//! net.add_batch_gradient_descent(0.05)?;
//!
//! let x = Matrix::from_rows(&[
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//! ])?;
//! let y = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![1.0], vec![2.0]])?;
//!
//! for _ in 0..100 {
//!     net.fit(&x, &y)?;
//! }
//! let out = net.predict(&x)?;
//! assert_eq!(out.height(), 4);
//! # Ok(())
//! # }
//! ```
//!
//! # Custom layers
//!
//! Anything implementing [`Layer`] can be appended. Its `backward` receives a
//! [`Step`] through which it reaches the network's optimizer and scratch matrix.

pub mod activation;
pub mod builder;
pub mod config;
pub mod dense;
pub mod error;
pub mod layer;
pub(crate) mod matmul;
pub mod matrix;
pub mod network;
pub mod optim;

pub use activation::Activation;
pub use builder::{NetworkBuilder, OptimizerKind};
pub use config::NetworkConfig;
pub use dense::Dense;
pub use error::{Error, Result};
pub use layer::{Buffers, Layer, Step};
pub use matrix::{Matrix, Scalar, Transpose};
pub use network::Network;
pub use optim::{BatchGradientDescent, Momentum, Optimizer};
