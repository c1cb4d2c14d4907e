//! # Layers Module
//!
//! Building blocks for the value network and the compressor branch. Every
//! trainable layer has a caching `forward_batch` used during training, a pure
//! `predict_batch` used for target computation and action selection, and a
//! `backward_batch` that returns gradients in [`Layer::parameters`] order.

pub mod traits;
pub mod dense;
pub mod conv;
pub mod dropout;
pub mod initialization;

pub use traits::Layer;
pub use dense::{DenseGradients, DenseLayer};
pub use conv::{Conv2DLayer, ConvGradients};
pub use dropout::DropoutLayer;
pub use initialization::{WeightInit, BIAS_INIT};
