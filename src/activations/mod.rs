//! # Activation Functions Module
//!
//! Nonlinearities used by the convolutional trunk, the value head and the
//! compressor branch. Every activation works on tensors of any rank, so the
//! same enum serves `Array4` convolution maps and `Array2` dense outputs.
//!
//! ## Available Activations
//!
//! - **ReLU**: `max(0, x)` - hidden layers of every topology
//! - **Linear**: identity - value outputs, the compressor code and the reconstruction
//!
//! Derivatives are evaluated on the cached pre-activation values, so a layer
//! only has to keep its pre-activation output between forward and backward.

pub mod functions;

pub use functions::Activation;
