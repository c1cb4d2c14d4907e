//! # Loss Functions
//!
//! Per-example TD losses, their batch accumulation, and the reconstruction
//! error that defines the compression loss.

pub mod functions;

pub use functions::{clipped_loss, clipped_loss_derivative, reconstruction_losses, BatchAccumulator};
