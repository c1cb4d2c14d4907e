//! # qcomp - Deep Q-Learning with a Compression-Driven Exploration Bonus
//!
//! qcomp trains a convolutional value network on batches of stacked frames
//! with a lagged target snapshot, clipped TD loss and DeepMind-style RMSProp.
//! An autoencoder reads the network's trunk features and tries to reconstruct
//! them. Its reconstruction error (the compression loss) is added to every TD
//! target and, normalised by the largest value seen so far, raises the
//! exploration rate on states the compressor has not yet learned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qcomp::agent::Learner;
//! use qcomp::config::LearnerConfig;
//! use qcomp::network::NetworkType;
//! use ndarray::Array3;
//!
//! let config = LearnerConfig::new()
//!     .with_network_type(NetworkType::Nips)
//!     .with_num_actions(6)
//!     .with_freeze_interval(10_000);
//! let mut learner = Learner::new(config).unwrap();
//!
//! let observation = Array3::<f32>::zeros((4, 84, 84));
//! let action = learner.choose_action(observation.view(), 0.1).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - ReLU and identity activations
//! - [`agent`] - The [`Learner`](agent::Learner) and its checkpoints
//! - [`autoencoder`] - Compressor branch over the trunk features
//! - [`config`] - Construction-time configuration
//! - [`error`] - Error types and result handling
//! - [`layers`] - Convolution, dense and dropout layers
//! - [`loss`] - Clipped TD loss, reconstruction loss and batch accumulators
//! - [`metrics`] - Training metrics and tracking
//! - [`network`] - Value network topologies
//! - [`optimizer`] - Parameter update rules
//! - [`policy`] - Epsilon-greedy and softmax action selection
//! - [`replay_buffer`] - Experience replay and batch assembly
//! - [`snapshot`] - Target snapshot of the value network

pub mod activations;
pub mod agent;
pub mod autoencoder;
pub mod config;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod policy;
pub mod replay_buffer;
pub mod snapshot;

#[cfg(test)]
mod tests;
